//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in the run. Events
//! implement the `InternalEvent` trait which emits the corresponding
//! counter metric.

use metrics::counter;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when an input root has been listed for record files.
pub struct SourceScanned {
    pub files: u64,
}

impl InternalEvent for SourceScanned {
    fn emit(self) {
        trace!(files = self.files, "Source scanned");
        counter!("borealis_source_files_total").increment(self.files);
    }
}

/// Event emitted when a table's rows have been materialized.
pub struct TableWritten {
    pub table: &'static str,
    pub rows: u64,
    pub files: u64,
    pub bytes: u64,
}

impl InternalEvent for TableWritten {
    fn emit(self) {
        trace!(
            table = self.table,
            rows = self.rows,
            files = self.files,
            bytes = self.bytes,
            "Table written"
        );
        counter!("borealis_rows_written_total", "table" => self.table).increment(self.rows);
        counter!("borealis_files_written_total", "table" => self.table).increment(self.files);
        counter!("borealis_bytes_written_total", "table" => self.table).increment(self.bytes);
    }
}

/// Kind of storage operation for request metrics.
#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    List,
    Put,
    Delete,
}

impl StorageOperation {
    fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::List => "list",
            StorageOperation::Put => "put",
            StorageOperation::Delete => "delete",
        }
    }
}

/// Outcome of a storage request.
#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

/// Event emitted for each storage request.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        counter!(
            "borealis_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
    }
}
