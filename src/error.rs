//! Error types for borealis using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;

use datafusion::arrow::error::ArrowError;
use datafusion::error::DataFusionError;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed"))]
    ObjectStore { source: object_store::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error"))]
    S3Config { source: object_store::Error },

    /// Local filesystem configuration error.
    #[snafu(display("Local filesystem error for {path}"))]
    LocalConfig {
        source: object_store::Error,
        path: String,
    },

    /// Failed to parse a storage URL for engine registration.
    #[snafu(display("Failed to parse URL: {url}"))]
    UrlParse {
        source: url::ParseError,
        url: String,
    },
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Catalog root path is empty.
    #[snafu(display("Catalog path cannot be empty"))]
    EmptyCatalogPath,

    /// Log root path is empty.
    #[snafu(display("Log path cannot be empty"))]
    EmptyLogPath,

    /// Output root path is empty.
    #[snafu(display("Output path cannot be empty"))]
    EmptyOutputPath,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },
}

// ============ Ingest Errors ============

/// Errors that can occur while scanning raw record sets.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum IngestError {
    /// Listing the input root failed.
    #[snafu(display("Failed to list input files under {path}"))]
    ListInput {
        source: StorageError,
        path: String,
    },

    /// The input root contained no record files at any depth.
    #[snafu(display("No .json record files found under {path}"))]
    NoInputFiles { path: String },

    /// The engine failed to open the unioned record set.
    #[snafu(display("Failed to read records under {path}"))]
    ReadRecords {
        source: DataFusionError,
        path: String,
    },
}

// ============ Transform Errors ============

/// Errors that can occur while building table transformations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransformError {
    /// Building the logical plan for a table failed.
    #[snafu(display("Failed to plan {table} table"))]
    TablePlan {
        source: DataFusionError,
        table: String,
    },

    /// Executing a table's plan failed.
    #[snafu(display("Failed to compute {table} table"))]
    TableCompute {
        source: DataFusionError,
        table: String,
    },

    /// Attaching the surrogate key column failed.
    #[snafu(display("Failed to assign songplay ids"))]
    AssignIds { source: ArrowError },
}

// ============ Write Errors ============

/// Errors that can occur while materializing a table.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WriteError {
    /// Executing the table's plan before writing failed.
    #[snafu(display("Failed to compute {table} table for writing"))]
    CollectTable {
        source: DataFusionError,
        table: String,
    },

    /// Clearing the previous contents of the destination failed.
    #[snafu(display("Failed to clear destination {destination}"))]
    ClearDestination {
        source: StorageError,
        destination: String,
    },

    /// A partition column was missing from the table schema.
    #[snafu(display("Partition column {column} not found in {table} table"))]
    MissingPartitionColumn { column: String, table: String },

    /// Deriving partition keys from column values failed.
    #[snafu(display("Failed to derive partition keys for {table} table"))]
    PartitionKey { source: ArrowError, table: String },

    /// Splitting rows by partition value failed.
    #[snafu(display("Failed to split {table} table by partition"))]
    PartitionSplit { source: ArrowError, table: String },

    /// Failed to create the Parquet encoder.
    #[snafu(display("Failed to create Parquet encoder"))]
    EncoderCreate {
        source: datafusion::parquet::errors::ParquetError,
    },

    /// Parquet encoding failed.
    #[snafu(display("Parquet encoding failed"))]
    Encode {
        source: datafusion::parquet::errors::ParquetError,
    },

    /// Uploading an encoded file failed.
    #[snafu(display("Failed to upload {path}"))]
    Upload {
        source: StorageError,
        path: String,
    },
}

// ============ Etl Error (top-level) ============

/// Top-level errors that aggregate all error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EtlError {
    /// Storage error.
    #[snafu(display("Storage error"))]
    EtlStorage { source: StorageError },

    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// Ingest error.
    #[snafu(display("Ingest error"))]
    Ingest { source: IngestError },

    /// Transform error.
    #[snafu(display("Transform error"))]
    Transform { source: TransformError },

    /// Write error.
    #[snafu(display("Write error"))]
    Write { source: WriteError },
}
