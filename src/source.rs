//! Raw record-set ingestion.
//!
//! An input root contains one self-describing JSON record per line, spread
//! across a nested directory structure. Every `.json` file beneath the root
//! is unioned into one logical record set; the schema is inferred from the
//! records themselves, not declared externally.

use datafusion::prelude::{DataFrame, NdJsonReadOptions, SessionContext};
use snafu::prelude::*;
use tracing::debug;

use crate::emit;
use crate::error::{IngestError, ListInputSnafu, NoInputFilesSnafu, ReadRecordsSnafu};
use crate::metrics::events::SourceScanned;
use crate::storage::StorageProvider;

/// Scan every record file under the given root into a single dataframe.
///
/// The directory nesting carries no meaning; files are discovered
/// recursively and read as one unioned record set. An empty root is fatal:
/// there is no schema to infer and nothing downstream could run.
pub async fn scan_records(
    ctx: &SessionContext,
    storage: &StorageProvider,
) -> Result<DataFrame, IngestError> {
    let root = storage.canonical_url().to_string();

    let files = storage
        .list_json_files()
        .await
        .context(ListInputSnafu { path: root.clone() })?;

    ensure!(!files.is_empty(), NoInputFilesSnafu { path: root.clone() });

    emit!(SourceScanned {
        files: files.len() as u64
    });
    debug!("Scanning {} record files under {}", files.len(), root);

    let urls: Vec<String> = files.iter().map(|f| storage.url_for(f)).collect();

    ctx.read_json(urls, NdJsonReadOptions::default())
        .await
        .context(ReadRecordsSnafu { path: root })
}

/// Register the provider's object store with the execution engine, if the
/// backend is not one the engine resolves natively.
pub fn register_store(
    ctx: &SessionContext,
    storage: &StorageProvider,
) -> Result<(), crate::error::StorageError> {
    if let Some((url, store)) = storage.engine_url()? {
        ctx.register_object_store(&url, store);
    }
    Ok(())
}
