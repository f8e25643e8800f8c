//! Materialization of tables as partitioned Parquet files.
//!
//! Each table is written beneath its own named sublocation of the output
//! root. Writes are full-overwrite: the sublocation is cleared first, then
//! fresh files are uploaded, so the destination always reflects exactly
//! one run. Partitioned tables use hive-style `column=value` directory
//! segments in the declared column order.

pub mod parquet;

use bytes::Bytes;
use datafusion::arrow::array::{Array, RecordBatch, StringArray, UInt32Array};
use datafusion::arrow::compute;
use datafusion::arrow::datatypes::{DataType, Schema, SchemaRef};
use datafusion::prelude::DataFrame;
use object_store::path::Path;
use snafu::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::ParquetCompression;
use crate::emit;
use crate::error::{
    ClearDestinationSnafu, CollectTableSnafu, MissingPartitionColumnSnafu, PartitionKeySnafu,
    PartitionSplitSnafu, UploadSnafu, WriteError,
};
use crate::metrics::events::TableWritten;
use crate::storage::StorageProviderRef;

/// Directory segment value for rows whose partition column is null.
const NULL_PARTITION_VALUE: &str = "__HIVE_DEFAULT_PARTITION__";

/// What one table write produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableWriteStats {
    pub rows: u64,
    pub files: u64,
    pub bytes: u64,
}

/// Writes tables to the output root as compressed Parquet.
pub struct TableWriter {
    storage: StorageProviderRef,
    compression: ParquetCompression,
}

impl TableWriter {
    pub fn new(storage: StorageProviderRef, compression: ParquetCompression) -> Self {
        Self {
            storage,
            compression,
        }
    }

    /// Materialize a dataframe under `{output}/{name}`, partitioned by the
    /// given columns.
    pub async fn write(
        &self,
        df: DataFrame,
        name: &'static str,
        partition_columns: &[&str],
    ) -> Result<TableWriteStats, WriteError> {
        let schema = Arc::new(Schema::from(df.schema()));
        let batches = df
            .collect()
            .await
            .context(CollectTableSnafu { table: name })?;
        self.write_batches(schema, batches, name, partition_columns)
            .await
    }

    /// Materialize pre-collected batches under `{output}/{name}`.
    ///
    /// The previous contents of the sublocation are removed first. An empty
    /// table still produces one schema-only file, so readers always find a
    /// valid table at the destination.
    pub async fn write_batches(
        &self,
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
        name: &'static str,
        partition_columns: &[&str],
    ) -> Result<TableWriteStats, WriteError> {
        self.storage
            .delete_prefix(name)
            .await
            .context(ClearDestinationSnafu { destination: name })?;

        let rows: u64 = batches.iter().map(|b| b.num_rows() as u64).sum();
        let mut stats = TableWriteStats {
            rows,
            ..Default::default()
        };

        if partition_columns.is_empty() || rows == 0 {
            let path = Path::from(format!("{name}/{}", generate_filename()));
            let bytes = parquet::encode_batches(&schema, &batches, self.compression)?;
            stats.bytes += bytes.len() as u64;
            stats.files += 1;
            self.upload(&path, bytes).await?;
        } else {
            let partitions = split_partitions(&schema, &batches, name, partition_columns)?;
            for (prefix, partition_batches) in partitions {
                let path = Path::from(format!("{name}/{prefix}/{}", generate_filename()));
                let bytes =
                    parquet::encode_batches(&schema, &partition_batches, self.compression)?;
                stats.bytes += bytes.len() as u64;
                stats.files += 1;
                self.upload(&path, bytes).await?;
            }
        }

        emit!(TableWritten {
            table: name,
            rows: stats.rows,
            files: stats.files,
            bytes: stats.bytes,
        });
        info!(
            table = name,
            rows = stats.rows,
            files = stats.files,
            bytes = stats.bytes,
            "Wrote table"
        );

        Ok(stats)
    }

    async fn upload(&self, path: &Path, bytes: Bytes) -> Result<(), WriteError> {
        self.storage.put(path, bytes).await.context(UploadSnafu {
            path: path.to_string(),
        })
    }
}

fn generate_filename() -> String {
    format!("part-{}.parquet", Uuid::now_v7())
}

/// Group rows by their partition key.
///
/// Keys are hive-style `column=value` segments joined in the declared
/// column order; values come from casting the column to its string form.
/// The partition columns stay in the data files, so the files are complete
/// on their own and the directory layout is purely navigational.
fn split_partitions(
    schema: &SchemaRef,
    batches: &[RecordBatch],
    table: &'static str,
    partition_columns: &[&str],
) -> Result<BTreeMap<String, Vec<RecordBatch>>, WriteError> {
    let column_indices: Vec<usize> = partition_columns
        .iter()
        .map(|column| {
            schema.index_of(column).ok().context(MissingPartitionColumnSnafu {
                column: *column,
                table,
            })
        })
        .collect::<Result<_, _>>()?;

    let mut partitions: BTreeMap<String, Vec<RecordBatch>> = BTreeMap::new();

    for batch in batches {
        if batch.num_rows() == 0 {
            continue;
        }

        // One string array per partition column, for key rendering
        let key_arrays: Vec<StringArray> = column_indices
            .iter()
            .map(|&idx| {
                let cast = compute::cast(batch.column(idx), &DataType::Utf8)
                    .context(PartitionKeySnafu { table })?;
                Ok(cast
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .expect("cast to Utf8 yields StringArray")
                    .clone())
            })
            .collect::<Result<_, WriteError>>()?;

        let mut row_groups: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        for row in 0..batch.num_rows() {
            let key = partition_columns
                .iter()
                .zip(&key_arrays)
                .map(|(column, values)| {
                    if values.is_null(row) {
                        format!("{column}={NULL_PARTITION_VALUE}")
                    } else {
                        format!("{column}={}", values.value(row))
                    }
                })
                .collect::<Vec<_>>()
                .join("/");
            row_groups.entry(key).or_default().push(row as u32);
        }

        for (key, rows) in row_groups {
            let indices = UInt32Array::from(rows);
            let columns = batch
                .columns()
                .iter()
                .map(|column| compute::take(column, &indices, None))
                .collect::<Result<Vec<_>, _>>()
                .context(PartitionSplitSnafu { table })?;
            let partition_batch = RecordBatch::try_new(schema.clone(), columns)
                .context(PartitionSplitSnafu { table })?;
            partitions.entry(key).or_default().push(partition_batch);
        }
    }

    Ok(partitions)
}
