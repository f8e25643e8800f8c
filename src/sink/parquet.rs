//! In-memory Parquet encoding.

use bytes::Bytes;
use datafusion::arrow::array::RecordBatch;
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::parquet::arrow::ArrowWriter;
use datafusion::parquet::basic::{Compression, GzipLevel, ZstdLevel};
use datafusion::parquet::file::properties::WriterProperties;
use snafu::prelude::*;

use crate::config::ParquetCompression;
use crate::error::{EncodeSnafu, EncoderCreateSnafu, WriteError};

/// Encode a set of batches into a single Parquet file in memory.
///
/// The schema is written even when `batches` is empty, so an empty table
/// still produces a valid, readable file.
pub fn encode_batches(
    schema: &SchemaRef,
    batches: &[RecordBatch],
    compression: ParquetCompression,
) -> Result<Bytes, WriteError> {
    let props = WriterProperties::builder()
        .set_compression(codec(compression))
        .build();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema.clone(), Some(props))
        .context(EncoderCreateSnafu)?;

    for batch in batches {
        writer.write(batch).context(EncodeSnafu)?;
    }
    writer.close().context(EncodeSnafu)?;

    Ok(Bytes::from(buffer))
}

fn codec(compression: ParquetCompression) -> Compression {
    match compression {
        ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
        ParquetCompression::Snappy => Compression::SNAPPY,
        ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
        ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
        ParquetCompression::Lz4 => Compression::LZ4_RAW,
    }
}
