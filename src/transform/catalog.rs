//! Catalog extractor: songs and artists dimension tables.

use datafusion::prelude::*;
use snafu::prelude::*;

use crate::error::{TablePlanSnafu, TransformError};

/// Derive the songs dimension from the raw catalog.
///
/// Projects `song_id, title, artist_id, year, duration` and collapses
/// duplicates over all five columns. Row order is unspecified; the set of
/// output tuples is a deterministic function of the input set.
pub fn extract_songs(catalog: DataFrame) -> Result<DataFrame, TransformError> {
    catalog
        .select(vec![
            col("song_id"),
            col("title"),
            col("artist_id"),
            col("year"),
            col("duration"),
        ])
        .and_then(|df| df.distinct())
        .context(TablePlanSnafu { table: "songs" })
}

/// Derive the artists dimension from the raw catalog.
///
/// The four `artist_*` columns are renamed to their dimension names;
/// duplicates are collapsed over the full five-column tuple.
pub fn extract_artists(catalog: DataFrame) -> Result<DataFrame, TransformError> {
    catalog
        .select(vec![
            col("artist_id"),
            col("artist_name").alias("name"),
            col("artist_location").alias("location"),
            col("artist_latitude").alias("latitude"),
            col("artist_longitude").alias("longitude"),
        ])
        .and_then(|df| df.distinct())
        .context(TablePlanSnafu { table: "artists" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::array::{Float64Array, Int64Array, StringArray};
    use datafusion::arrow::datatypes::{DataType, Field, Schema};
    use datafusion::arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn catalog_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("song_id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("artist_id", DataType::Utf8, false),
            Field::new("artist_name", DataType::Utf8, false),
            Field::new("artist_location", DataType::Utf8, true),
            Field::new("artist_latitude", DataType::Float64, true),
            Field::new("artist_longitude", DataType::Float64, true),
            Field::new("year", DataType::Int64, false),
            Field::new("duration", DataType::Float64, false),
        ]));

        // Two distinct songs by the same artist, with the first song
        // repeated verbatim.
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["S1", "S1", "S2"])),
                Arc::new(StringArray::from(vec!["Alpha", "Alpha", "Beta"])),
                Arc::new(StringArray::from(vec!["A1", "A1", "A1"])),
                Arc::new(StringArray::from(vec!["The Artist", "The Artist", "The Artist"])),
                Arc::new(StringArray::from(vec![Some("NYC"), Some("NYC"), Some("NYC")])),
                Arc::new(Float64Array::from(vec![Some(40.7), Some(40.7), Some(40.7)])),
                Arc::new(Float64Array::from(vec![Some(-74.0), Some(-74.0), Some(-74.0)])),
                Arc::new(Int64Array::from(vec![2000, 2000, 0])),
                Arc::new(Float64Array::from(vec![200.0, 200.0, 310.5])),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_extract_songs_deduplicates() {
        let ctx = SessionContext::new();
        let catalog = ctx.read_batches(vec![catalog_batch()]).unwrap();

        let songs = extract_songs(catalog).unwrap();
        let batches = songs.collect().await.unwrap();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();

        assert_eq!(rows, 2);
        assert_eq!(batches[0].schema().fields().len(), 5);
        assert_eq!(batches[0].schema().field(0).name(), "song_id");
    }

    #[tokio::test]
    async fn test_extract_artists_renames_and_deduplicates() {
        let ctx = SessionContext::new();
        let catalog = ctx.read_batches(vec![catalog_batch()]).unwrap();

        let artists = extract_artists(catalog).unwrap();
        let schema = Schema::from(artists.schema());
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(
            names,
            vec!["artist_id", "name", "location", "latitude", "longitude"]
        );

        let batches = artists.collect().await.unwrap();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_dedup_is_idempotent_over_concatenated_input() {
        let ctx = SessionContext::new();
        // The same catalog twice: dedup must collapse to the single-run result.
        let doubled = ctx
            .read_batches(vec![catalog_batch(), catalog_batch()])
            .unwrap();

        let songs = extract_songs(doubled).unwrap();
        let batches = songs.collect().await.unwrap();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 2);
    }
}
