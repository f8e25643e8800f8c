//! Songplay fact builder.
//!
//! Joins the cleaned, timestamp-enriched action stream against the raw
//! catalog and projects the fact table columns. The join keys on the log
//! event's free-text `artist` string against the catalog's `artist_name` —
//! a string-equality predicate, not an identifier join. Case, punctuation
//! and featuring-artist conventions all cause silent drops; this is a known
//! precision limitation that is reproduced deliberately rather than
//! upgraded to an id-based join.

use datafusion::arrow::array::{ArrayRef, Int64Array, RecordBatch};
use datafusion::arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef};
use datafusion::common::JoinType;
use datafusion::prelude::*;
use snafu::prelude::*;
use std::sync::Arc;

use super::events::time_part;
use crate::error::{AssignIdsSnafu, TablePlanSnafu, TableComputeSnafu, TransformError};

/// Build the songplays fact table.
///
/// `actions` is the enriched stream from the event extractor; `catalog` is
/// a freshly re-read instance of the raw catalog, scanned independently of
/// the songs/artists extraction. Actions with no matching catalog artist
/// produce no row (inner join, silently dropped).
///
/// Returns the materialized batches with the surrogate `songplay_id`
/// column attached, together with their schema (preserved even when the
/// join produced no rows).
pub async fn build_songplays(
    actions: DataFrame,
    catalog: DataFrame,
) -> Result<(SchemaRef, Vec<RecordBatch>), TransformError> {
    let projected = actions
        .join(catalog, JoinType::Inner, &["artist"], &["artist_name"], None)
        .and_then(|df| {
            df.select(vec![
                col("datetime").alias("start_time"),
                ident("userId").alias("user_id"),
                col("level"),
                col("song_id"),
                col("artist_id"),
                ident("sessionId").alias("session_id"),
                col("location"),
                ident("userAgent").alias("user_agent"),
                time_part("year"),
                time_part("month"),
            ])
        })
        .context(TablePlanSnafu { table: "songplays" })?;

    let schema = Arc::new(Schema::from(projected.schema()));
    let batches = projected.collect().await.context(TableComputeSnafu {
        table: "songplays",
    })?;

    assign_songplay_ids(schema, batches)
}

/// Attach the surrogate `songplay_id` column.
///
/// Ids are unique within a run: the batch index (the engine's partition of
/// the result) is combined with a batch-local row counter. Nothing about
/// contiguity or cross-run ordering is guaranteed, and consumers must not
/// rely on either.
fn assign_songplay_ids(
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
) -> Result<(SchemaRef, Vec<RecordBatch>), TransformError> {
    let mut fields: Vec<FieldRef> =
        vec![Arc::new(Field::new("songplay_id", DataType::Int64, false))];
    fields.extend(schema.fields().iter().cloned());
    let schema_with_id = Arc::new(Schema::new(fields));

    let batches = batches
        .into_iter()
        .enumerate()
        .map(|(batch_index, batch)| {
            let ids: Int64Array = (0..batch.num_rows())
                .map(|row| Some(((batch_index as i64) << 32) | row as i64))
                .collect();

            let mut columns: Vec<ArrayRef> = vec![Arc::new(ids)];
            columns.extend(batch.columns().iter().cloned());
            RecordBatch::try_new(schema_with_id.clone(), columns)
        })
        .collect::<Result<Vec<_>, _>>()
        .context(AssignIdsSnafu)?;

    Ok((schema_with_id, batches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NullTimestampPolicy;
    use crate::transform::events::{enrich_timestamps, filter_song_plays};
    use datafusion::arrow::array::{Float64Array, StringArray};
    use std::collections::HashSet;

    // 2018-01-01T00:00:00Z
    const TS_JAN: i64 = 1_514_764_800_000;

    fn catalog_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("song_id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("artist_id", DataType::Utf8, false),
            Field::new("artist_name", DataType::Utf8, false),
            Field::new("year", DataType::Int64, false),
            Field::new("duration", DataType::Float64, false),
        ]));

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["S1", "S2"])),
                Arc::new(StringArray::from(vec!["T", "U"])),
                Arc::new(StringArray::from(vec!["A1", "A2"])),
                Arc::new(StringArray::from(vec!["Arist X", "Arist Y"])),
                Arc::new(Int64Array::from(vec![2000, 1999])),
                Arc::new(Float64Array::from(vec![200.0, 150.0])),
            ],
        )
        .unwrap()
    }

    fn log_batch(artists: Vec<&str>) -> RecordBatch {
        let n = artists.len();
        let schema = Arc::new(Schema::new(vec![
            Field::new("ts", DataType::Int64, true),
            Field::new("userId", DataType::Utf8, true),
            Field::new("level", DataType::Utf8, true),
            Field::new("song", DataType::Utf8, true),
            Field::new("artist", DataType::Utf8, true),
            Field::new("sessionId", DataType::Int64, true),
            Field::new("location", DataType::Utf8, true),
            Field::new("userAgent", DataType::Utf8, true),
            Field::new("page", DataType::Utf8, false),
        ]));

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![Some(TS_JAN); n])),
                Arc::new(StringArray::from(vec!["U1"; n])),
                Arc::new(StringArray::from(vec!["free"; n])),
                Arc::new(StringArray::from(vec!["T"; n])),
                Arc::new(StringArray::from(artists)),
                Arc::new(Int64Array::from(vec![Some(1); n])),
                Arc::new(StringArray::from(vec!["NYC"; n])),
                Arc::new(StringArray::from(vec!["Mozilla/5.0"; n])),
                Arc::new(StringArray::from(vec!["NextSong"; n])),
            ],
        )
        .unwrap()
    }

    async fn enriched_actions(ctx: &SessionContext, artists: Vec<&str>) -> DataFrame {
        let logs = ctx.read_batches(vec![log_batch(artists)]).unwrap();
        let actions = filter_song_plays(logs).unwrap();
        enrich_timestamps(actions, NullTimestampPolicy::Drop).unwrap()
    }

    #[tokio::test]
    async fn test_matching_action_produces_one_fact_row() {
        let ctx = SessionContext::new();
        let actions = enriched_actions(&ctx, vec!["Arist X"]).await;
        let catalog = ctx.read_batches(vec![catalog_batch()]).unwrap();

        let (schema, batches) = build_songplays(actions, catalog).await.unwrap();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 1);

        let batch = &batches[0];
        let text = |name: &str| -> String {
            let idx = schema.index_of(name).unwrap();
            batch
                .column(idx)
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap()
                .value(0)
                .to_string()
        };
        assert_eq!(text("song_id"), "S1");
        assert_eq!(text("artist_id"), "A1");
        assert_eq!(text("user_id"), "U1");
        assert_eq!(text("start_time"), "01-01-2018 00-00-00");

        let int32 = |name: &str| -> i32 {
            let idx = schema.index_of(name).unwrap();
            batch
                .column(idx)
                .as_any()
                .downcast_ref::<datafusion::arrow::array::Int32Array>()
                .unwrap()
                .value(0)
        };
        assert_eq!(int32("year"), 2018);
        assert_eq!(int32("month"), 1);
    }

    #[tokio::test]
    async fn test_one_row_per_matching_catalog_song() {
        let ctx = SessionContext::new();
        let actions = enriched_actions(&ctx, vec!["Arist X"]).await;

        // The same artist with two catalog songs
        let schema = Arc::new(Schema::new(vec![
            Field::new("song_id", DataType::Utf8, false),
            Field::new("artist_id", DataType::Utf8, false),
            Field::new("artist_name", DataType::Utf8, false),
        ]));
        let catalog = ctx
            .read_batches(vec![RecordBatch::try_new(
                schema,
                vec![
                    Arc::new(StringArray::from(vec!["S1", "S3"])),
                    Arc::new(StringArray::from(vec!["A1", "A1"])),
                    Arc::new(StringArray::from(vec!["Arist X", "Arist X"])),
                ],
            )
            .unwrap()])
            .unwrap();

        let (_, batches) = build_songplays(actions, catalog).await.unwrap();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn test_join_miss_produces_no_rows_but_keeps_schema() {
        let ctx = SessionContext::new();
        let actions = enriched_actions(&ctx, vec!["Nobody Known"]).await;
        let catalog = ctx.read_batches(vec![catalog_batch()]).unwrap();

        let (schema, batches) = build_songplays(actions, catalog).await.unwrap();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 0);
        assert_eq!(schema.field(0).name(), "songplay_id");
        assert_eq!(schema.fields().len(), 11);
    }

    #[tokio::test]
    async fn test_songplay_ids_are_unique_within_a_run() {
        let ctx = SessionContext::new();
        let actions =
            enriched_actions(&ctx, vec!["Arist X", "Arist X", "Arist Y", "Arist Y"]).await;
        let catalog = ctx.read_batches(vec![catalog_batch()]).unwrap();

        let (schema, batches) = build_songplays(actions, catalog).await.unwrap();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 4);

        let id_idx = schema.index_of("songplay_id").unwrap();
        let mut seen = HashSet::new();
        for batch in &batches {
            let ids = batch
                .column(id_idx)
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap();
            for i in 0..ids.len() {
                assert!(seen.insert(ids.value(i)));
            }
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_assign_ids_distinct_across_batches() {
        let schema = Arc::new(Schema::new(vec![Field::new(
            "value",
            DataType::Utf8,
            false,
        )]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef],
        )
        .unwrap();

        let (schema_with_id, batches) =
            assign_songplay_ids(schema, vec![batch.clone(), batch]).unwrap();
        assert_eq!(schema_with_id.field(0).name(), "songplay_id");

        let mut seen = HashSet::new();
        for batch in &batches {
            let ids = batch
                .column(0)
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap();
            for i in 0..ids.len() {
                assert!(seen.insert(ids.value(i)));
            }
        }
        assert_eq!(seen.len(), 4);
    }
}
