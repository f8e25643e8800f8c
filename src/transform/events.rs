//! Event extractor: users and time dimensions plus the cleaned action stream.

use datafusion::arrow::datatypes::{DataType, TimeUnit};
use datafusion::prelude::*;
use snafu::prelude::*;

use crate::config::NullTimestampPolicy;
use crate::error::{TablePlanSnafu, TransformError};

/// The `page` value marking a song-play action. Events with any other page
/// are excluded noise for everything except the users table.
pub const SONG_PLAY_PAGE: &str = "NextSong";

/// Format of the canonical `start_time` string: day-month-year
/// hour-minute-second, zero-padded, hyphen-separated.
pub const START_TIME_FORMAT: &str = "%d-%m-%Y %H-%M-%S";

/// Derive the users dimension from the raw log events.
///
/// Deduplication runs over the full tuple, so `level` is effectively part
/// of the key: a user who changes subscription tier keeps one row per tier
/// rather than being collapsed to the latest value.
pub fn extract_users(logs: DataFrame) -> Result<DataFrame, TransformError> {
    logs.select(vec![
        ident("userId"),
        ident("firstName"),
        ident("lastName"),
        col("gender"),
        col("level"),
    ])
    .and_then(|df| df.distinct())
    .context(TablePlanSnafu { table: "users" })
}

/// Keep only song-play actions and project the fields the fact builder and
/// time dimension need.
pub fn filter_song_plays(logs: DataFrame) -> Result<DataFrame, TransformError> {
    logs.filter(col("page").eq(lit(SONG_PLAY_PAGE)))
        .and_then(|df| {
            df.select(vec![
                col("ts"),
                ident("userId"),
                col("level"),
                col("song"),
                col("artist"),
                ident("sessionId"),
                col("location"),
                ident("userAgent"),
            ])
        })
        .context(TablePlanSnafu { table: "actions" })
}

/// Enrich the action stream with a `timestamp` column (epoch-millisecond
/// `ts` cast to a timestamp) and the canonical `datetime` string derived
/// from it.
///
/// A missing or unparseable `ts` casts to null instead of aborting the run.
/// Under [`NullTimestampPolicy::Drop`] those rows are filtered out here, so
/// no null-keyed rows reach the time table or the fact builder; under
/// `Retain` they survive with null time fields.
pub fn enrich_timestamps(
    actions: DataFrame,
    policy: NullTimestampPolicy,
) -> Result<DataFrame, TransformError> {
    let enriched = actions
        .with_column(
            "timestamp",
            try_cast(
                col("ts"),
                DataType::Timestamp(TimeUnit::Millisecond, None),
            ),
        )
        .and_then(|df| {
            df.with_column("datetime", to_char(col("timestamp"), lit(START_TIME_FORMAT)))
        });

    match policy {
        NullTimestampPolicy::Drop => enriched
            .and_then(|df| df.filter(col("timestamp").is_not_null()))
            .context(TablePlanSnafu { table: "actions" }),
        NullTimestampPolicy::Retain => enriched.context(TablePlanSnafu { table: "actions" }),
    }
}

/// Derive the time dimension from the enriched action stream.
///
/// One row per distinct `start_time` value; `hour, day, week, month, year`
/// are pure functions of it.
pub fn extract_time(actions: DataFrame) -> Result<DataFrame, TransformError> {
    actions
        .select(vec![
            col("datetime").alias("start_time"),
            time_part("hour"),
            time_part("day"),
            time_part("week"),
            time_part("month"),
            time_part("year"),
        ])
        .and_then(|df| df.distinct())
        .context(TablePlanSnafu { table: "time" })
}

/// A calendar component of the enriched timestamp, as Int32.
pub(crate) fn time_part(part: &str) -> Expr {
    cast(date_part(lit(part), col("timestamp")), DataType::Int32).alias(part)
}
