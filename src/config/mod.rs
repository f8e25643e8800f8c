//! Configuration parsing and validation.
//!
//! Handles loading configuration from YAML files: the two input roots, the
//! output root, storage credentials, Parquet compression, and the
//! null-timestamp policy.

mod vars;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{
    ConfigError, EmptyCatalogPathSnafu, EmptyLogPathSnafu, EmptyOutputPathSnafu,
    EnvInterpolationSnafu, ReadFileSnafu, YamlParseSnafu,
};

/// Main configuration structure for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the song/artist catalog record set.
    pub catalog: SourceConfig,
    /// Root of the listening-session log record set.
    pub logs: SourceConfig,
    /// Output root; each table is written to a named sublocation beneath it.
    pub output: OutputConfig,
    /// What to do with log events whose `ts` fails the timestamp cast.
    #[serde(default)]
    pub null_timestamps: NullTimestampPolicy,
}

/// Source configuration for one input root.
///
/// All `.json` files beneath the root, at any depth, are unioned into one
/// logical record set. Schema is inferred from the records themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root path. Examples: "s3://bucket/song_data", "/local/path/log_data"
    pub path: String,

    /// Storage options (credentials, region, etc.)
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

/// Output configuration for the table writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root path for the five table sublocations.
    pub path: String,

    /// Storage options (credentials, region, etc.)
    #[serde(default)]
    pub storage_options: HashMap<String, String>,

    /// Parquet compression codec.
    #[serde(default)]
    pub compression: ParquetCompression,
}

/// Policy for log events whose timestamp cast produced null.
///
/// The raw `ts` field is epoch milliseconds; a missing or unparseable value
/// casts to null instead of aborting the run. `Drop` (the default) filters
/// those rows out of the enriched action stream, so neither the time table
/// nor the songplays table carries null-keyed rows. `Retain` keeps them,
/// with null start_time and null derived time fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NullTimestampPolicy {
    #[default]
    Drop,
    Retain,
}

/// Parquet compression codec.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
    Gzip,
    Zstd,
    Lz4,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file_with_options(path, true)
    }

    /// Load configuration from a YAML file with optional environment variable interpolation.
    pub fn from_file_with_options(
        path: impl AsRef<Path>,
        interpolate_env: bool,
    ) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).context(ReadFileSnafu)?;

        let content = if interpolate_env {
            let result = vars::interpolate(&content);
            if !result.is_ok() {
                let error_msg = result.errors.join("\n");
                return EnvInterpolationSnafu { message: error_msg }.fail();
            }
            result.text
        } else {
            content
        };

        let config: Config = serde_yaml::from_str(&content).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.catalog.path.is_empty(), EmptyCatalogPathSnafu);
        ensure!(!self.logs.path.is_empty(), EmptyLogPathSnafu);
        ensure!(!self.output.path.is_empty(), EmptyOutputPathSnafu);
        Ok(())
    }
}
