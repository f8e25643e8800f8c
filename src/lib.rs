//! borealis: a library for building a star-schema analytics dataset from
//! NDJSON event sources.
//!
//! Two raw record sets — a song/artist catalog and a stream of listening
//! session log events — are transformed into four dimension tables (songs,
//! artists, users, time) and one fact table (songplays), materialized as
//! partitioned Parquet files.
//!
//! # Example
//!
//! ```ignore
//! use borealis::{Config, run_pipeline, error::EtlError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EtlError> {
//!     let config = Config::from_file("etl.yaml")?;
//!     let stats = run_pipeline(config).await?;
//!     println!("Wrote {} songplay rows", stats.songplays_rows);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod storage;
pub mod transform;

// Re-export main types
pub use config::Config;
pub use pipeline::{run_pipeline, PipelineStats};
pub use storage::{StorageProvider, StorageProviderRef};
