//! Storage abstraction for input and output roots.
//!
//! Provides a unified interface over S3 and the local filesystem. Roots are
//! opaque hierarchical paths; nothing in the transformation core depends on
//! a specific backend's API.

mod local;
mod s3;

use bytes::Bytes;
use futures::StreamExt;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use regex::Regex;
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use url::Url;

use crate::emit;
use crate::error::{InvalidUrlSnafu, ObjectStoreSnafu, StorageError, UrlParseSnafu};
use crate::metrics::events::{RequestStatus, StorageOperation, StorageRequest};

pub use local::LocalConfig;
pub use s3::S3Config;

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

/// Storage provider that abstracts over storage backends.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

// URL patterns for the supported backends
const S3_URL: &str = r"^[sS]3[aA]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+?))?/?$";
const FILE_URI: &str = r"^file://(?P<path>.*)$";
const FILE_PATH: &str = r"^/(?P<path>.*)$";

fn matchers() -> &'static Vec<(BackendKind, Regex)> {
    static MATCHERS: OnceLock<Vec<(BackendKind, Regex)>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        vec![
            (BackendKind::S3, Regex::new(S3_URL).unwrap()),
            (BackendKind::Local, Regex::new(FILE_URI).unwrap()),
            (BackendKind::Local, Regex::new(FILE_PATH).unwrap()),
        ]
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackendKind {
    S3,
    Local,
}

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3(S3Config),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        for (kind, regex) in matchers() {
            if let Some(matches) = regex.captures(url) {
                return match kind {
                    BackendKind::S3 => Self::parse_s3(matches),
                    BackendKind::Local => Self::parse_local(matches),
                };
            }
        }

        InvalidUrlSnafu {
            url: url.to_string(),
        }
        .fail()
    }

    fn parse_s3(matches: regex::Captures) -> Result<Self, StorageError> {
        let bucket = matches
            .name("bucket")
            .expect("bucket should always be available")
            .as_str()
            .to_string();

        let key = matches.name("key").map(|m| m.as_str().into());

        Ok(BackendConfig::S3(S3Config { bucket, key }))
    }

    fn parse_local(matches: regex::Captures) -> Result<Self, StorageError> {
        let path = matches
            .name("path")
            .expect("path regex must contain a path group")
            .as_str();

        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        let path = path.trim_end_matches('/').to_string();

        Ok(BackendConfig::Local(LocalConfig { path }))
    }

    pub(crate) fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::S3(s3) => s3.key.as_ref(),
            BackendConfig::Local(_) => None,
        }
    }
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    pub async fn for_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        let config = BackendConfig::parse_url(url)?;

        match config {
            BackendConfig::S3(config) => Self::construct_s3(config, options).await,
            BackendConfig::Local(config) => Self::construct_local(config).await,
        }
    }

    /// Create a storage provider for the given URL with no extra options.
    pub async fn for_url(url: &str) -> Result<Self, StorageError> {
        Self::for_url_with_options(url, HashMap::new()).await
    }

    /// The engine registration URL for this provider, if the backend is not
    /// natively known to the engine. Local filesystem paths need no
    /// registration; S3 buckets do.
    pub fn engine_url(&self) -> Result<Option<(Url, Arc<dyn ObjectStore>)>, StorageError> {
        match &self.config {
            BackendConfig::S3(s3) => {
                let base = format!("s3://{}", s3.bucket);
                let url = Url::parse(&base).context(UrlParseSnafu { url: base })?;
                Ok(Some((url, self.object_store.clone())))
            }
            BackendConfig::Local(_) => Ok(None),
        }
    }

    /// Full URL for a path relative to this provider's root, in the form the
    /// execution engine resolves.
    pub fn url_for(&self, relative: &str) -> String {
        match &self.config {
            BackendConfig::S3(s3) => match &s3.key {
                Some(key) => format!("s3://{}/{}/{}", s3.bucket, key, relative),
                None => format!("s3://{}/{}", s3.bucket, relative),
            },
            BackendConfig::Local(local) => format!("file://{}/{}", local.path, relative),
        }
    }

    /// List `.json` record files recursively under this provider's root.
    ///
    /// Returns paths relative to the root, sorted for consistent ordering.
    /// Nothing semantic is read from the nesting; all matching files are
    /// unioned into one logical record set by the caller.
    pub async fn list_json_files(&self) -> Result<Vec<String>, StorageError> {
        emit!(StorageRequest {
            operation: StorageOperation::List,
            status: RequestStatus::Success,
        });

        let key_path: Option<Path> = self.config.key().map(|key| key.to_string().into());
        let key_part_count = key_path
            .as_ref()
            .map(|key| key.parts().count())
            .unwrap_or_default();

        let mut files = Vec::new();
        let mut total_listed = 0;
        let mut stream = self.object_store.list(key_path.as_ref());

        while let Some(result) = stream.next().await {
            let meta = result.context(ObjectStoreSnafu)?;
            total_listed += 1;

            if meta.location.as_ref().ends_with(".json") {
                // Strip the key prefix so callers get root-relative paths
                let relative: Path = meta.location.parts().skip(key_part_count).collect();
                files.push(relative.to_string());
            }
        }

        tracing::debug!(
            "Listed {} total files, {} are .json",
            total_listed,
            files.len()
        );

        files.sort();
        Ok(files)
    }

    /// Delete every object under a prefix relative to this provider's root.
    ///
    /// Returns the number of objects removed. A missing prefix is not an
    /// error; it simply removes nothing.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let full_prefix = self.qualify_path(&Path::from(prefix)).into_owned();
        let mut stream = self.object_store.list(Some(&full_prefix));
        let mut deleted = 0;

        while let Some(result) = stream.next().await {
            let meta = match result {
                Ok(meta) => meta,
                Err(object_store::Error::NotFound { .. }) => continue,
                Err(err) => return Err(StorageError::ObjectStore { source: err }),
            };

            let delete_result = self.object_store.delete(&meta.location).await;
            emit!(StorageRequest {
                operation: StorageOperation::Delete,
                status: if delete_result.is_ok() {
                    RequestStatus::Success
                } else {
                    RequestStatus::Error
                },
            });
            delete_result.context(ObjectStoreSnafu)?;
            deleted += 1;
        }

        Ok(deleted)
    }

    /// Put bytes to a path relative to this provider's root.
    pub async fn put(&self, path: &Path, bytes: Bytes) -> Result<(), StorageError> {
        let path = self.qualify_path(path);
        let result = self
            .object_store
            .put(&path, PutPayload::from(bytes))
            .await;

        emit!(StorageRequest {
            operation: StorageOperation::Put,
            status: if result.is_ok() {
                RequestStatus::Success
            } else {
                RequestStatus::Error
            },
        });

        result.context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// Qualify a path with the configured key prefix.
    pub fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(prefix.parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    /// Get the backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Canonical URL of this provider's root.
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_s3_url_parsing() {
        let config = BackendConfig::parse_url("s3://mybucket/song_data").unwrap();
        match config {
            BackendConfig::S3(s3) => {
                assert_eq!(s3.bucket, "mybucket");
                assert_eq!(s3.key, Some(Path::from("song_data")));
            }
            _ => panic!("Expected S3 config"),
        }
    }

    #[test]
    fn test_s3a_scheme_accepted() {
        let config = BackendConfig::parse_url("s3a://event-archive/log_data").unwrap();
        match config {
            BackendConfig::S3(s3) => {
                assert_eq!(s3.bucket, "event-archive");
                assert_eq!(s3.key, Some(Path::from("log_data")));
            }
            _ => panic!("Expected S3 config"),
        }
    }

    #[test]
    fn test_local_url_parsing() {
        let config = BackendConfig::parse_url("/local/path/to/data").unwrap();
        match config {
            BackendConfig::Local(local) => {
                assert_eq!(local.path, "/local/path/to/data");
            }
            _ => panic!("Expected Local config"),
        }
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(BackendConfig::parse_url("ftp://nope/data").is_err());
    }

    #[tokio::test]
    async fn test_list_json_files_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        let nested = base.join("2018/11");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("events.json"), b"{}\n").unwrap();
        std::fs::write(base.join("top.json"), b"{}\n").unwrap();
        std::fs::write(base.join("ignored.txt"), b"not a record").unwrap();

        let storage = StorageProvider::for_url(base.to_str().unwrap())
            .await
            .unwrap();

        let files = storage.list_json_files().await.unwrap();
        assert_eq!(files, vec!["2018/11/events.json", "top.json"]);
    }

    #[tokio::test]
    async fn test_delete_prefix_removes_only_that_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        std::fs::create_dir_all(base.join("songs/year=2000")).unwrap();
        std::fs::create_dir_all(base.join("artists")).unwrap();
        std::fs::write(base.join("songs/year=2000/part.parquet"), b"old").unwrap();
        std::fs::write(base.join("artists/part.parquet"), b"keep").unwrap();

        let storage = StorageProvider::for_url(base.to_str().unwrap())
            .await
            .unwrap();

        let deleted = storage.delete_prefix("songs").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(!base.join("songs/year=2000/part.parquet").exists());
        assert!(base.join("artists/part.parquet").exists());

        // Deleting a prefix that does not exist is a no-op
        let deleted = storage.delete_prefix("missing").await.unwrap();
        assert_eq!(deleted, 0);
    }
}
