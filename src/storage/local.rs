//! Local filesystem storage backend implementation.

use object_store::local::LocalFileSystem;
use object_store::ObjectStore;
use snafu::prelude::*;
use std::sync::Arc;

use crate::error::{LocalConfigSnafu, StorageError};

use super::{BackendConfig, StorageProvider};

/// Local filesystem storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    pub path: String,
}

impl StorageProvider {
    pub(super) async fn construct_local(config: LocalConfig) -> Result<Self, StorageError> {
        // Output roots may not exist yet; the object store requires the
        // prefix directory to be present.
        std::fs::create_dir_all(&config.path)
            .map_err(|source| object_store::Error::Generic {
                store: "LocalFileSystem",
                source: Box::new(source),
            })
            .context(LocalConfigSnafu {
                path: config.path.clone(),
            })?;

        let store = LocalFileSystem::new_with_prefix(&config.path).context(LocalConfigSnafu {
            path: config.path.clone(),
        })?;

        let canonical_url = format!("file://{}", config.path);
        let object_store: Arc<dyn ObjectStore> = Arc::new(store);

        Ok(Self {
            config: BackendConfig::Local(config),
            object_store,
            canonical_url,
        })
    }
}
