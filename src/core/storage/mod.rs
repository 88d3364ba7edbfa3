//! Blob storage for conversation archives and call audio.
//!
//! Wraps any [`ObjectStore`] (Google Cloud Storage in production, an
//! in-memory store for development and tests) behind a handful of
//! operations, each bounded by a timeout.

mod keys;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, Error as ObjectStoreError, ObjectStore, PutOptions, PutPayload,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ServerConfig, StorageBackend};

pub use keys::{
    AUDIO_PREFIX, CONVERSATIONS_PREFIX, RECORDINGS_PREFIX, audio_key, conversation_key,
    is_valid_call_id, recording_key,
};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const WAV_CONTENT_TYPE: &str = "audio/wav";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid call id for storage key: {0:?}")]
    InvalidCallId(String),

    #[error("Invalid object path {path}: {message}")]
    InvalidPath { path: String, message: String },

    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to build storage client: {0}")]
    Configuration(String),

    #[error("Object store error: {0}")]
    Backend(#[from] ObjectStoreError),
}

/// Listing entry for the `/conversations` diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub name: String,
    pub created: Option<String>,
    pub size: u64,
}

#[derive(Clone)]
pub struct BlobStore {
    store: Arc<dyn ObjectStore>,
    uri_prefix: String,
    timeout: Duration,
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("uri_prefix", &self.uri_prefix)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl BlobStore {
    /// Wrap an existing store. `uri_prefix` is prepended to object keys when
    /// building references such as `gs://bucket/audio/CA1.wav`.
    pub fn new(store: Arc<dyn ObjectStore>, uri_prefix: impl Into<String>, timeout: Duration) -> Self {
        let mut uri_prefix = uri_prefix.into();
        // Keep the scheme separator of a bare prefix such as `memory://`
        if uri_prefix.ends_with('/') && !uri_prefix.ends_with("://") {
            uri_prefix.pop();
        }
        Self {
            store,
            uri_prefix,
            timeout,
        }
    }

    /// Process-local store; contents are lost when the process exits.
    pub fn in_memory(timeout: Duration) -> Self {
        Self::new(Arc::new(InMemory::new()), "memory://", timeout)
    }

    /// Build the store selected by configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StorageError> {
        match config.storage_backend {
            StorageBackend::Memory => {
                info!("Using in-memory conversation storage; archives are not durable");
                Ok(Self::in_memory(config.storage_timeout()))
            }
            StorageBackend::Gcs => {
                let mut builder =
                    GoogleCloudStorageBuilder::from_env().with_bucket_name(&config.gcs_bucket);
                if let Some(path) = &config.google_service_account {
                    builder = builder.with_service_account_path(path.to_string_lossy());
                }
                let store = builder
                    .build()
                    .map_err(|e| StorageError::Configuration(e.to_string()))?;

                info!(
                    bucket = %config.gcs_bucket,
                    project = %config.google_cloud_project,
                    "Using Google Cloud Storage"
                );
                Ok(Self::new(
                    Arc::new(store),
                    format!("gs://{}", config.gcs_bucket),
                    config.storage_timeout(),
                ))
            }
        }
    }

    /// Fully qualified reference for an object key.
    pub fn uri(&self, key: &str) -> String {
        if self.uri_prefix.ends_with("//") {
            format!("{}{}", self.uri_prefix, key)
        } else {
            format!("{}/{}", self.uri_prefix, key)
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StorageError>
    where
        F: std::future::Future<Output = Result<T, ObjectStoreError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StorageError::Timeout(self.timeout))?
            .map_err(StorageError::from)
    }

    /// Write an object, returning its reference.
    pub async fn put(
        &self,
        key: &str,
        body: impl Into<Bytes>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let path = parse_path(key)?;
        let body: Bytes = body.into();
        let size = body.len();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.bounded(self.store.put_opts(&path, PutPayload::from(body), options))
            .await?;

        debug!(key, size, "Stored object");
        Ok(self.uri(key))
    }

    /// Read an object. A missing object is `Ok(None)`, not an error.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let path = parse_path(key)?;
        let store = self.store.clone();
        let result = self
            .bounded(async move {
                match store.get(&path).await {
                    Ok(result) => result.bytes().await.map(Some),
                    Err(ObjectStoreError::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await?;
        Ok(result)
    }

    /// Up to `limit` objects under `prefix`, newest first.
    pub async fn list_recent(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<ObjectSummary>, StorageError> {
        let prefix_path = parse_path(prefix)?;
        let store = self.store.clone();
        let mut objects = self
            .bounded(async move {
                store
                    .list(Some(&prefix_path))
                    .try_collect::<Vec<_>>()
                    .await
            })
            .await?;

        objects.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

        Ok(objects
            .into_iter()
            .take(limit)
            .map(|meta| ObjectSummary {
                name: meta.location.to_string(),
                created: Some(meta.last_modified.to_rfc3339()),
                size: meta.size as u64,
            })
            .collect())
    }
}

fn parse_path(key: &str) -> Result<ObjectPath, StorageError> {
    ObjectPath::parse(key).map_err(|e| StorageError::InvalidPath {
        path: key.to_string(),
        message: e.to_string(),
    })
}
