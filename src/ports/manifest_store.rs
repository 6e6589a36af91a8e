use async_trait::async_trait;
use thiserror::Error;

/// Error type for manifest persistence
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ManifestStoreError {
    /// Error when encountering an IO issue
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error when the configured location cannot hold a manifest
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for manifest persistence
pub type ManifestStoreResult<T> = Result<T, ManifestStoreError>;

/// ManifestStore defines the port (interface) for the persisted route manifest
#[async_trait]
pub trait ManifestStore: Send + Sync + 'static {
    /// Read the persisted manifest, `None` if nothing has been stored yet.
    async fn load(&self) -> ManifestStoreResult<Option<Vec<u8>>>;

    /// Replace the persisted manifest.
    ///
    /// Implementations must be atomic: after a failure the previously stored
    /// manifest is still readable and intact.
    async fn persist(&self, manifest: &[u8]) -> ManifestStoreResult<()>;

    /// Human readable location, for logs.
    fn location(&self) -> String;
}
