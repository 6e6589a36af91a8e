use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::ports::manifest_store::{ManifestStore, ManifestStoreError, ManifestStoreResult};

/// Manifest store backed by a single file on the local file system.
///
/// Writes go to a uniquely named temporary file next to the target and are
/// renamed over it, so readers (and a restarted gateway) only ever see a
/// complete manifest.
#[derive(Debug, Clone)]
pub struct FileManifestStore {
    path: PathBuf,
}

impl FileManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> ManifestStoreResult<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ManifestStoreError::InvalidPath(format!(
                    "{} does not name a file",
                    self.path.display()
                ))
            })?;
        Ok(self
            .path
            .with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4())))
    }

    async fn write_temp(temp_path: &Path, manifest: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(temp_path).await?;
        file.write_all(manifest).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl ManifestStore for FileManifestStore {
    async fn load(&self) -> ManifestStoreResult<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ManifestStoreError::IoError(e)),
        }
    }

    async fn persist(&self, manifest: &[u8]) -> ManifestStoreResult<()> {
        let temp_path = self.temp_path()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        if let Err(e) = Self::write_temp(&temp_path, manifest).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(ManifestStoreError::IoError(e));
        }

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(ManifestStoreError::IoError(e));
        }

        tracing::info!(
            path = %self.path.display(),
            size_bytes = manifest.len(),
            "Manifest persisted"
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_load_missing_manifest_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileManifestStore::new(dir.path().join("app.yaml"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persist_creates_directory_and_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FileManifestStore::new(dir.path().join("config").join("app.yaml"));

        store.persist(b"first").await.unwrap();
        store.persist(b"second").await.unwrap();

        assert_eq!(store.load().await.unwrap().as_deref(), Some(&b"second"[..]));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("config"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_failed_persist_cleans_up_temp_file() {
        let dir = TempDir::new().unwrap();

        // A non-empty directory squatting on the target path makes the rename fail.
        let blocked_path = dir.path().join("blocked");
        std::fs::create_dir(&blocked_path).unwrap();
        std::fs::write(blocked_path.join("keep"), b"x").unwrap();

        let store = FileManifestStore::new(&blocked_path);
        assert!(store.persist(b"new").await.is_err());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert!(blocked_path.join("keep").exists());
    }

    #[tokio::test]
    async fn test_path_without_file_name_is_rejected() {
        let store = FileManifestStore::new("/");
        assert!(matches!(
            store.persist(b"x").await,
            Err(ManifestStoreError::InvalidPath(_))
        ));
    }
}
