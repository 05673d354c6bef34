use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Blob storage for uploaded APK binaries: a flat directory under the data
/// dir, served read-only at `/downloads/{stored_name}`.
#[derive(Debug, Clone)]
pub struct ApkStorage {
    root: PathBuf,
    public_url: String,
}

impl ApkStorage {
    pub fn new(data_dir: &str, public_url: &str) -> Self {
        Self {
            root: Path::new(data_dir).join("apk-files"),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the blob directory if it does not exist.
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create apk storage dir {}", self.root.display()))?;
        Ok(())
    }

    /// Public download URL for a stored object.
    pub fn url_for(&self, stored_name: &str) -> String {
        format!("{}/downloads/{}", self.public_url, stored_name)
    }

    /// The stored object name is the last path segment of a download URL.
    pub fn stored_name_from_url(file_url: &str) -> Option<&str> {
        file_url.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Write an uploaded blob. `stored_name` must already be unique
    /// (the upload route prefixes it with a millisecond timestamp).
    pub async fn save(&self, stored_name: &str, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;
        let path = self.root.join(stored_name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Remove a stored blob.
    pub async fn remove(&self, stored_name: &str) -> Result<()> {
        let path = self.root.join(stored_name);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("remove {}", path.display()))?;
        Ok(())
    }
}
