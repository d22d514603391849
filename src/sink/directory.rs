//! Archive directory sink
//!
//! Objects are plain files named by their key. Each upload is copied to a
//! hidden partial file in the archive and renamed into place, so an
//! interrupted copy never leaves a truncated object under the real key.

use crate::sink::traits::{check_key, SinkError, SinkResult, StorageSink};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Stores artifacts in a local or mounted directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an object is stored at
    pub fn object_path(&self, key: &str) -> SinkResult<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageSink for DirectorySink {
    async fn upload(&self, local: &Path, key: &str) -> SinkResult<()> {
        let target = self.object_path(key)?;
        let partial = self.root.join(format!(".{}.partial", key));

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| SinkError::io(&self.root, e))?;
        tokio::fs::copy(local, &partial)
            .await
            .map_err(|e| SinkError::io(local, e))?;
        tokio::fs::rename(&partial, &target)
            .await
            .map_err(|e| SinkError::io(&target, e))?;

        tracing::debug!("Stored {} at {}", key, target.display());
        Ok(())
    }

    async fn delete(&self, key: &str) -> SinkResult<()> {
        let target = self.object_path(key)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} already absent from {}", key, self.root.display());
                Ok(())
            }
            Err(e) => Err(SinkError::io(&target, e)),
        }
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}
