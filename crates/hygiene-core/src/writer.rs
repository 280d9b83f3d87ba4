//! Artifact sinks.
//!
//! Build output goes through [`ArtifactWriter`], addressed by paths relative
//! to the output root. [`FsWriter`] writes each file to a temporary sibling
//! and renames it into place, so a reader never sees a half-written page.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::{Error, Result};

/// Destination of generated artifacts.
#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    /// Write `contents` to `relative`, replacing any previous artifact.
    async fn write(&self, relative: &Path, contents: &str) -> Result<()>;
}

/// Reject paths that could escape the output root.
pub fn check_relative(relative: &Path) -> Result<()> {
    let mut has_segment = false;
    for component in relative.components() {
        match component {
            Component::Normal(_) => has_segment = true,
            _ => {
                return Err(Error::Config(format!(
                    "artifact path '{}' must be relative and stay below the output root",
                    relative.display()
                )));
            },
        }
    }
    if has_segment {
        Ok(())
    } else {
        Err(Error::Config("artifact path is empty".to_string()))
    }
}

/// Write `contents` to `path` through a temporary sibling file.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let written: std::io::Result<()> = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.flush().await?;
        drop(file);

        #[cfg(target_os = "windows")]
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            tokio::fs::remove_file(path).await?;
        }

        tokio::fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(err) = written {
        // The temporary sibling must not outlive a failed write.
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            debug!(path = %tmp_path.display(), error = %cleanup, "temporary file not removed");
        }
        return Err(err.into());
    }
    Ok(())
}

/// Writes artifacts below a root directory on disk.
#[derive(Debug, Clone)]
pub struct FsWriter {
    root: PathBuf,
}

impl FsWriter {
    /// Create a writer rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactWriter for FsWriter {
    async fn write(&self, relative: &Path, contents: &str) -> Result<()> {
        check_relative(relative)?;
        let path = self.root.join(relative);
        write_atomic(&path, contents).await?;
        debug!(path = %path.display(), bytes = contents.len(), "wrote artifact");
        Ok(())
    }
}

/// Keeps artifacts in memory; for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryWriter {
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents written to `relative`, if any.
    pub fn get(&self, relative: impl AsRef<Path>) -> Option<String> {
        self.lock().get(relative.as_ref()).cloned()
    }

    /// Every written path, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    /// Number of written artifacts.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ArtifactWriter for MemoryWriter {
    async fn write(&self, relative: &Path, contents: &str) -> Result<()> {
        check_relative(relative)?;
        self.lock().insert(relative.to_path_buf(), contents.to_string());
        Ok(())
    }
}
