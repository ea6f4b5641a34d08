//! Scoped per-repository working directory.

use std::path::{Path, PathBuf};

use crate::domain::error::BuildError;
use crate::domain::workdir_name;

/// Working directory removed on drop unless retention was requested.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    keep: bool,
}

impl WorkDir {
    /// Claim `<parent>/<basename(url)>`, removing whatever a previous run left there.
    ///
    /// The directory itself is not created; the clone step does that.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Checkout`] when the url has no usable name or the
    /// stale directory cannot be removed.
    pub async fn claim(parent: &Path, url: &str, keep: bool) -> Result<Self, BuildError> {
        let path = parent.join(workdir_name(url)?);
        if tokio::fs::symlink_metadata(&path).await.is_ok() {
            tracing::debug!(path = %path.display(), "removing stale working directory");
            remove_path(&path).await.map_err(|e| BuildError::Checkout {
                url: url.to_string(),
                detail: format!("cannot remove stale {}: {e}", path.display()),
            })?;
        }
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BuildError::Checkout {
                url: url.to_string(),
                detail: format!("cannot create {}: {e}", parent.display()),
            })?;
        Ok(Self { path, keep })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn join(&self, child: impl AsRef<Path>) -> PathBuf {
        self.path.join(child)
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.keep {
            tracing::info!(path = %self.path.display(), "keeping working directory");
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove working directory");
        }
    }
}

async fn remove_path(path: &Path) -> std::io::Result<()> {
    let meta = tokio::fs::symlink_metadata(path).await?;
    if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
}
