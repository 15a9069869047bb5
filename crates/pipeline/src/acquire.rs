//! Repository acquisition. A job first materializes its source tree on the
//! local filesystem; local paths are used in place, while future acquirers
//! (archives, remotes) can stage into a temporary directory that is cleaned
//! up when the job finishes, success or failure alike.

use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::warn;

/// A usable local checkout. Dropping it removes any staged temporary
/// directory; repositories analyzed in place are left untouched.
pub struct AcquiredRepository {
    root: PathBuf,
    staged: Option<TempDir>,
}

impl AcquiredRepository {
    pub fn in_place(root: PathBuf) -> Self {
        Self { root, staged: None }
    }

    pub fn staged(staged: TempDir) -> Self {
        Self {
            root: staged.path().to_path_buf(),
            staged: Some(staged),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Explicit cleanup so removal failures can be logged instead of lost in
    /// a silent drop. Never fails the job.
    pub fn cleanup(mut self) {
        if let Some(staged) = self.staged.take()
            && let Err(error) = staged.close()
        {
            warn!(?error, "failed to remove staged repository directory");
        }
    }
}

#[async_trait]
pub trait RepositoryAcquirer: Send + Sync {
    async fn acquire(&self, url: &str, branch: &str)
    -> Result<AcquiredRepository, PipelineError>;
}

/// Treats the url as an existing local directory and uses it directly,
/// without copying. The branch is ignored; a local checkout is analyzed on
/// whatever branch it has checked out.
pub struct LocalPathAcquirer;

#[async_trait]
impl RepositoryAcquirer for LocalPathAcquirer {
    async fn acquire(
        &self,
        url: &str,
        _branch: &str,
    ) -> Result<AcquiredRepository, PipelineError> {
        let source = Path::new(url);
        if !source.exists() {
            return Err(PipelineError::Acquisition(format!(
                "path does not exist: {url}"
            )));
        }
        if !source.is_dir() {
            return Err(PipelineError::Acquisition(format!(
                "path is not a directory: {url}"
            )));
        }
        Ok(AcquiredRepository::in_place(source.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_path_is_an_acquisition_error() {
        let err = LocalPathAcquirer
            .acquire("/nonexistent/repo", "main")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Acquisition(_)));
    }

    #[tokio::test]
    async fn file_path_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("main.ts");
        std::fs::write(&file, "export const x = 1;").unwrap();
        let err = LocalPathAcquirer
            .acquire(&file.to_string_lossy(), "main")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Acquisition(_)));
    }

    #[tokio::test]
    async fn existing_directory_is_used_in_place() {
        let dir = TempDir::new().unwrap();
        let repo = LocalPathAcquirer
            .acquire(&dir.path().to_string_lossy(), "main")
            .await
            .unwrap();
        assert_eq!(repo.root(), dir.path());
        repo.cleanup();
        // In-place acquisition never deletes the source.
        assert!(dir.path().exists());
    }
}
