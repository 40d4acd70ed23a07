// Local filesystem adapter - File system operations on the host

use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::errors::*;
use crate::ports::*;

/// Filesystem adapter backed by the local disk
#[derive(Debug, Default, Clone)]
pub struct FsLocalAdapter;

impl FsLocalAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FsPort for FsLocalAdapter {
    async fn file_exists(&self, path: &Path) -> Result<bool, DomainError> {
        Ok(tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false))
    }

    async fn file_size(&self, path: &Path) -> Result<u64, DomainError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to get file size of {}: {}", path.display(), e)))?;
        Ok(metadata.len())
    }

    async fn write_new_file(&self, path: &Path, contents: &str) -> Result<(), DomainError> {
        // Stage next to the target so the final rename stays on one filesystem
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| DomainError::FsFail(format!("Failed to create temp file in {}: {}", dir.display(), e)))?;
        staged
            .write_all(contents.as_bytes())
            .map_err(|e| DomainError::FsFail(format!("Failed to write {}: {}", path.display(), e)))?;
        staged
            .persist_noclobber(path)
            .map_err(|e| DomainError::FsFail(format!("Refusing to overwrite {}: {}", path.display(), e.error)))?;
        debug!("Wrote side file {}", path.display());
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<(), DomainError> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to delete {}: {}", path.display(), e)))
    }
}
