//! Per-request working directory with guaranteed cleanup.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Scoped working directory for one acquisition request.
///
/// Named with a UUID so concurrent sessions never collide. The directory and
/// everything in it (downloaded audio, cookie files, caption files) is
/// removed when the guard drops, on success, failure, or cancellation.
#[derive(Debug)]
pub struct RequestWorkdir {
    path: PathBuf,
}

impl RequestWorkdir {
    /// Create a fresh request directory under `temp_root`.
    pub fn create(temp_root: &Path) -> Result<Self> {
        let path = temp_root.join(format!("req-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&path)?;
        debug!("Created request workdir {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RequestWorkdir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if self.path.exists() {
                warn!("Failed to clean up workdir {}: {}", self.path.display(), e);
            }
        } else {
            debug!("Removed request workdir {}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workdir_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let workdir = RequestWorkdir::create(root.path()).unwrap();
            std::fs::write(workdir.path().join("audio.mp3"), b"data").unwrap();
            workdir.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_workdir_names_unique() {
        let root = tempfile::tempdir().unwrap();
        let a = RequestWorkdir::create(root.path()).unwrap();
        let b = RequestWorkdir::create(root.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
