//! Filesystem store for raw detail-page markup

use crate::storage::traits::ArtifactStore;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Derives the artifact key for a URL: the hex SHA-256 of the URL string
pub fn artifact_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Writes one `<key>.html` file per listing under a root directory
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates the store. The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.html", key))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn save_raw(&self, markup: &str, key: &str) -> bool {
        if let Err(e) = fs::create_dir_all(&self.root) {
            tracing::warn!(
                "Cannot create artifact directory {}: {}",
                self.root.display(),
                e
            );
            return false;
        }

        let path = self.path_for(key);
        match fs::write(&path, markup) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to save raw markup to {}: {}", path.display(), e);
                false
            }
        }
    }

    fn location(&self, key: &str) -> String {
        self.path_for(key).to_string_lossy().into_owned()
    }
}
