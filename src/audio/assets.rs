//! Named assets and user-picked files as in-memory byte handles

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{PlayerError, PlayerResult};

/// An opened asset. Closing is dropping the handle.
#[derive(Clone, Debug)]
pub struct AssetHandle {
    pub name: String,
    pub bytes: Arc<[u8]>,
    /// Length as reported by the storage layer, `None` when unknown.
    pub byte_length: Option<u64>,
}

impl AssetHandle {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            byte_length: Some(bytes.len() as u64),
            bytes,
        }
    }

    /// File extension of the asset name, used as a probe hint.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }
}

/// Where audio assets come from.
pub trait AssetSource: Send + Sync {
    /// Open a bundled asset by name.
    fn open(&self, name: &str) -> PlayerResult<AssetHandle>;

    /// Open a file the user picked.
    fn open_path(&self, path: &Path) -> PlayerResult<AssetHandle> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let bytes = std::fs::read(path).map_err(|e| {
            PlayerError::SourceUnavailable(format!("Failed to open {}: {e}", path.display()))
        })?;
        Ok(AssetHandle::new(name, bytes))
    }
}

/// Assets stored as files under a root directory.
#[derive(Clone, Debug)]
pub struct FsAssets {
    root: PathBuf,
}

impl FsAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for FsAssets {
    fn open(&self, name: &str) -> PlayerResult<AssetHandle> {
        let path = self.root.join(name);
        log::debug!("Opening asset {:?}", path);
        let bytes = std::fs::read(&path).map_err(|e| {
            PlayerError::SourceUnavailable(format!("Failed to open asset {name}: {e}"))
        })?;
        Ok(AssetHandle::new(name, bytes))
    }
}
