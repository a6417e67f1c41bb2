//! File-backed snapshot storage.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::cart::CartSnapshot;

use super::{SnapshotError, SnapshotStore};

/// Snapshot storage in a single JSON file.
///
/// Writes go to a sibling temp file first and are moved into place with
/// a rename, so the stored record is always either the previous snapshot
/// or the new one, never a torn write.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store for the given snapshot path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut raw = self.path.clone().into_os_string();
        raw.push(".tmp");
        PathBuf::from(raw)
    }
}

impl SnapshotStore for FileStore {
    fn load(&self) -> Result<Option<CartSnapshot>, SnapshotError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        fs::write(&temp, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SnapshotError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
