//! One-file-per-key storage in a data directory
//!
//! Each key maps to `<data_dir>/<key>.json`. Writes go to a temp file that is
//! then renamed over the target, so a crash never leaves half a ledger.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use shared::{KeyValueStore, StoreError};

const FILE_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    quota_bytes: Option<usize>,
}

impl FileStore {
    /// Open (creating if needed) the store rooted at `root`
    pub fn open(root: impl Into<PathBuf>, quota_bytes: Option<usize>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::info!("Ledger storage at {}", root.display());
        Ok(Self { root, quota_bytes })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::Unavailable(format!("invalid storage key '{}'", key)));
        }
        Ok(self.root.join(format!("{}.{}", key, FILE_EXTENSION)))
    }

    fn used_bytes_excluding(&self, skip: &Path) -> Result<usize, StoreError> {
        let mut total = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path == skip || path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            total += entry.metadata()?.len() as usize;
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;

        if let Some(limit) = self.quota_bytes {
            let needed = self.used_bytes_excluding(&path)? + value.len();
            if needed > limit {
                return Err(StoreError::QuotaExceeded { needed, limit });
            }
        }

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, value)?;
        fs::rename(&temp_path, &path)?;
        tracing::debug!("Stored {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.path_for(key)?.exists())
    }
}
