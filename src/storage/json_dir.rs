//! File-per-key JSON persistence.
//!
//! - `<dir>/<key>.json` holds the current document
//! - the previous version is copied to `<dir>/<key>.json.bak` before each save
//! - writes go to a temp file and are renamed into place
//! - if the main file can't be read, the backup is tried
//! - `put_all` stages every temp file before renaming any of them

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{KeyValueStore, StorageResult};

#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Open (creating if needed) a document directory.
    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "JSON document store opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn doc_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn backup_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json.bak", key))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json.tmp", key))
    }
}

impl KeyValueStore for JsonDirStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.doc_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                warn!(key, error = %e, "document unreadable, trying backup");
                match fs::read_to_string(self.backup_path(key)) {
                    Ok(raw) => Ok(Some(raw)),
                    Err(_) => Err(e.into()),
                }
            }
        }
    }

    fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        self.put_all(&[(key, value.to_string())])
    }

    fn put_all(&self, entries: &[(&str, String)]) -> StorageResult<()> {
        let mut staged = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let tmp = self.temp_path(key);
            if let Err(e) = fs::write(&tmp, value) {
                warn!(key, error = %e, "staging failed, no document replaced");
                for path in staged.iter().chain(std::iter::once(&tmp)) {
                    let _ = fs::remove_file(path);
                }
                return Err(e.into());
            }
            staged.push(tmp);
        }

        for ((key, _), tmp) in entries.iter().zip(&staged) {
            self.promote(key, tmp)?;
        }
        Ok(())
    }
}

impl JsonDirStore {
    /// Back up the current document, then move the staged file over it.
    fn promote(&self, key: &str, tmp: &Path) -> StorageResult<()> {
        let path = self.doc_path(key);
        if path.exists() {
            if let Err(e) = fs::copy(&path, self.backup_path(key)) {
                warn!(key, error = %e, "backup copy failed");
            }
        }
        fs::rename(tmp, &path)?;
        Ok(())
    }
}
