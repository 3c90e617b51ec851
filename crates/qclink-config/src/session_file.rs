// ── File-backed credential store ──
//
// Session state as a small TOML file under the platform data dir. The
// file holds endpoint, account, token and registration id; it never
// holds the password. On Unix it is only ever owner-read/write.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use qclink_core::{CredentialStore, SessionRecord, StoreError, StoreKey};

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the canonical session path.
    pub fn default_location() -> Self {
        Self::new(crate::session_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SessionRecord, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => toml::from_str(&text).map_err(|e| StoreError::Corrupt {
                message: format!("{}: {e}", self.path.display()),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(SessionRecord::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, record: &SessionRecord) -> Result<(), StoreError> {
        if record.is_empty() {
            debug!(path = %self.path.display(), "removing empty session file");
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let text = toml::to_string_pretty(record).map_err(|e| StoreError::Corrupt {
            message: e.to_string(),
        })?;

        // Staged in a 0600 sibling, then renamed over the target.
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(text.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), "session file written");
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, keys: &[StoreKey]) -> Result<SessionRecord, StoreError> {
        Ok(self.read()?.project(keys))
    }

    fn set(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut current = self.read()?;
        current.merge(record);
        self.write(&current)
    }

    fn remove(&self, keys: &[StoreKey]) -> Result<(), StoreError> {
        let mut current = self.read()?;
        current.clear(keys);
        self.write(&current)
    }
}
