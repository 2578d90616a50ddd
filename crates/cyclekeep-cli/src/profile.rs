use crate::concurrency::ProfileLock;
use cyclekeep_schema::SerializedManager;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// The on-disk profile: one JSON document holding a serialized manager.
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    pub fn lock(&self) -> Result<ProfileLock, String> {
        ProfileLock::acquire(&self.lock_path())
    }

    /// Like [`ProfileStore::lock`], but `None` when another process holds it.
    pub fn try_lock(&self) -> Result<Option<ProfileLock>, String> {
        ProfileLock::try_acquire(&self.lock_path())
    }

    /// Read the raw blob. A missing file is the empty profile. The content
    /// is not validated here; booting does that.
    pub fn load(&self) -> Result<Value, String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SerializedManager::empty().to_json());
            }
            Err(e) => return Err(format!("failed to read profile {}: {e}", self.path.display())),
        };
        serde_json::from_str(&content).map_err(|e| {
            format!(
                "profile error: {} is not valid JSON: {e}",
                self.path.display()
            )
        })
    }

    /// Atomically replace the profile. Holding the lock is required.
    pub fn save(&self, _lock: &ProfileLock, profile: &SerializedManager) -> Result<(), String> {
        write_atomic(&self.path, &profile.to_json())
    }
}

/// Write pretty JSON via a temp file in the target directory and rename it
/// into place.
pub fn write_atomic(path: &Path, value: &Value) -> Result<(), String> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| format!("failed to create {}: {e}", dir.display()))?;

    let content = serde_json::to_string_pretty(value)
        .map_err(|e| format!("JSON serialization failed: {e}"))?;
    let mut tmp = NamedTempFile::new_in(&dir)
        .map_err(|e| format!("failed to create temp file in {}: {e}", dir.display()))?;
    tmp.write_all(content.as_bytes())
        .and_then(|()| tmp.write_all(b"\n"))
        .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    tmp.persist(path)
        .map_err(|e| format!("failed to write {}: {}", path.display(), e.error))?;
    Ok(())
}
