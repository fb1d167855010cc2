//! Durable storage for the session snapshot.
//!
//! The snapshot is kept as a single named entry, `auth-storage`, holding
//! `{"state": {"token", "user", "isAuthenticated"}, "version": 0}`.

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Session;

/// Name of the storage entry.
pub const STORAGE_NAME: &str = "auth-storage";

const STORAGE_VERSION: u32 = 0;

/// Errors raised by a storage backend.
///
/// These never reach session store callers: the store logs and carries on.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored entry is not valid JSON for a session.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// In-memory slot lock was poisoned.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Persisted envelope.
#[derive(Serialize, Deserialize)]
struct Persisted {
    state: Session,
    #[serde(default)]
    version: u32,
}

fn encode(session: &Session) -> Result<String, StorageError> {
    Ok(serde_json::to_string(&Persisted {
        state: session.clone(),
        version: STORAGE_VERSION,
    })?)
}

fn decode(raw: &str) -> Result<Session, StorageError> {
    let persisted: Persisted = serde_json::from_str(raw)?;
    Ok(persisted.state.normalized())
}

/// A place the session snapshot survives restarts in.
pub trait SessionStorage: Send + Sync {
    /// Read the stored snapshot. `Ok(None)` when nothing was stored yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry exists but cannot be read or parsed.
    fn load(&self) -> Result<Option<Session>, StorageError>;

    /// Replace the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be written.
    fn save(&self, session: &Session) -> Result<(), StorageError>;

    /// Remove the stored entry entirely.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry exists but cannot be removed.
    fn clear(&self) -> Result<(), StorageError>;
}

/// File-backed storage: `<dir>/auth-storage.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    /// Storage inside `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{STORAGE_NAME}.json")),
        }
    }

    /// Full path of the storage file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => decode(&raw).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a crash never leaves a half-written token behind
        let tmp = self.path.with_extension("json.tmp");
        match fs::remove_file(&tmp) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut file = private_file(&tmp)?;
        file.write_all(encode(session)?.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Create `path` readable by the owner only. The mode is applied at creation,
/// so the token is never visible to other users.
fn private_file(path: &Path) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}

/// In-memory storage, for tests and ephemeral sessions.
///
/// Still goes through the serialized form so the persisted shape is exercised.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<String>>,
}

impl MemorySessionStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a raw entry.
    #[must_use]
    pub fn with_raw(raw: &str) -> Self {
        Self {
            slot: Mutex::new(Some(raw.to_owned())),
        }
    }

    /// The raw stored entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Poisoned` if the slot lock was poisoned.
    pub fn raw(&self) -> Result<Option<String>, StorageError> {
        Ok(self.slot.lock().map_err(|_| StorageError::Poisoned)?.clone())
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        self.raw()?.as_deref().map(decode).transpose()
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        let raw = encode(session)?;
        *self.slot.lock().map_err(|_| StorageError::Poisoned)? = Some(raw);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock().map_err(|_| StorageError::Poisoned)? = None;
        Ok(())
    }
}

/// Read whatever is currently stored, for inspection.
///
/// Returns `None` when nothing is stored or the entry cannot be parsed; the
/// latter is logged.
pub fn read_stored_auth(storage: &dyn SessionStorage) -> Option<Session> {
    match storage.load() {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "Error parsing stored auth data");
            None
        }
    }
}

/// Remove the stored entry. Failures are logged.
pub fn clear_stored_auth(storage: &dyn SessionStorage) {
    match storage.clear() {
        Ok(()) => tracing::info!("Auth data cleared from storage"),
        Err(e) => tracing::warn!(error = %e, "Failed to clear stored auth data"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use repair_desk_core::UserRecord;
    use secrecy::SecretString;

    use super::*;

    fn signed_in() -> Session {
        Session::authenticated(
            SecretString::from("jwt-token-123"),
            UserRecord::new("1", "testuser", "test@example.com"),
        )
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path());

        assert!(storage.load().unwrap().is_none());

        storage.save(&signed_in()).unwrap();
        assert!(storage.path().exists());
        assert_eq!(storage.load().unwrap(), Some(signed_in()));

        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
        // Clearing twice is fine
        storage.clear().unwrap();
    }

    #[test]
    fn test_file_storage_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileSessionStorage::new(&nested);

        storage.save(&Session::default()).unwrap();
        assert!(nested.join("auth-storage.json").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path());
        storage.save(&signed_in()).unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_temp_file_is_private_from_creation() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.tmp");
        let file = private_file(&path).unwrap();

        let mode = file.metadata().unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_temp_file_is_replaced() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path());
        let tmp = storage.path().with_extension("json.tmp");
        fs::write(&tmp, "leftover").unwrap();
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o644)).unwrap();

        storage.save(&signed_in()).unwrap();

        assert!(!tmp.exists());
        assert_eq!(storage.load().unwrap(), Some(signed_in()));
        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_persisted_shape() {
        let storage = MemorySessionStorage::new();
        storage.save(&signed_in()).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&storage.raw().unwrap().unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({
                "state": {
                    "token": "jwt-token-123",
                    "user": {"id": "1", "username": "testuser", "email": "test@example.com"},
                    "isAuthenticated": true
                },
                "version": 0
            })
        );
    }

    #[test]
    fn test_corrupt_entry() {
        let storage = MemorySessionStorage::with_raw("{not json");
        assert!(matches!(storage.load(), Err(StorageError::Json(_))));
        assert!(read_stored_auth(&storage).is_none());
    }

    #[test]
    fn test_clear_stored_auth() {
        let storage = MemorySessionStorage::new();
        storage.save(&signed_in()).unwrap();

        clear_stored_auth(&storage);
        assert!(storage.raw().unwrap().is_none());
        assert!(read_stored_auth(&storage).is_none());
    }
}
