use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, error, info, warn};

use crate::error_handling::types::StorageError;
use crate::storage::atomic_file::write_atomically;
use crate::storage::storage_trait::EventStore;
use crate::storage::types::ConnectionEvent;

/// File-backed event log shared by every decoy handler.
///
/// The persisted form is a JSON array of [`ConnectionEvent`]. Every append re-reads the file,
/// pushes the event and rewrites the whole array through a temp file + rename, all while holding
/// `write_lock`, so the file on disk is always a complete array. A file that can no longer be
/// read or parsed is treated as empty and overwritten on the next append.
pub struct FileEventLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileEventLog {
    /// Opens the log at `path`, creating parent directories and an empty array if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            write_atomically(&path, b"[]").map_err(|e| {
                error!("Failed to create event log {}: {}", path.display(), e);
                StorageError::WriteFailed(e)
            })?;
        }
        info!("Event log initialized at {}", path.display());

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_events(&self) -> Result<Vec<ConnectionEvent>, StorageError> {
        let content = match fs::read(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                error!("Failed to read event log {}: {}", self.path.display(), e);
                return Err(StorageError::ReadFailed(e));
            }
        };

        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        match serde_json::from_slice::<Vec<ConnectionEvent>>(&content) {
            Ok(events) => Ok(events),
            Err(e) => {
                warn!(
                    "Event log {} is corrupt ({}), starting from an empty log",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }
}

impl EventStore for FileEventLog {
    fn append(&self, event: ConnectionEvent) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| {
            error!("Event log lock poisoned for {}", self.path.display());
            StorageError::LockPoisoned
        })?;

        let mut events = self.read_events().unwrap_or_else(|e| {
            warn!(
                "Event log {} unreadable ({}), starting from an empty log",
                self.path.display(),
                e
            );
            Vec::new()
        });
        events.push(event);

        let serialized = serde_json::to_vec_pretty(&events).map_err(|e| {
            error!("Failed to serialize event log: {}", e);
            StorageError::SerializeFailed(e.to_string())
        })?;
        write_atomically(&self.path, &serialized).map_err(|e| {
            error!("Failed to write event log {}: {}", self.path.display(), e);
            StorageError::WriteFailed(e)
        })?;

        debug!("Event log {} now holds {} event(s)", self.path.display(), events.len());
        Ok(())
    }

    fn snapshot(&self) -> Result<Vec<ConnectionEvent>, StorageError> {
        self.read_events()
    }
}
