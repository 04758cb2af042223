use log::{debug, error, warn};
use std::path::{Path, PathBuf};

use crate::error_handling::types::CollaboratorError;
use crate::orchestrator::types::StatusSnapshot;
use crate::storage::atomic_file::write_atomically;

/// Receives a snapshot after every orchestrator transition. Fire-and-forget: implementations
/// log their own failures.
pub trait StatusSink: Send + Sync {
    fn publish(&self, snapshot: &StatusSnapshot);
}

/// Writes the latest snapshot as pretty JSON, replacing the file atomically.
pub struct FileStatusSink {
    path: PathBuf,
}

impl FileStatusSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, snapshot: &StatusSnapshot) -> Result<(), CollaboratorError> {
        let body = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| CollaboratorError::Api(format!("status serialization: {}", e)))?;
        write_atomically(&self.path, &body)?;
        Ok(())
    }
}

impl StatusSink for FileStatusSink {
    fn publish(&self, snapshot: &StatusSnapshot) {
        match self.write(snapshot) {
            Ok(()) => debug!(
                "Status {:?} written to {}",
                snapshot.status,
                self.path.display()
            ),
            Err(e) => error!(
                "Failed to write status file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Reads the last published snapshot, or `None` if the file is missing or unreadable.
pub fn read_status(path: &Path) -> Option<StatusSnapshot> {
    let content = std::fs::read(path).ok()?;
    match serde_json::from_slice(&content) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!("Unreadable status file {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::types::OrchestratorState;
    use chrono::Utc;
    use tempfile::TempDir;

    fn snapshot(status: OrchestratorState) -> StatusSnapshot {
        StatusSnapshot {
            status,
            active_identity: "10.0.0.2".parse().unwrap(),
            identity_bound: true,
            total_rotations: 3,
            next_rotation_estimate: Some(Utc::now()),
            last_cycle: None,
            last_updated_utc: Utc::now(),
        }
    }

    #[test]
    fn test_publish_then_read() {
        let dir = TempDir::new().unwrap();
        let sink = FileStatusSink::new(dir.path().join("logs").join("status.json"));

        sink.publish(&snapshot(OrchestratorState::Running));
        let latest = snapshot(OrchestratorState::Waiting);
        sink.publish(&latest);

        assert_eq!(read_status(sink.path()), Some(latest));
    }

    #[test]
    fn test_status_field_names() {
        let dir = TempDir::new().unwrap();
        let sink = FileStatusSink::new(dir.path().join("status.json"));
        sink.publish(&snapshot(OrchestratorState::Waiting));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(sink.path()).unwrap()).unwrap();
        assert_eq!(raw["status"], "Waiting");
        assert_eq!(raw["active_identity"], "10.0.0.2");
        assert_eq!(raw["identity_bound"], true);
        assert_eq!(raw["total_rotations"], 3);
        assert!(raw["next_rotation_estimate"].is_string());
    }

    #[test]
    fn test_missing_or_corrupt_status_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.json");
        assert_eq!(read_status(&path), None);

        std::fs::write(&path, "{\"status\": ").unwrap();
        assert_eq!(read_status(&path), None);
    }

    #[test]
    fn test_publish_failure_does_not_panic() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "x").unwrap();
        let sink = FileStatusSink::new(blocker.join("status.json"));

        sink.publish(&snapshot(OrchestratorState::Running));
        assert_eq!(read_status(sink.path()), None);
    }
}
