//! Storage subsystem
//!
//! Persistence for the decoy event log and the atomic-write helper shared with the status file.
//!
//! Components:
//! - `storage_trait`: the [`EventStore`] trait decoy handlers append through.
//! - `types`: the [`ConnectionEvent`] record.
//! - `file_storage`: JSON-array file implementation with serialized appends.
//! - `atomic_file`: temp file + rename writes so readers never see partial files.

pub mod atomic_file;
pub mod file_storage;
pub mod storage_trait;
pub mod types;

pub use file_storage::FileEventLog;
pub use storage_trait::EventStore;
pub use types::ConnectionEvent;
