//! Event store trait
//!
//! Decoy handlers record probes through [`EventStore`] so the backing store can be swapped
//! (the file-backed [`FileEventLog`](crate::storage::file_storage::FileEventLog) in production,
//! in-memory or failing stores in tests).

use crate::error_handling::types::StorageError;
use crate::storage::types::ConnectionEvent;

/// Shared, append-only store of decoy connection events.
///
/// Implementations must serialize concurrent appends: no two appends may interleave, and a
/// reader must always observe a structurally complete sequence.
pub trait EventStore: Send + Sync {
    /// Appends one event to the store.
    fn append(&self, event: ConnectionEvent) -> Result<(), StorageError>;

    /// Returns every recorded event in append order.
    fn snapshot(&self) -> Result<Vec<ConnectionEvent>, StorageError>;
}
