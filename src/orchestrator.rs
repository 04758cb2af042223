//! Rotation control loop.
//!
//! - `rotation_orchestrator`: [`RotationOrchestrator`], owner of the active identity.
//! - `post_rotation`: [`PostRotationWorker`], serializing DNS and certificate updates.
//! - `schedule`: [`JitterSchedule`] for the randomized wait between cycles.
//! - `types`: lifecycle states, cycle records and the published [`StatusSnapshot`].

pub mod post_rotation;
pub mod rotation_orchestrator;
pub mod schedule;
pub mod types;

pub use post_rotation::PostRotationWorker;
pub use rotation_orchestrator::{Collaborators, RotationOrchestrator};
pub use schedule::JitterSchedule;
pub use types::{CycleOutcome, OrchestratorState, RotationCycle, StatusSnapshot};
