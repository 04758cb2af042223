use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

use crate::identity::rotator::Severity;

/// Lifecycle of the rotation control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchestratorState {
    Idle,
    Running,
    Waiting,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleOutcome {
    Success,
    RolledBack,
    Failed,
}

/// One pass of the rotation loop, folded into the status snapshot once complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationCycle {
    pub id: Uuid,
    pub previous_identity: IpAddr,
    pub candidate_identity: IpAddr,
    pub outcome: CycleOutcome,
    /// Set for failed cycles; `Critical` marks an unrecovered rollback.
    pub severity: Option<Severity>,
    pub timestamp: DateTime<Utc>,
}

/// Status published after every orchestrator transition and read by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: OrchestratorState,
    pub active_identity: IpAddr,
    /// `false` after an unrecovered rollback: `active_identity` is then the last identity the
    /// interface held, not one it holds now.
    pub identity_bound: bool,
    pub total_rotations: u64,
    pub next_rotation_estimate: Option<DateTime<Utc>>,
    pub last_cycle: Option<RotationCycle>,
    pub last_updated_utc: DateTime<Utc>,
}
