//! # Rotation Orchestrator
//!
//! Top-level control loop. Each iteration runs one rotation cycle and then sleeps for a
//! jittered interval:
//!
//! ```text
//! Idle ──▶ Running ──▶ Waiting ──▶ Running ──▶ … ──(cancel)──▶ Stopped
//! ```
//!
//! The orchestrator is the single writer of the active identity and the rotation counter.
//! Cycles never overlap: selection always reads the identity settled by the previous cycle.
//! A failed cycle is logged and the loop carries on; only cancellation stops it. After an
//! unrecovered rollback the next cycle assigns its candidate directly, which lets the
//! interface heal. DNS and certificate updates go through one [`PostRotationWorker`].

use chrono::Utc;
use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::post_rotation::PostRotationWorker;
use super::schedule::JitterSchedule;
use super::types::{CycleOutcome, OrchestratorState, RotationCycle, StatusSnapshot};
use crate::collaborators::{CertificateRotator, DnsUpdater, StatusSink};
use crate::identity::pool::IdentityPool;
use crate::identity::rotator::{IdentityRotator, Severity};

/// Collaborators notified by the orchestrator. DNS and certificate rotation are optional.
#[derive(Clone)]
pub struct Collaborators {
    pub dns: Option<Arc<dyn DnsUpdater>>,
    pub certificates: Option<Arc<dyn CertificateRotator>>,
    pub status: Arc<dyn StatusSink>,
}

pub struct RotationOrchestrator {
    pool: IdentityPool,
    rotator: IdentityRotator,
    schedule: JitterSchedule,
    collaborators: Collaborators,
    active_identity: IpAddr,
    identity_bound: bool,
    total_rotations: u64,
    state: OrchestratorState,
    next_rotation: Option<chrono::DateTime<Utc>>,
    last_cycle: Option<RotationCycle>,
    post_rotation: Option<PostRotationWorker>,
    rng: StdRng,
}

impl RotationOrchestrator {
    pub fn new(
        pool: IdentityPool,
        initial_identity: IpAddr,
        rotator: IdentityRotator,
        schedule: JitterSchedule,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            pool,
            rotator,
            schedule,
            collaborators,
            active_identity: initial_identity,
            identity_bound: true,
            total_rotations: 0,
            state: OrchestratorState::Idle,
            next_rotation: None,
            last_cycle: None,
            post_rotation: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replaces the entropy-seeded generator, mainly for reproducible tests.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn active_identity(&self) -> IpAddr {
        self.active_identity
    }

    pub fn total_rotations(&self) -> u64 {
        self.total_rotations
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            status: self.state,
            active_identity: self.active_identity,
            identity_bound: self.identity_bound,
            total_rotations: self.total_rotations,
            next_rotation_estimate: self.next_rotation,
            last_cycle: self.last_cycle.clone(),
            last_updated_utc: Utc::now(),
        }
    }

    fn publish(&self) {
        self.collaborators.status.publish(&self.snapshot());
    }

    fn transition(&mut self, state: OrchestratorState) {
        self.state = state;
        self.publish();
    }

    /// Runs one rotation cycle. Returns `None` when the pool offers no candidate.
    pub async fn run_cycle(&mut self) -> Option<RotationCycle> {
        let previous = self.active_identity;
        let Some(candidate) = self.pool.choose_candidate(previous, &mut self.rng) else {
            info!(
                "Identity pool has {} distinct entr(y/ies), skipping rotation",
                self.pool.len()
            );
            return None;
        };

        self.next_rotation = None;
        self.transition(OrchestratorState::Running);

        let id = Uuid::new_v4();
        let timestamp = Utc::now();
        info!("[cycle {}] Rotating {} -> {}", id, previous, candidate);

        let result = if self.identity_bound {
            self.rotator.rotate(previous, candidate).await
        } else {
            self.rotator.assign_unbound(candidate).await
        };

        let (outcome, severity) = match result {
            Ok(success) => {
                self.active_identity = success.active_identity;
                self.identity_bound = true;
                self.total_rotations += 1;
                info!(
                    "[cycle {}] Active identity is now {} (rotation #{})",
                    id, self.active_identity, self.total_rotations
                );
                self.notify_collaborators(success.active_identity);
                (CycleOutcome::Success, None)
            }
            Err(failure) => {
                let severity = failure.severity();
                match severity {
                    Severity::Critical => {
                        self.identity_bound = false;
                        error!(
                            "[cycle {}] CRITICAL: {} on {}; interface may be unconfigured, next cycle assigns directly",
                            id,
                            failure,
                            self.rotator.interface()
                        )
                    }
                    Severity::Error => error!(
                        "[cycle {}] Rotation failed, staying on {}: {}",
                        id, previous, failure
                    ),
                }
                let outcome = if failure.recovered == Some(true) {
                    CycleOutcome::RolledBack
                } else {
                    CycleOutcome::Failed
                };
                (outcome, Some(severity))
            }
        };

        let cycle = RotationCycle {
            id,
            previous_identity: previous,
            candidate_identity: candidate,
            outcome,
            severity,
            timestamp,
        };
        self.last_cycle = Some(cycle.clone());
        self.publish();
        Some(cycle)
    }

    /// Hands the new identity to the post-rotation worker without waiting on it; DNS and
    /// certificate failures never undo the identity change.
    fn notify_collaborators(&mut self, new_identity: IpAddr) {
        if self.post_rotation.is_none() {
            self.post_rotation = PostRotationWorker::spawn(
                self.collaborators.dns.clone(),
                self.collaborators.certificates.clone(),
            );
        }
        if let Some(worker) = &self.post_rotation {
            worker.notify(new_identity);
        }
    }

    /// Waits for the pending DNS and certificate update, if any.
    async fn finish_post_rotation(&mut self) {
        if let Some(worker) = self.post_rotation.take() {
            info!("Waiting for pending post-rotation updates");
            worker.close().await;
        }
    }

    /// Runs cycles until `cancel` fires. The first cycle starts immediately.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(
            "Rotation orchestrator started on {} with {} identities, active {}",
            self.rotator.interface(),
            self.pool.len(),
            self.active_identity
        );

        while !cancel.is_cancelled() {
            self.run_cycle().await;

            let wait = self.schedule.next_wait(&mut self.rng);
            self.next_rotation = chrono::Duration::from_std(wait)
                .ok()
                .map(|d| Utc::now() + d);
            self.transition(OrchestratorState::Waiting);
            info!("Next rotation in {:.1} seconds", wait.as_secs_f64());

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(wait) => {}
            }
        }

        self.finish_post_rotation().await;
        self.next_rotation = None;
        self.transition(OrchestratorState::Stopped);
        info!(
            "Rotation orchestrator stopped after {} rotation(s), active identity {}",
            self.total_rotations, self.active_identity
        );
    }
}
