//! # Identity Rotator
//!
//! Moves the interface from one identity to another with flush-then-assign ordering and a
//! single rollback attempt.
//!
//! ```text
//! flush(old) ──fail──▶ Failure{Flush}                      (still on old, nothing changed)
//!     │ ok
//! assign(new) ──ok──▶ Success{new}
//!     │ fail
//! assign(old) ──ok──▶ Failure{Assign, recovered: true}     (back on old)
//!     │ fail
//!     └──────────────▶ Failure{Assign, recovered: false}   (interface may be unbound)
//! ```
//!
//! No retries happen here; the orchestrator's next cycle is the retry policy. After an
//! unrecovered failure it calls [`IdentityRotator::assign_unbound`] instead, since there is no
//! address left to flush.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use super::executor::{InterfaceExecutor, InterfaceOperation};
use crate::error_handling::types::ExecutorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationStage {
    Flush,
    Assign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    /// Rollback failed: the interface may have no address bound. Operators page on this.
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationSuccess {
    pub active_identity: IpAddr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationFailure {
    pub stage: RotationStage,
    /// `None` for flush failures (no rollback needed), otherwise whether the rollback worked.
    pub recovered: Option<bool>,
    pub detail: String,
}

impl RotationFailure {
    pub fn severity(&self) -> Severity {
        match (self.stage, self.recovered) {
            (RotationStage::Assign, Some(false)) => Severity::Critical,
            _ => Severity::Error,
        }
    }

    pub fn is_unrecovered(&self) -> bool {
        self.severity() == Severity::Critical
    }
}

impl fmt::Display for RotationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.stage, self.recovered) {
            (RotationStage::Flush, _) => write!(f, "flush failed: {}", self.detail),
            (RotationStage::Assign, Some(true)) => {
                write!(f, "assign failed, rolled back: {}", self.detail)
            }
            (RotationStage::Assign, _) => {
                write!(f, "assign failed, rollback failed (unrecovered): {}", self.detail)
            }
        }
    }
}

pub struct IdentityRotator {
    executor: Arc<dyn InterfaceExecutor>,
    interface: String,
    mask: u8,
    timeout: Duration,
}

impl IdentityRotator {
    pub fn new(
        executor: Arc<dyn InterfaceExecutor>,
        interface: impl Into<String>,
        mask: u8,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            interface: interface.into(),
            mask,
            timeout,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Rotates the interface from `old` to `new`.
    ///
    /// The returned failure always describes a settled state: either still bound to `old`, or
    /// (for `recovered == Some(false)`) possibly unbound.
    pub async fn rotate(&self, old: IpAddr, new: IpAddr) -> Result<RotationSuccess, RotationFailure> {
        info!("[ROTATE] Starting rotation: {} -> {} on {}", old, new, self.interface);

        if let Err(detail) = self.invoke(InterfaceOperation::Flush, old).await {
            error!("[ROTATE] Failed to flush {} from {}: {}", old, self.interface, detail);
            return Err(RotationFailure {
                stage: RotationStage::Flush,
                recovered: None,
                detail,
            });
        }

        let assign_detail = match self.invoke(InterfaceOperation::Assign, new).await {
            Ok(()) => {
                info!("[ROTATE] Successfully rotated {} -> {}", old, new);
                return Ok(RotationSuccess {
                    active_identity: new,
                });
            }
            Err(detail) => detail,
        };

        warn!(
            "[ROTATE] Failed to assign {} on {} ({}), rolling back to {}",
            new, self.interface, assign_detail, old
        );

        match self.invoke(InterfaceOperation::Assign, old).await {
            Ok(()) => {
                warn!("[ROTATE] Rollback succeeded, {} still bound to {}", self.interface, old);
                Err(RotationFailure {
                    stage: RotationStage::Assign,
                    recovered: Some(true),
                    detail: assign_detail,
                })
            }
            Err(rollback_detail) => {
                error!(
                    "[ROTATE] CRITICAL: rollback of {} on {} failed, interface may have no address: {}",
                    old, self.interface, rollback_detail
                );
                Err(RotationFailure {
                    stage: RotationStage::Assign,
                    recovered: Some(false),
                    detail: format!("{}; rollback: {}", assign_detail, rollback_detail),
                })
            }
        }
    }

    /// Binds `new` on an interface left without an address by a failed rollback.
    ///
    /// There is nothing to flush and nothing to roll back to, so a failure keeps the interface
    /// unbound and is reported as unrecovered.
    pub async fn assign_unbound(&self, new: IpAddr) -> Result<RotationSuccess, RotationFailure> {
        info!(
            "[ROTATE] {} has no bound identity, assigning {} directly",
            self.interface, new
        );

        match self.invoke(InterfaceOperation::Assign, new).await {
            Ok(()) => {
                info!("[ROTATE] Recovered {} with {}", self.interface, new);
                Ok(RotationSuccess {
                    active_identity: new,
                })
            }
            Err(detail) => {
                error!(
                    "[ROTATE] CRITICAL: assigning {} on {} failed, interface still has no address: {}",
                    new, self.interface, detail
                );
                Err(RotationFailure {
                    stage: RotationStage::Assign,
                    recovered: Some(false),
                    detail,
                })
            }
        }
    }

    async fn invoke(&self, operation: InterfaceOperation, ip: IpAddr) -> Result<(), String> {
        let call = self
            .executor
            .execute(operation, ip, &self.interface, self.mask, self.timeout);

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(report)) if report.success => Ok(()),
            Ok(Ok(report)) if report.stderr.is_empty() => {
                Err(format!("{} of {} exited unsuccessfully", operation, ip))
            }
            Ok(Ok(report)) => Err(report.stderr),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(ExecutorError::TimedOut(self.timeout).to_string()),
        }
    }
}
