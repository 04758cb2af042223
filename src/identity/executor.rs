//! # Interface Executor
//!
//! Capability that performs the OS-level address change for the Identity Rotator. Two
//! implementations are selected by configuration:
//!
//! - [`ScriptExecutor`] delegates to an external assign/flush script run by a shell.
//! - [`SimulatedExecutor`] only logs what it would do and always succeeds.
//!
//! Every call is bounded by the caller-supplied timeout; a call that outlives it is reported
//! as [`ExecutorError::TimedOut`] and the child process is killed.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error_handling::types::ExecutorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceOperation {
    Assign,
    Flush,
}

impl fmt::Display for InterfaceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceOperation::Assign => write!(f, "assign"),
            InterfaceOperation::Flush => write!(f, "flush"),
        }
    }
}

/// Result of one executor invocation that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub success: bool,
    pub stderr: String,
}

impl ExecutionReport {
    pub fn ok() -> Self {
        Self {
            success: true,
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stderr: stderr.into(),
        }
    }
}

#[async_trait]
pub trait InterfaceExecutor: Send + Sync {
    /// Applies `operation` for `ip/mask` on `interface`, giving up after `timeout`.
    async fn execute(
        &self,
        operation: InterfaceOperation,
        ip: IpAddr,
        interface: &str,
        mask: u8,
        timeout: Duration,
    ) -> Result<ExecutionReport, ExecutorError>;
}

/// Runs `<shell> <script> <ip> <interface> <mask>` for each operation.
pub struct ScriptExecutor {
    shell: String,
    assign_script: PathBuf,
    flush_script: PathBuf,
}

impl ScriptExecutor {
    pub fn new(shell: impl Into<String>, assign_script: PathBuf, flush_script: PathBuf) -> Self {
        Self {
            shell: shell.into(),
            assign_script,
            flush_script,
        }
    }

    fn script_for(&self, operation: InterfaceOperation) -> &Path {
        match operation {
            InterfaceOperation::Assign => &self.assign_script,
            InterfaceOperation::Flush => &self.flush_script,
        }
    }
}

#[async_trait]
impl InterfaceExecutor for ScriptExecutor {
    async fn execute(
        &self,
        operation: InterfaceOperation,
        ip: IpAddr,
        interface: &str,
        mask: u8,
        timeout: Duration,
    ) -> Result<ExecutionReport, ExecutorError> {
        let script = self.script_for(operation);
        if !tokio::fs::try_exists(script).await.unwrap_or(false) {
            error!("[{}] Script not found: {}", operation, script.display());
            return Err(ExecutorError::ScriptNotFound(script.to_path_buf()));
        }

        let mut cmd = Command::new(&self.shell);
        cmd.arg(script)
            .arg(ip.to_string())
            .arg(interface)
            .arg(mask.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            "[{}] Running {} {} {} {} {}",
            operation,
            self.shell,
            script.display(),
            ip,
            interface,
            mask
        );

        let child = cmd.spawn().map_err(|e| {
            error!("[{}] Failed to spawn {}: {}", operation, self.shell, e);
            ExecutorError::SpawnFailed(e)
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(ExecutorError::SpawnFailed)?,
            Err(_) => {
                warn!(
                    "[{}] {} on {} did not finish within {:.1}s",
                    operation,
                    ip,
                    interface,
                    timeout.as_secs_f64()
                );
                return Err(ExecutorError::TimedOut(timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("[{}] stdout: {}", operation, stdout.trim());
        }

        if output.status.success() {
            info!("[{}] {}/{} on {}", operation, ip, mask, interface);
            Ok(ExecutionReport::ok())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                "[{}] Failed for {} on {} ({}): {}",
                operation, ip, interface, output.status, stderr
            );
            Ok(ExecutionReport::failed(stderr))
        }
    }
}

/// Executor used in simulation mode: records the intent in the log and reports success.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedExecutor;

#[async_trait]
impl InterfaceExecutor for SimulatedExecutor {
    async fn execute(
        &self,
        operation: InterfaceOperation,
        ip: IpAddr,
        interface: &str,
        mask: u8,
        _timeout: Duration,
    ) -> Result<ExecutionReport, ExecutorError> {
        info!(
            "[SIMULATION] Would {} {}/{} on {}",
            operation, ip, mask, interface
        );
        Ok(ExecutionReport::ok())
    }
}
