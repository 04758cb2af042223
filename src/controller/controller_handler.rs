use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::collaborators::{
    CertificateRotator, CloudflareDnsUpdater, DnsUpdater, FileStatusSink,
    OpensslCertificateRotator,
};
use crate::configuration::config::Config;
use crate::configuration::types::{ExecutorMode, Protocol};
use crate::decoy::DecoyListener;
use crate::error_handling::types::*;
use crate::identity::{
    IdentityPool, IdentityRotator, InterfaceExecutor, ScriptExecutor, SimulatedExecutor,
};
use crate::orchestrator::{Collaborators, JitterSchedule, RotationOrchestrator};
use crate::storage::{EventStore, FileEventLog};

/// A decoy whose accept loop is running.
pub struct RunningDecoy {
    pub protocol: Protocol,
    pub port: u16,
    handle: JoinHandle<()>,
}

/// Wires the engine together and owns it for the process lifetime.
pub struct Controller {
    pub config: Config,
    orchestrator: RotationOrchestrator,
    event_log: Arc<dyn EventStore>,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        info!("[+] Building controller");

        let executor: Arc<dyn InterfaceExecutor> = match config.executor.mode {
            ExecutorMode::Script => {
                let (Some(assign), Some(flush)) = (
                    config.executor.assign_script.clone(),
                    config.executor.flush_script.clone(),
                ) else {
                    return Err(ControllerError::InitializationFailed(
                        "script executor requires assign and flush scripts".to_string(),
                    ));
                };
                info!(
                    "[+] Script executor: {} {} / {}",
                    config.executor.shell,
                    assign.display(),
                    flush.display()
                );
                Arc::new(ScriptExecutor::new(config.executor.shell.clone(), assign, flush))
            }
            ExecutorMode::Simulation => {
                warn!("[+] Simulation executor: interface changes are only logged");
                Arc::new(SimulatedExecutor)
            }
        };

        let rotation = &config.rotation;
        let pool = IdentityPool::new(rotation.ip_pool.iter().copied());
        if pool.is_empty() {
            return Err(ControllerError::InitializationFailed(
                "identity pool is empty".to_string(),
            ));
        }
        let initial_identity = config
            .initial_identity()
            .filter(|ip| pool.contains(ip))
            .ok_or_else(|| {
                ControllerError::InitializationFailed(
                    "initial identity is not part of the pool".to_string(),
                )
            })?;
        if !pool.can_rotate() {
            warn!("Identity pool has a single identity, rotation cycles will be skipped");
        }

        let rotator = IdentityRotator::new(
            executor,
            rotation.interface.clone(),
            rotation.subnet_mask,
            Duration::from_secs(rotation.executor_timeout_secs),
        );
        let schedule = JitterSchedule::from_secs(
            rotation.base_interval_secs,
            rotation.jitter_secs,
            rotation.minimum_wait_secs,
        );

        let dns: Option<Arc<dyn DnsUpdater>> = if config.dns.enabled {
            let updater = CloudflareDnsUpdater::from_config(&config.dns).map_err(|e| {
                error!("Unable to build the DNS client: {}", e);
                ControllerError::InitializationFailed(e.to_string())
            })?;
            Some(Arc::new(updater))
        } else {
            None
        };

        let certificates: Option<Arc<dyn CertificateRotator>> = if config.tls.enabled {
            Some(Arc::new(OpensslCertificateRotator::from_config(&config.tls)))
        } else {
            None
        };

        let status = FileStatusSink::new(&config.status.path);
        info!("[+] Status published to {}", status.path().display());
        let collaborators = Collaborators {
            dns,
            certificates,
            status: Arc::new(status),
        };

        let event_log = FileEventLog::open(&config.event_log.path).map_err(|e| {
            error!(
                "Unable to open event log {}: {}",
                config.event_log.path.display(),
                e
            );
            ControllerError::StorageError(e)
        })?;

        let orchestrator =
            RotationOrchestrator::new(pool, initial_identity, rotator, schedule, collaborators);

        Ok(Self {
            config,
            orchestrator,
            event_log: Arc::new(event_log),
        })
    }

    /// Binds and starts every enabled decoy. Individual bind failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// `ControllerError::NoListenerBound` when decoys are enabled but none could be bound.
    pub fn start_decoys(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<RunningDecoy>, ControllerError> {
        let enabled: Vec<_> = self.config.decoys.iter().filter(|d| d.enabled).collect();
        if enabled.is_empty() {
            warn!("No decoy enabled, running rotation only");
            return Ok(Vec::new());
        }

        let mut running = Vec::with_capacity(enabled.len());
        for decoy in enabled {
            match DecoyListener::bind(decoy, Arc::clone(&self.event_log)) {
                Ok(listener) => running.push(RunningDecoy {
                    protocol: listener.protocol(),
                    port: listener.local_port(),
                    handle: listener.start(cancel.clone()),
                }),
                Err(e) => warn!("[!] {} decoy not started: {}", decoy.protocol, e),
            }
        }

        if running.is_empty() {
            error!("[!] None of the configured decoys could be bound");
            return Err(ControllerError::NoListenerBound);
        }
        Ok(running)
    }

    /// Runs decoys and the rotation loop until `cancel` fires, then waits for them to stop.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ControllerError> {
        info!("[+] Starting controller");
        let decoys = self.start_decoys(&cancel)?;

        let mut orchestrator = self.orchestrator;
        let token = cancel.clone();
        let rotation = tokio::spawn(async move {
            orchestrator.run(token).await;
            orchestrator.total_rotations()
        });

        cancel.cancelled().await;
        info!("[-] Shutdown requested, stopping components");

        match rotation.await {
            Ok(total) => info!("[-] Rotation loop stopped after {} rotation(s)", total),
            Err(e) => error!("[!] Rotation task failed: {}", e),
        }
        for decoy in decoys {
            if let Err(e) = decoy.handle.await {
                error!("[!] {} decoy task failed: {}", decoy.protocol, e);
            }
        }

        info!("[-] Controller stopped");
        Ok(())
    }
}
