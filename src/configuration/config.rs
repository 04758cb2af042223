use super::types::*;
use crate::error_handling::types::ConfigError;
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Application configuration structure that defines all runtime parameters.
///
/// This structure holds the complete configuration for the engine: the rotation policy, the
/// Interface Executor strategy, the decoy services and the external collaborators (DNS, TLS,
/// status file). It is read from a TOML file at startup and never changes afterwards.
///
/// # Examples
///
/// ```
/// use morphnet::configuration::config::Config;
///
/// let config = Config::from_toml_str(r#"
///     [rotation]
///     ip_pool = ["10.0.0.1", "10.0.0.2"]
///     interface = "eth0"
///     subnet_mask = 24
///     base_interval_secs = 300
///
///     [[decoys]]
///     protocol = "SSH"
///     port_range = { start = 2200, end = 2300 }
/// "#).unwrap();
///
/// assert_eq!(config.rotation.ip_pool.len(), 2);
/// ```
///
/// # Fields Overview
///
/// - `rotation`: identity pool, interface, mask and the jittered schedule
/// - `executor`: which Interface Executor runs the flush/assign operations
/// - `decoys`: one entry per decoy listener (protocol, port range, banner)
/// - `dns`: optional DNS record update after each successful rotation
/// - `tls`: optional certificate regeneration after each successful rotation
/// - `status`: location of the status snapshot file read by the dashboard
/// - `event_log`: location of the decoy connection log read by the dashboard
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Rotation policy
    ///
    /// The identity pool must contain at least one address. With fewer than two distinct
    /// addresses the engine runs but every rotation cycle is skipped.
    pub rotation: RotationConfig,

    /// Interface Executor selection
    ///
    /// Defaults to the simulation executor, which logs operations without touching the host.
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Decoy services to expose
    #[serde(default)]
    pub decoys: Vec<DecoyConfig>,

    #[serde(default)]
    pub dns: DnsConfig,

    #[serde(default)]
    pub tls: TlsConfig,

    #[serde(default)]
    pub status: StatusConfig,

    #[serde(default)]
    pub event_log: EventLogConfig,
}

impl Config {
    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::IoError` if the file cannot be read, `ConfigError::TomlError` if it
    /// is not valid TOML for this structure, and any validation error from [`Config::validate`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Reading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        debug!("Configuration validated: {:?}", config);
        Ok(config)
    }

    /// Checks the invariants the rest of the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rotation = &self.rotation;

        if rotation.ip_pool.is_empty() {
            return Err(ConfigError::EmptyIdentityPool);
        }

        let mut seen = HashSet::new();
        let mut family_v4 = None;
        for ip in &rotation.ip_pool {
            if ip.is_unspecified() || ip.is_multicast() {
                return Err(ConfigError::BadIPFormatting(format!(
                    "{} cannot be bound as a host identity",
                    ip
                )));
            }
            match family_v4 {
                None => family_v4 = Some(ip.is_ipv4()),
                Some(v4) if v4 != ip.is_ipv4() => {
                    return Err(ConfigError::BadIPFormatting(
                        "identity pool mixes IPv4 and IPv6 addresses".to_string(),
                    ));
                }
                _ => {}
            }
            seen.insert(*ip);
        }

        if let Some(initial) = rotation.initial_identity {
            if !seen.contains(&initial) {
                return Err(ConfigError::BadIPFormatting(format!(
                    "initial identity {} is not part of the pool",
                    initial
                )));
            }
        }

        let interface_pattern = Regex::new(r"^[A-Za-z0-9_.:-]{1,15}$")
            .map_err(|e| ConfigError::BadInterface(e.to_string()))?;
        if !interface_pattern.is_match(&rotation.interface) {
            return Err(ConfigError::BadInterface(format!(
                "'{}' is not a valid interface name",
                rotation.interface
            )));
        }

        let max_mask = if family_v4 == Some(false) { 128 } else { 32 };
        if rotation.subnet_mask > max_mask {
            return Err(ConfigError::NotInRange(format!(
                "subnet_mask {} exceeds {}",
                rotation.subnet_mask, max_mask
            )));
        }

        if rotation.base_interval_secs == 0 {
            return Err(ConfigError::NotInRange(
                "base_interval_secs must be greater than zero".to_string(),
            ));
        }

        if rotation.executor_timeout_secs == 0 {
            return Err(ConfigError::NotInRange(
                "executor_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.executor.mode == ExecutorMode::Script {
            if self.executor.assign_script.is_none() {
                return Err(ConfigError::MissingScript(
                    "script mode requires executor.assign_script".to_string(),
                ));
            }
            if self.executor.flush_script.is_none() {
                return Err(ConfigError::MissingScript(
                    "script mode requires executor.flush_script".to_string(),
                ));
            }
        }

        if self.decoys.is_empty() {
            return Err(ConfigError::DecoysEmpty);
        }

        for decoy in &self.decoys {
            if decoy.port_range.start > decoy.port_range.end {
                return Err(ConfigError::BadPortsRange(format!(
                    "{} decoy range [{}-{}] is inverted",
                    decoy.protocol, decoy.port_range.start, decoy.port_range.end
                )));
            }
        }

        Ok(())
    }

    /// Identity considered bound to the interface when the engine starts.
    pub fn initial_identity(&self) -> Option<std::net::IpAddr> {
        self.rotation
            .initial_identity
            .or_else(|| self.rotation.ip_pool.first().copied())
    }
}
