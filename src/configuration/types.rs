use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Protocol emulated by a decoy listener.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Http,
    Ssh,
}

impl Protocol {
    /// Banner sent to every peer when the decoy configuration does not provide one.
    pub fn default_banner(&self) -> &'static [u8] {
        match self {
            Protocol::Http => {
                b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nWelcome to MorphNetIPFlux."
            }
            Protocol::Ssh => b"SSH-2.0-OpenSSH_7.9p1 Debian-10\r\n",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "HTTP"),
            Protocol::Ssh => write!(f, "SSH"),
        }
    }
}

/// Which Interface Executor implementation the engine runs with.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorMode {
    Script,
    #[default]
    Simulation,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    pub ip_pool: Vec<IpAddr>,
    pub interface: String,
    pub subnet_mask: u8,
    pub base_interval_secs: u64,
    #[serde(default)]
    pub jitter_secs: u64,
    #[serde(default = "default_minimum_wait_secs")]
    pub minimum_wait_secs: u64,
    #[serde(default = "default_executor_timeout_secs")]
    pub executor_timeout_secs: u64,
    /// Identity bound to the interface at startup. Defaults to the first pool entry.
    #[serde(default)]
    pub initial_identity: Option<IpAddr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub mode: ExecutorMode,
    #[serde(default = "default_shell")]
    pub shell: String,
    #[serde(default)]
    pub assign_script: Option<PathBuf>,
    #[serde(default)]
    pub flush_script: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutorMode::default(),
            shell: default_shell(),
            assign_script: None,
            flush_script: None,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct DecoyConfig {
    pub protocol: Protocol,
    pub port_range: PortRange,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    /// How long a handler waits for peer input to discard before closing.
    #[serde(default = "default_discard_timeout_ms")]
    pub discard_timeout_ms: u64,
}

impl DecoyConfig {
    pub fn banner_bytes(&self) -> Vec<u8> {
        match &self.banner {
            Some(b) => b.as_bytes().to_vec(),
            None => self.protocol.default_banner().to_vec(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub record_name: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_dns_ttl")]
    pub ttl: u32,
    #[serde(default = "default_dns_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            zone_id: None,
            record_name: None,
            api_token: None,
            ttl: default_dns_ttl(),
            api_base_url: default_dns_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_common_name")]
    pub common_name: String,
    #[serde(default = "default_certs_dir")]
    pub certs_dir: PathBuf,
    #[serde(default = "default_cert_label")]
    pub label: String,
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
    #[serde(default = "default_key_bits")]
    pub key_bits: u32,
    #[serde(default = "default_openssl_binary")]
    pub openssl_binary: String,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            common_name: default_common_name(),
            certs_dir: default_certs_dir(),
            label: default_cert_label(),
            validity_days: default_validity_days(),
            key_bits: default_key_bits(),
            openssl_binary: default_openssl_binary(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_status_path")]
    pub path: PathBuf,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            path: default_status_path(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct EventLogConfig {
    #[serde(default = "default_event_log_path")]
    pub path: PathBuf,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            path: default_event_log_path(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_minimum_wait_secs() -> u64 {
    10
}

fn default_executor_timeout_secs() -> u64 {
    10
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_discard_timeout_ms() -> u64 {
    2000
}

fn default_dns_ttl() -> u32 {
    60
}

fn default_dns_api_base_url() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_common_name() -> String {
    "MorphNetIPFlux.local".to_string()
}

fn default_certs_dir() -> PathBuf {
    PathBuf::from("certs")
}

fn default_cert_label() -> String {
    "rotated_tls".to_string()
}

fn default_validity_days() -> u32 {
    2
}

fn default_key_bits() -> u32 {
    2048
}

fn default_openssl_binary() -> String {
    "openssl".to_string()
}

fn default_status_path() -> PathBuf {
    PathBuf::from("logs/status.json")
}

fn default_event_log_path() -> PathBuf {
    PathBuf::from("logs/honeypot_hits.json")
}
