//! Startup configuration.
//!
//! - `config`: the top-level [`Config`] read from TOML, with validation.
//! - `types`: section structures and the [`Protocol`] / [`ExecutorMode`] enums.

pub mod config;
pub mod types;

pub use config::Config;
pub use types::{
    DecoyConfig, DnsConfig, EventLogConfig, ExecutorConfig, ExecutorMode, PortRange, Protocol,
    RotationConfig, StatusConfig, TlsConfig,
};
