use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use uuid::Uuid;

use crate::configuration::types::Protocol;

/// One probe against a decoy listener.
///
/// Built by the connection handler the instant a connection is accepted and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub protocol: Protocol,
    pub source_ip: IpAddr,
    pub source_port: u16,
    pub decoy_port: u16,
}

impl ConnectionEvent {
    pub fn new(protocol: Protocol, peer: SocketAddr, decoy_port: u16) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            protocol,
            source_ip: peer.ip(),
            source_port: peer.port(),
            decoy_port,
        }
    }
}
