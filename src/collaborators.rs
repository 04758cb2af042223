//! External collaborators driven by the orchestrator after a rotation.
//!
//! Each one sits behind a trait so the orchestrator only sees the capability:
//! - `dns`: [`DnsUpdater`], with the Cloudflare API adapter.
//! - `certificate`: [`CertificateRotator`], with the `openssl` adapter.
//! - `status`: [`StatusSink`], with the JSON status file adapter.

pub mod certificate;
pub mod dns;
pub mod status;

pub use certificate::{CertificatePaths, CertificateRotator, OpensslCertificateRotator};
pub use dns::{CloudflareDnsUpdater, DnsUpdater};
pub use status::{read_status, FileStatusSink, StatusSink};
