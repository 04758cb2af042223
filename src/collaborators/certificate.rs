use async_trait::async_trait;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::configuration::types::TlsConfig;
use crate::error_handling::types::CollaboratorError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificatePaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Regenerates the TLS identity after a successful rotation.
#[async_trait]
pub trait CertificateRotator: Send + Sync {
    async fn rotate(&self) -> Result<CertificatePaths, CollaboratorError>;
}

/// Produces a fresh self-signed RSA certificate with the `openssl` command line tool.
pub struct OpensslCertificateRotator {
    binary: String,
    certs_dir: PathBuf,
    label: String,
    common_name: String,
    validity_days: u32,
    key_bits: u32,
    timeout: Duration,
}

impl OpensslCertificateRotator {
    pub fn from_config(config: &TlsConfig) -> Self {
        Self {
            binary: config.openssl_binary.clone(),
            certs_dir: config.certs_dir.clone(),
            label: config.label.clone(),
            common_name: config.common_name.clone(),
            validity_days: config.validity_days,
            key_bits: config.key_bits,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn paths(&self) -> CertificatePaths {
        CertificatePaths {
            cert_path: self.certs_dir.join(format!("{}_cert.pem", self.label)),
            key_path: self.certs_dir.join(format!("{}_key.pem", self.label)),
        }
    }
}

#[async_trait]
impl CertificateRotator for OpensslCertificateRotator {
    async fn rotate(&self) -> Result<CertificatePaths, CollaboratorError> {
        tokio::fs::create_dir_all(&self.certs_dir).await.map_err(|e| {
            error!(
                "Failed to create certificate directory {}: {}",
                self.certs_dir.display(),
                e
            );
            CollaboratorError::IoError(e)
        })?;

        let paths = self.paths();
        let mut cmd = Command::new(&self.binary);
        cmd.arg("req")
            .arg("-x509")
            .arg("-newkey")
            .arg(format!("rsa:{}", self.key_bits))
            .arg("-nodes")
            .arg("-keyout")
            .arg(&paths.key_path)
            .arg("-out")
            .arg(&paths.cert_path)
            .arg("-days")
            .arg(self.validity_days.to_string())
            .arg("-subj")
            .arg(format!("/C=IN/O=MorphNetIPFlux/CN={}", self.common_name))
            .arg("-addext")
            .arg(format!("subjectAltName=DNS:{}", self.common_name))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Generating certificate for CN={}", self.common_name);
        let child = cmd
            .spawn()
            .map_err(|e| CollaboratorError::Process(format!("failed to run {}: {}", self.binary, e)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CollaboratorError::TimedOut(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CollaboratorError::Process(format!(
                "{} exited with {}: {}",
                self.binary, output.status, stderr
            )));
        }

        info!(
            "Generated new TLS cert {} (valid {} day(s))",
            paths.cert_path.display(),
            self.validity_days
        );
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn openssl_available() -> bool {
        std::process::Command::new("openssl")
            .arg("version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn config(dir: &TempDir) -> TlsConfig {
        TlsConfig {
            enabled: true,
            certs_dir: dir.path().join("certs"),
            key_bits: 2048,
            ..TlsConfig::default()
        }
    }

    #[tokio::test]
    async fn test_generates_cert_and_key() {
        if !openssl_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let rotator = OpensslCertificateRotator::from_config(&config(&dir));

        let paths = rotator.rotate().await.unwrap();

        let cert = std::fs::read_to_string(&paths.cert_path).unwrap();
        let key = std::fs::read_to_string(&paths.key_path).unwrap();
        assert!(cert.contains("BEGIN CERTIFICATE"));
        assert!(key.contains("PRIVATE KEY"));
        assert!(paths.cert_path.ends_with("rotated_tls_cert.pem"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_process_error() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir);
        cfg.openssl_binary = "/nonexistent/openssl".to_string();

        let result = OpensslCertificateRotator::from_config(&cfg).rotate().await;
        assert!(matches!(result, Err(CollaboratorError::Process(_))));
    }
}
