//! DNS record update after a successful rotation.
//!
//! [`CloudflareDnsUpdater`] looks the record up by name, then rewrites its content with the new
//! identity (`A` for IPv4, `AAAA` for IPv6). Missing settings are reported without touching the
//! network.

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

use crate::configuration::types::DnsConfig;
use crate::error_handling::types::CollaboratorError;

#[async_trait]
pub trait DnsUpdater: Send + Sync {
    async fn update(&self, new_identity: IpAddr) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
}

#[derive(Debug, Serialize)]
struct DnsRecordUpdate<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: String,
    ttl: u32,
    proxied: bool,
}

pub struct CloudflareDnsUpdater {
    client: reqwest::Client,
    api_base_url: String,
    zone_id: Option<String>,
    record_name: Option<String>,
    api_token: Option<String>,
    ttl: u32,
}

impl CloudflareDnsUpdater {
    pub fn from_config(config: &DnsConfig) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            zone_id: non_empty(&config.zone_id),
            record_name: non_empty(&config.record_name),
            api_token: non_empty(&config.api_token),
            ttl: config.ttl,
        })
    }

    async fn find_record_id(
        &self,
        zone_id: &str,
        record_name: &str,
        record_type: &str,
        token: &str,
    ) -> Result<String, CollaboratorError> {
        let url = format!("{}/zones/{}/dns_records", self.api_base_url, zone_id);
        let response: ApiResponse<Vec<DnsRecord>> = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("type", record_type), ("name", record_name)])
            .send()
            .await?
            .json()
            .await?;

        if !response.success {
            return Err(CollaboratorError::Api(format!(
                "failed to fetch DNS record id: {}",
                describe(&response.errors)
            )));
        }

        response
            .result
            .and_then(|records| records.into_iter().next())
            .map(|record| record.id)
            .ok_or_else(|| {
                CollaboratorError::Api(format!("DNS record {} not found", record_name))
            })
    }
}

#[async_trait]
impl DnsUpdater for CloudflareDnsUpdater {
    async fn update(&self, new_identity: IpAddr) -> Result<(), CollaboratorError> {
        let (zone_id, record_name, token) =
            match (&self.zone_id, &self.record_name, &self.api_token) {
                (Some(z), Some(r), Some(t)) => (z, r, t),
                _ => {
                    return Err(CollaboratorError::MissingSetting(
                        "dns.zone_id, dns.record_name and the API token are required".to_string(),
                    ))
                }
            };
        let record_type = if new_identity.is_ipv4() { "A" } else { "AAAA" };

        let record_id = self
            .find_record_id(zone_id, record_name, record_type, token)
            .await?;
        debug!("DNS record {} has id {}", record_name, record_id);

        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.api_base_url, zone_id, record_id
        );
        let payload = DnsRecordUpdate {
            record_type,
            name: record_name,
            content: new_identity.to_string(),
            ttl: self.ttl,
            proxied: false,
        };
        let response: ApiResponse<serde_json::Value> = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if !response.success {
            return Err(CollaboratorError::Api(format!(
                "DNS update failed: {}",
                describe(&response.errors)
            )));
        }

        info!("DNS record updated: {} -> {}", record_name, new_identity);
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

fn describe(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error detail".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join(", ")
}
