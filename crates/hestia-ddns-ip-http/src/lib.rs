// # HTTP IP Source
//
// This crate discovers the public IP by asking external echo services.
//
// ## Behavior
//
// Services are tried in the configured order and the first valid address
// wins. A service answering with a JSON content type is read as `{"ip": ...}`;
// anything else is read as plain text. Failures are logged at debug level and
// the next service is tried; only when every service fails is an error
// returned.

use async_trait::async_trait;
use hestia_ddns_core::config::IpSourceConfig;
use hestia_ddns_core::traits::IpSource;
use hestia_ddns_core::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info};

/// JSON body returned by services such as `https://api.ipify.org?format=json`
#[derive(Debug, Deserialize)]
struct IpResponse {
    #[serde(default)]
    ip: String,
}

/// HTTP-based public IP source
#[derive(Debug)]
pub struct HttpIpSource {
    /// Echo service URLs, tried in order
    services: Vec<String>,

    /// HTTP client with the per-service timeout applied
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `services`: URLs to query in order (e.g., "https://api.ipify.org")
    /// - `timeout`: Per-request timeout
    pub fn new(services: Vec<String>, timeout: Duration) -> Result<Self> {
        if services.is_empty() {
            return Err(Error::config("No IP services configured"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { services, client })
    }

    /// Build a source from its configuration
    pub fn from_config(config: &IpSourceConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            config.services.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Configured services, in query order
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Query a single service
    async fn fetch_ip(&self, url: &str) -> Result<IpAddr> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ip_source(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::ip_source(format!("HTTP error: {}", response.status())));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.to_ascii_lowercase().contains("json"));

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_source(format!("Failed to read response: {e}")))?;

        let ip_text = if is_json {
            serde_json::from_str::<IpResponse>(&body)?.ip
        } else {
            body
        };

        parse_ip(&ip_text)
    }
}

/// Parse a service answer into an address
fn parse_ip(text: &str) -> Result<IpAddr> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::ip_source("Empty response"));
    }
    text.parse()
        .map_err(|_| Error::ip_source(format!("Invalid IP address: {text}")))
}

#[async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<IpAddr> {
        for url in &self.services {
            debug!("Trying IP service: {}", url);
            match self.fetch_ip(url).await {
                Ok(ip) => {
                    info!("Public IP {} obtained from {}", ip, url);
                    return Ok(ip);
                }
                Err(e) => debug!("IP service {} failed: {}", url, e),
            }
        }

        Err(Error::ip_source(format!(
            "None of {} IP service(s) returned a valid address",
            self.services.len()
        )))
    }
}
