//! Configuration types for hestia-ddns
//!
//! This module defines all configuration structures used throughout the
//! workspace. The daemon fills them from environment variables; library
//! users may build them directly or deserialize them.

use crate::policy::{PacingPolicy, RetryPolicy};
use serde::{Deserialize, Serialize};

/// Default Cloudflare API base URL
pub const DEFAULT_CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default public IP echo services, tried in order
pub const DEFAULT_IP_SERVICES: &[&str] = &["https://api.ipify.org", "https://ifconfig.me/ip"];

/// Default HestiaCP binary directory
pub const DEFAULT_HESTIA_BIN_DIR: &str = "/usr/local/hestia/bin";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Public IP discovery
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// DNS provider
    pub provider: ProviderConfig,

    /// Hosting panel
    #[serde(default)]
    pub hestia: HestiaConfig,

    /// Reconciliation settings
    #[serde(default)]
    pub sync: SyncConfig,
}

impl DdnsConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.ip_source.validate()?;
        self.provider.validate()?;
        self.hestia.validate()?;
        self.sync.validate()?;
        Ok(())
    }
}

/// Public IP discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// Echo service URLs, tried in order
    #[serde(default = "default_ip_services")]
    pub services: Vec<String>,

    /// Per-service request timeout (in seconds)
    #[serde(default = "default_ip_timeout_secs")]
    pub timeout_secs: u64,
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.services.is_empty() {
            return Err(crate::Error::config("No IP services configured"));
        }
        for url in &self.services {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "IP service URL must use HTTP or HTTPS scheme: {url}"
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("IP service timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            services: default_ip_services(),
            timeout_secs: default_ip_timeout_secs(),
        }
    }
}

fn default_ip_services() -> Vec<String> {
    DEFAULT_IP_SERVICES.iter().map(|s| s.to_string()).collect()
}

fn default_ip_timeout_secs() -> u64 {
    10
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare API v4
    Cloudflare {
        /// API token with Zone:Read and DNS:Edit permissions
        api_token: String,

        /// API base URL
        #[serde(default = "default_cloudflare_api_base")]
        api_base_url: String,

        /// Perform reads but skip updates
        #[serde(default)]
        dry_run: bool,

        /// Delay before every request
        #[serde(default)]
        pacing: PacingPolicy,

        /// Retry of transient failures
        #[serde(default)]
        retry: RetryPolicy,
    },
}

impl ProviderConfig {
    /// Cloudflare configuration with default endpoint and policies
    pub fn cloudflare(api_token: impl Into<String>) -> Self {
        ProviderConfig::Cloudflare {
            api_token: api_token.into(),
            api_base_url: default_cloudflare_api_base(),
            dry_run: false,
            pacing: PacingPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                api_base_url,
                pacing,
                retry,
                ..
            } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if !api_base_url.starts_with("https://") && !api_base_url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Cloudflare API base URL must use HTTP or HTTPS scheme: {api_base_url}"
                    )));
                }
                pacing.validate()?;
                retry.validate()?;
                Ok(())
            }
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::cloudflare(String::new())
    }
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                api_base_url,
                dry_run,
                pacing,
                retry,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("api_base_url", api_base_url)
                .field("dry_run", dry_run)
                .field("pacing", pacing)
                .field("retry", retry)
                .finish(),
        }
    }
}

fn default_cloudflare_api_base() -> String {
    DEFAULT_CLOUDFLARE_API_BASE.to_string()
}

/// HestiaCP command-line configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HestiaConfig {
    /// Path to `v-list-users`
    #[serde(default = "default_list_users_path")]
    pub list_users_path: String,

    /// Path to `v-list-web-domains`
    #[serde(default = "default_list_web_domains_path")]
    pub list_web_domains_path: String,

    /// Path to `v-update-sys-ip`
    #[serde(default = "default_update_sys_ip_path")]
    pub update_sys_ip_path: String,
}

impl HestiaConfig {
    /// Validate the panel configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.list_users_path.is_empty() {
            return Err(crate::Error::config("v-list-users path cannot be empty"));
        }
        if self.list_web_domains_path.is_empty() {
            return Err(crate::Error::config("v-list-web-domains path cannot be empty"));
        }
        Ok(())
    }
}

impl Default for HestiaConfig {
    fn default() -> Self {
        Self {
            list_users_path: default_list_users_path(),
            list_web_domains_path: default_list_web_domains_path(),
            update_sys_ip_path: default_update_sys_ip_path(),
        }
    }
}

fn default_list_users_path() -> String {
    format!("{DEFAULT_HESTIA_BIN_DIR}/v-list-users")
}

fn default_list_web_domains_path() -> String {
    format!("{DEFAULT_HESTIA_BIN_DIR}/v-list-web-domains")
}

fn default_update_sys_ip_path() -> String {
    format!("{DEFAULT_HESTIA_BIN_DIR}/v-update-sys-ip")
}

/// Reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Domains and aliases never touched, exact match
    #[serde(default)]
    pub excluded_domains: Vec<String>,

    /// TTL and proxy flag written with every update
    #[serde(default)]
    pub record_policy: RecordPolicy,

    /// Run the panel's system IP sync after reconciliation
    #[serde(default = "default_sync_system_ip")]
    pub sync_system_ip: bool,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SyncConfig {
    /// Validate the reconciliation settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        if self.excluded_domains.iter().any(|d| d.trim().is_empty()) {
            return Err(crate::Error::config("Excluded domain names cannot be empty"));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            excluded_domains: Vec::new(),
            record_policy: RecordPolicy::default(),
            sync_system_ip: default_sync_system_ip(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_sync_system_ip() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    1000
}

/// Values written alongside the new content of an updated record
///
/// `None` keeps whatever the record currently has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPolicy {
    /// TTL override; 1 means "automatic" on Cloudflare
    #[serde(default = "default_policy_ttl")]
    pub ttl: Option<u32>,

    /// Proxy flag override
    #[serde(default = "default_policy_proxied")]
    pub proxied: Option<bool>,
}

impl RecordPolicy {
    /// Keep the record's existing TTL and proxy flag
    pub fn preserve() -> Self {
        Self {
            ttl: None,
            proxied: None,
        }
    }
}

impl Default for RecordPolicy {
    fn default() -> Self {
        Self {
            ttl: default_policy_ttl(),
            proxied: default_policy_proxied(),
        }
    }
}

fn default_policy_ttl() -> Option<u32> {
    Some(1)
}

fn default_policy_proxied() -> Option<bool> {
    Some(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_requires_token() {
        let config = DdnsConfig::default();
        assert!(config.validate().is_err());

        let config = DdnsConfig {
            provider: ProviderConfig::cloudflare("token"),
            ..DdnsConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: DdnsConfig = serde_json::from_value(serde_json::json!({
            "provider": { "type": "cloudflare", "api_token": "token" },
            "sync": { "excluded_domains": ["internal.example.com"] }
        }))
        .unwrap();

        assert_eq!(config.ip_source.services, vec!["https://api.ipify.org", "https://ifconfig.me/ip"]);
        assert_eq!(config.hestia.list_users_path, "/usr/local/hestia/bin/v-list-users");
        assert_eq!(config.sync.record_policy, RecordPolicy { ttl: Some(1), proxied: Some(false) });
        assert!(config.sync.sync_system_ip);
        match &config.provider {
            ProviderConfig::Cloudflare { api_base_url, pacing, .. } => {
                assert_eq!(api_base_url, DEFAULT_CLOUDFLARE_API_BASE);
                assert_eq!(*pacing, PacingPolicy::default());
            }
        }
    }

    #[test]
    fn ip_services_must_be_http() {
        let config = IpSourceConfig {
            services: vec!["ftp://example.com".to_string()],
            timeout_secs: 10,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_hides_api_token() {
        let provider = ProviderConfig::cloudflare("secret_token_12345");
        let debug = format!("{provider:?}");
        assert!(!debug.contains("secret_token_12345"));
        assert!(debug.contains("<REDACTED>"));
    }
}
