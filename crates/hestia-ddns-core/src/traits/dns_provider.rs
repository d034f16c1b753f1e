// # DNS Provider Trait
//
// Defines the interface the reconciliation core uses to read zones and
// records from a DNS provider and to rewrite address records in place.
//
// ## Implementations
//
// - Cloudflare: `hestia-ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use hestia_ddns_core::DnsProvider;
//
// let zones = provider.list_zones().await?;
// let records = provider.list_records(&zones[0].id, Some("www.example.com")).await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// A DNS-managed namespace owned by the provider account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider-specific zone identifier
    pub id: String,
    /// Zone apex name (e.g. "example.com")
    pub name: String,
}

impl Zone {
    /// Create a new zone
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// DNS record type
///
/// Only address types are ever reconciled. Anything the provider returns
/// that is not listed here deserializes as [`RecordType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
    /// Canonical name record
    Cname,
    /// Any other record type
    #[serde(other)]
    Other,
}

impl RecordType {
    /// Address record type that can hold `ip`
    pub fn for_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        }
    }

    /// Wire name of the type (e.g. "A")
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Other => "OTHER",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DNS record as read from the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-specific record identifier
    pub id: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Fully-qualified record name
    pub name: String,
    /// Record content (an IP literal for address records)
    pub content: String,
    /// Time-to-live; 1 means "automatic" on Cloudflare
    pub ttl: u32,
    /// Whether traffic is proxied through the provider
    #[serde(default)]
    pub proxied: bool,
}

impl DnsRecord {
    /// Whether the record already points at `ip`
    ///
    /// Content is compared as a parsed address so that equivalent IPv6
    /// spellings match; unparseable content never matches.
    pub fn points_to(&self, ip: IpAddr) -> bool {
        self.content
            .trim()
            .parse::<IpAddr>()
            .is_ok_and(|current| current == ip)
    }
}

/// A single in-place record rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordUpdate {
    /// The record being rewritten; never changes during an update
    #[serde(skip)]
    pub record_id: String,
    /// Record type written back to the provider
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Record name; always the reconciled domain itself
    pub name: String,
    /// New content
    pub content: String,
    /// TTL to write
    pub ttl: u32,
    /// Proxy flag to write
    pub proxied: bool,
}

/// Trait for DNS provider implementations
///
/// Every method performs provider I/O. Pacing between requests and any
/// retry of transient failures are owned by the implementation; the
/// reconciliation core never retries a failed call itself.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every zone visible to the configured account
    async fn list_zones(&self) -> Result<Vec<Zone>, crate::Error>;

    /// List records in a zone, optionally filtered by exact name
    ///
    /// Providers may return records whose name only partially matches the
    /// filter; callers must check the name again.
    async fn list_records(
        &self,
        zone_id: &str,
        name: Option<&str>,
    ) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Rewrite an existing record identified by `update.record_id`
    async fn update_record(
        &self,
        zone_id: &str,
        update: &RecordUpdate,
    ) -> Result<DnsRecord, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_record_types_deserialize_as_other() {
        let record: DnsRecord = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "type": "TXT",
            "name": "example.com",
            "content": "v=spf1 -all",
            "ttl": 300,
        }))
        .unwrap();

        assert_eq!(record.record_type, RecordType::Other);
        assert!(!record.proxied);
    }

    #[test]
    fn address_type_follows_ip_family() {
        assert_eq!(RecordType::for_ip("192.0.2.1".parse().unwrap()), RecordType::A);
        assert_eq!(RecordType::for_ip("2001:db8::1".parse().unwrap()), RecordType::Aaaa);
    }

    #[test]
    fn points_to_compares_parsed_addresses() {
        let record = DnsRecord {
            id: "r1".to_string(),
            record_type: RecordType::Aaaa,
            name: "example.com".to_string(),
            content: "2001:0db8:0000::0001".to_string(),
            ttl: 1,
            proxied: false,
        };

        assert!(record.points_to("2001:db8::1".parse().unwrap()));
        assert!(!record.points_to("2001:db8::2".parse().unwrap()));
    }

    #[test]
    fn update_payload_omits_record_id() {
        let update = RecordUpdate {
            record_id: "r1".to_string(),
            record_type: RecordType::A,
            name: "example.com".to_string(),
            content: "5.6.7.8".to_string(),
            ttl: 1,
            proxied: false,
        };

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "A");
        assert_eq!(json["content"], "5.6.7.8");
        assert!(json.get("record_id").is_none());
    }
}
