//! Test doubles and common utilities for reconciliation contract tests
//!
//! Every double counts its calls through shared `Arc` counters so a test
//! can keep a handle after moving the double into the engine.

#![allow(dead_code)]

use hestia_ddns_core::config::SyncConfig;
use hestia_ddns_core::error::{Error, Result};
use hestia_ddns_core::traits::{
    DnsProvider, DnsRecord, Inventory, IpSource, RecordType, RecordUpdate, SystemSync, WebDomain,
    Zone,
};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// An IP source returning a fixed answer
pub struct FixedIpSource {
    ip: Option<IpAddr>,
    calls: Arc<AtomicUsize>,
}

impl FixedIpSource {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip: Some(ip),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source for which every service fails
    pub fn unavailable() -> Self {
        Self {
            ip: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            ip: other.ip,
            calls: Arc::clone(&other.calls),
        }
    }
}

#[async_trait::async_trait]
impl IpSource for FixedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ip
            .ok_or_else(|| Error::ip_source("No IP service returned a valid address"))
    }
}

/// An inventory backed by a static user → domains table
pub struct StaticInventory {
    users: Vec<(String, Vec<WebDomain>)>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl StaticInventory {
    pub fn new() -> Self {
        Self {
            users: Vec::new(),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An inventory whose listing always fails
    pub fn broken() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_user(mut self, user: &str, domains: Vec<WebDomain>) -> Self {
        self.users.push((user.to_string(), domains));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            users: other.users.clone(),
            fail: other.fail,
            calls: Arc::clone(&other.calls),
        }
    }
}

#[async_trait::async_trait]
impl Inventory for StaticInventory {
    async fn list_users(&self) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::inventory("v-list-users exited with status 1"));
        }
        Ok(self.users.iter().map(|(user, _)| user.clone()).collect())
    }

    async fn list_domains(&self, user: &str) -> Result<Vec<WebDomain>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .iter()
            .find(|(name, _)| name == user)
            .map(|(_, domains)| domains.clone())
            .unwrap_or_default())
    }
}

/// Shared state of an in-memory DNS provider
#[derive(Default)]
struct ProviderState {
    zones: Vec<Zone>,
    records: HashMap<String, Vec<DnsRecord>>,
    failing_records: Vec<String>,
    updates: Vec<(String, RecordUpdate)>,
    list_zones_calls: usize,
    list_records_calls: usize,
    fail_list_zones: bool,
}

/// An in-memory DNS provider that applies updates and tracks calls
///
/// `list_records` mimics a provider whose name filter also returns
/// partial matches, so callers must re-check names.
#[derive(Clone, Default)]
pub struct InMemoryDnsProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl InMemoryDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(self, id: &str, name: &str) -> Self {
        self.state.lock().unwrap().zones.push(Zone::new(id, name));
        self
    }

    pub fn with_record(self, zone_id: &str, id: &str, record_type: RecordType, name: &str, content: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .records
            .entry(zone_id.to_string())
            .or_default()
            .push(DnsRecord {
                id: id.to_string(),
                record_type,
                name: name.to_string(),
                content: content.to_string(),
                ttl: 300,
                proxied: false,
            });
        self
    }

    pub fn with_a_record(self, zone_id: &str, id: &str, name: &str, content: &str) -> Self {
        self.with_record(zone_id, id, RecordType::A, name, content)
    }

    /// Make updates of `record_id` fail with HTTP 500
    pub fn failing_updates_for(self, record_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_records
            .push(record_id.to_string());
        self
    }

    /// Make zone listing fail
    pub fn failing_zone_listing(self) -> Self {
        self.state.lock().unwrap().fail_list_zones = true;
        self
    }

    /// Every update attempt as (zone_id, update), including failed ones
    pub fn updates(&self) -> Vec<(String, RecordUpdate)> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn update_call_count(&self) -> usize {
        self.state.lock().unwrap().updates.len()
    }

    pub fn list_zones_call_count(&self) -> usize {
        self.state.lock().unwrap().list_zones_calls
    }

    pub fn list_records_call_count(&self) -> usize {
        self.state.lock().unwrap().list_records_calls
    }

    /// Total provider calls of any kind
    pub fn total_call_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.list_zones_calls + state.list_records_calls + state.updates.len()
    }

    /// Current content of a record
    pub fn content_of(&self, record_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .records
            .values()
            .flatten()
            .find(|record| record.id == record_id)
            .map(|record| record.content.clone())
    }
}

#[async_trait::async_trait]
impl DnsProvider for InMemoryDnsProvider {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        let mut state = self.state.lock().unwrap();
        state.list_zones_calls += 1;
        if state.fail_list_zones {
            return Err(Error::http_status("memory", 403, "zone listing forbidden"));
        }
        Ok(state.zones.clone())
    }

    async fn list_records(&self, zone_id: &str, name: Option<&str>) -> Result<Vec<DnsRecord>> {
        let mut state = self.state.lock().unwrap();
        state.list_records_calls += 1;
        let records = state.records.get(zone_id).cloned().unwrap_or_default();
        Ok(match name {
            Some(name) => records
                .into_iter()
                .filter(|record| record.name.ends_with(name))
                .collect(),
            None => records,
        })
    }

    async fn update_record(&self, zone_id: &str, update: &RecordUpdate) -> Result<DnsRecord> {
        let mut state = self.state.lock().unwrap();
        state.updates.push((zone_id.to_string(), update.clone()));

        if state.failing_records.contains(&update.record_id) {
            return Err(Error::http_status("memory", 500, "internal error"));
        }

        let record = state
            .records
            .get_mut(zone_id)
            .and_then(|records| records.iter_mut().find(|r| r.id == update.record_id))
            .ok_or_else(|| Error::not_found(format!("record {}", update.record_id)))?;

        record.content = update.content.clone();
        record.ttl = update.ttl;
        record.proxied = update.proxied;
        Ok(record.clone())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// A panel hook that records invocations
#[derive(Clone)]
pub struct RecordingSystemSync {
    result: bool,
    calls: Arc<AtomicUsize>,
}

impl RecordingSystemSync {
    pub fn new(result: bool) -> Self {
        Self {
            result,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SystemSync for RecordingSystemSync {
    async fn sync_ip(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
    }
}

/// Parse an IP literal
pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid IP literal")
}

/// Sync settings with the given exclusions and defaults otherwise
pub fn sync_config(excluded: &[&str]) -> SyncConfig {
    SyncConfig {
        excluded_domains: excluded.iter().map(|s| s.to_string()).collect(),
        ..SyncConfig::default()
    }
}
