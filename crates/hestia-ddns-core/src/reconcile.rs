//! Record reconciliation for a single (zone, domain) pair
//!
//! ## Flow
//!
//! 1. List the zone's records filtered by the domain name
//! 2. Keep address records of the desired type whose name equals the domain
//! 3. Leave records already pointing at the desired IP alone
//! 4. Rewrite every other record in place, keyed by its own id
//!
//! A domain without any matching record is skipped; records are never
//! created. Failures are reported in the returned outcome and never
//! escape, so the caller can move on to the next domain.

use crate::config::RecordPolicy;
use crate::engine::events::{EngineEvent, EventSink};
use crate::engine::report::DomainOutcome;
use crate::traits::{DnsProvider, DnsRecord, RecordType, RecordUpdate};
use std::net::IpAddr;
use tracing::{debug, error, info, warn};

/// Reconciles the address records of one domain against the desired IP
pub struct RecordReconciler<'a> {
    provider: &'a dyn DnsProvider,
    policy: RecordPolicy,
    events: &'a EventSink,
}

impl<'a> RecordReconciler<'a> {
    /// Create a reconciler over `provider`
    pub fn new(provider: &'a dyn DnsProvider, policy: RecordPolicy, events: &'a EventSink) -> Self {
        Self {
            provider,
            policy,
            events,
        }
    }

    /// Build the in-place update that points `record` at `ip`
    ///
    /// The record id and the domain name are carried over unchanged; TTL
    /// and proxy flag come from the policy or, when unset, the record.
    pub fn plan_update(&self, record: &DnsRecord, domain: &str, ip: IpAddr) -> RecordUpdate {
        RecordUpdate {
            record_id: record.id.clone(),
            record_type: record.record_type,
            name: domain.to_string(),
            content: ip.to_string(),
            ttl: self.policy.ttl.unwrap_or(record.ttl),
            proxied: self.policy.proxied.unwrap_or(record.proxied),
        }
    }

    /// Converge `domain` in zone `zone_name` (`zone_id`) to `ip`
    pub async fn reconcile(
        &self,
        zone_id: &str,
        zone_name: &str,
        domain: &str,
        ip: IpAddr,
    ) -> DomainOutcome {
        let record_type = RecordType::for_ip(ip);

        let records = match self.provider.list_records(zone_id, Some(domain)).await {
            Ok(records) => records,
            Err(e) => {
                error!(zone = zone_name, domain, "Failed to list records: {}", e);
                self.events.emit(EngineEvent::UpdateFailed {
                    domain: domain.to_string(),
                    zone: zone_name.to_string(),
                    record_id: None,
                    error: e.to_string(),
                });
                return DomainOutcome::LookupFailed {
                    error: e.to_string(),
                };
            }
        };

        let candidates: Vec<DnsRecord> = records
            .into_iter()
            .filter(|record| {
                record.record_type == record_type && record.name.eq_ignore_ascii_case(domain)
            })
            .collect();

        if candidates.is_empty() {
            warn!(
                zone = zone_name,
                domain,
                "No {} record found, skipping (records are never created)",
                record_type
            );
            self.events.emit(EngineEvent::SkippedNoRecord {
                domain: domain.to_string(),
                zone: zone_name.to_string(),
            });
            return DomainOutcome::SkippedNoRecord;
        }

        let mut updated = 0;
        let mut converged = 0;
        let mut failed = 0;
        let mut last_error = None;

        for record in &candidates {
            if record.points_to(ip) {
                info!(
                    zone = zone_name,
                    domain,
                    record_id = %record.id,
                    "{} record already points at {}",
                    record_type,
                    ip
                );
                self.events.emit(EngineEvent::AlreadyConverged {
                    domain: domain.to_string(),
                    zone: zone_name.to_string(),
                    record_id: record.id.clone(),
                });
                converged += 1;
                continue;
            }

            let update = self.plan_update(record, domain, ip);
            info!(
                zone = zone_name,
                domain,
                record_id = %record.id,
                "Updating {} record {} -> {}",
                record_type,
                record.content,
                ip
            );

            match self.provider.update_record(zone_id, &update).await {
                Ok(result) => {
                    debug!(record_id = %result.id, content = %result.content, "Provider accepted update");
                    self.events.emit(EngineEvent::RecordUpdated {
                        domain: domain.to_string(),
                        zone: zone_name.to_string(),
                        record_id: record.id.clone(),
                        previous: record.content.clone(),
                        new_ip: ip,
                    });
                    updated += 1;
                }
                Err(e) => {
                    error!(
                        zone = zone_name,
                        domain,
                        record_id = %record.id,
                        "Failed to update record: {}",
                        e
                    );
                    self.events.emit(EngineEvent::UpdateFailed {
                        domain: domain.to_string(),
                        zone: zone_name.to_string(),
                        record_id: Some(record.id.clone()),
                        error: e.to_string(),
                    });
                    failed += 1;
                    last_error = Some(e.to_string());
                }
            }
        }

        match last_error {
            Some(error) => DomainOutcome::UpdateFailed {
                updated,
                failed,
                error,
            },
            None if updated > 0 => DomainOutcome::Updated { updated, converged },
            None => DomainOutcome::Converged { records: converged },
        }
    }
}
