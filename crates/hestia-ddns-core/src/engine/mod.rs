//! Reconciliation engine
//!
//! The ReconcileEngine drives one stateless pass over the inventory:
//! - Discovering the public IP via IpSource
//! - Loading and filtering the panel inventory
//! - Resolving every domain to its zone (zones listed once per run)
//! - Reconciling address records zone by zone
//! - Triggering the optional panel IP sync
//!
//! ## Run States
//!
//! ```text
//! Start ──► IpDiscovered ──► InventoryLoaded ──► Filtered ──► ZonesGrouped ──► Reconciling ──► Done
//!   │             │                   │
//!   └─────────────┴───────────────────┴──► Aborted (fatal precondition)
//! ```
//!
//! Only IP discovery, inventory loading and the zone listing are fatal.
//! Everything after grouping is handled per domain and never aborts the run.

pub mod events;
pub mod report;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::filter::filter_excluded_names;
use crate::reconcile::RecordReconciler;
use crate::traits::{DnsProvider, Inventory, IpSource, SystemSync, collect_domains};
use crate::zone::group_by_zone;
use events::{EngineEvent, EventSink};
use report::{DomainOutcome, RunReport};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Phase of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    IpDiscovered,
    InventoryLoaded,
    Filtered,
    ZonesGrouped,
    Reconciling,
    Done,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Core reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`ReconcileEngine::new()`]
/// 2. Optionally attach a panel hook with [`ReconcileEngine::with_system_sync()`]
/// 3. Call [`ReconcileEngine::run()`] once per desired pass
///
/// The engine keeps no state between runs; every run re-reads the IP,
/// the inventory and the zone list.
pub struct ReconcileEngine {
    /// Public IP discovery
    ip_source: Box<dyn IpSource>,

    /// Panel inventory
    inventory: Box<dyn Inventory>,

    /// DNS provider
    provider: Box<dyn DnsProvider>,

    /// Post-run panel hook
    system_sync: Option<Box<dyn SystemSync>>,

    /// Reconciliation settings
    config: SyncConfig,

    /// Event sink for external monitoring
    events: EventSink,
}

impl ReconcileEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        inventory: Box<dyn Inventory>,
        provider: Box<dyn DnsProvider>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (events, rx) = EventSink::channel(config.event_channel_capacity);

        let engine = Self {
            ip_source,
            inventory,
            provider,
            system_sync: None,
            config,
            events,
        };

        Ok((engine, rx))
    }

    /// Attach the hook run after a completed pass
    pub fn with_system_sync(mut self, hook: Box<dyn SystemSync>) -> Self {
        self.system_sync = Some(hook);
        self
    }

    /// Run one reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(RunReport)`: The pass completed; individual domains may still have failed
    /// - `Err(Error)`: A fatal precondition failed and nothing was mutated
    pub async fn run(&self) -> Result<RunReport> {
        let started_at = chrono::Utc::now();
        let mut state = RunState::Start;
        self.events.emit(EngineEvent::Started);
        info!("Starting DNS reconciliation via {}", self.provider.provider_name());

        let ip = match self.ip_source.current().await {
            Ok(ip) => ip,
            Err(e) => return Err(self.abort(state, e)),
        };
        info!("Public IP detected: {}", ip);
        self.events.emit(EngineEvent::IpDiscovered { ip });
        state = self.advance(state, RunState::IpDiscovered);

        let domains = match collect_domains(self.inventory.as_ref()).await {
            Ok(domains) => domains,
            Err(e) => return Err(self.abort(state, e)),
        };
        info!(domains = ?domains, "Panel domains and aliases loaded");
        state = self.advance(state, RunState::InventoryLoaded);

        let filtered = filter_excluded_names(&domains, &self.config.excluded_domains);
        info!(domains = ?filtered, "Domains after exclusion");
        self.events.emit(EngineEvent::InventoryLoaded {
            total: domains.len(),
            after_exclusion: filtered.len(),
        });
        state = self.advance(state, RunState::Filtered);

        let zones = match self.provider.list_zones().await {
            Ok(zones) => zones,
            Err(e) => return Err(self.abort(state, e)),
        };
        debug!("{} zone(s) visible to the provider account", zones.len());

        let assignment = group_by_zone(&filtered, &zones);
        info!(zones = ?assignment.zone_names(), "Zones to reconcile");
        state = self.advance(state, RunState::ZonesGrouped);

        let mut report = RunReport::new(ip, started_at);
        for domain in assignment.unresolved() {
            self.events.emit(EngineEvent::SkippedNoZone {
                domain: domain.clone(),
            });
            report.record(domain.as_str(), None, DomainOutcome::SkippedNoZone);
        }

        state = self.advance(state, RunState::Reconciling);
        let reconciler =
            RecordReconciler::new(self.provider.as_ref(), self.config.record_policy, &self.events);

        for group in assignment.groups() {
            info!(zone = %group.zone_name, zone_id = %group.zone_id, "Processing zone");

            for domain in &group.domains {
                self.events.emit(EngineEvent::ZoneResolved {
                    domain: domain.clone(),
                    zone: group.zone_name.clone(),
                });

                let outcome = reconciler
                    .reconcile(&group.zone_id, &group.zone_name, domain, ip)
                    .await;
                report.record(domain.as_str(), Some(group.zone_name.as_str()), outcome);
            }
        }

        report.finished_at = chrono::Utc::now();
        self.advance(state, RunState::Done);

        if report.has_failures() {
            warn!("DNS reconciliation completed with failures: {}", report);
        } else {
            info!("DNS reconciliation completed: {}", report);
        }
        self.events.emit(EngineEvent::Finished {
            updated: report.updated(),
            converged: report.converged(),
            skipped: report.skipped(),
            failed: report.failed(),
        });

        report.system_ip_synced = self.sync_system_ip().await;

        Ok(report)
    }

    /// Run the panel hook, if configured and enabled
    async fn sync_system_ip(&self) -> Option<bool> {
        if !self.config.sync_system_ip {
            debug!("System IP sync disabled");
            return None;
        }
        let hook = self.system_sync.as_ref()?;

        let synced = hook.sync_ip().await;
        if synced {
            info!("Panel system IP synchronized");
        } else {
            warn!("Panel system IP sync did not complete");
        }
        Some(synced)
    }

    /// Log a state transition and return the new state
    fn advance(&self, from: RunState, to: RunState) -> RunState {
        debug!("Run state {} -> {}", from, to);
        to
    }

    /// Record a fatal precondition failure
    fn abort(&self, state: RunState, error: Error) -> Error {
        error!("Aborting run in state {}: {}", state, error);
        self.advance(state, RunState::Aborted);
        self.events.emit(EngineEvent::Aborted {
            reason: error.to_string(),
        });
        error
    }
}
