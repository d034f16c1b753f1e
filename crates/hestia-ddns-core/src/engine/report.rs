//! Per-run outcome aggregation

use chrono::{DateTime, Utc};
use std::fmt;
use std::net::IpAddr;

/// What happened to one domain during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainOutcome {
    /// Every address record already pointed at the desired IP
    Converged { records: usize },

    /// At least one record was rewritten and none failed
    Updated { updated: usize, converged: usize },

    /// No zone owns the domain
    SkippedNoZone,

    /// The zone has no address record for the domain
    SkippedNoRecord,

    /// Listing the domain's records failed
    LookupFailed { error: String },

    /// At least one update failed
    UpdateFailed {
        updated: usize,
        failed: usize,
        error: String,
    },
}

impl DomainOutcome {
    /// Whether the domain ended in an error state
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DomainOutcome::LookupFailed { .. } | DomainOutcome::UpdateFailed { .. }
        )
    }

    /// Whether the domain was skipped without provider mutations
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            DomainOutcome::SkippedNoZone | DomainOutcome::SkippedNoRecord
        )
    }
}

/// Outcome for one domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainReport {
    /// Domain name
    pub domain: String,
    /// Owning zone name, if resolved
    pub zone: Option<String>,
    /// Outcome
    pub outcome: DomainOutcome,
}

/// Aggregated result of one reconciliation run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Desired IP for the run
    pub ip: IpAddr,
    /// Per-domain outcomes, unresolved domains first, then zone by zone
    pub domains: Vec<DomainReport>,
    /// Result of the post-run panel sync, `None` if not attempted
    pub system_ip_synced: Option<bool>,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub(crate) fn new(ip: IpAddr, started_at: DateTime<Utc>) -> Self {
        Self {
            ip,
            domains: Vec::new(),
            system_ip_synced: None,
            started_at,
            finished_at: started_at,
        }
    }

    pub(crate) fn record(
        &mut self,
        domain: impl Into<String>,
        zone: Option<&str>,
        outcome: DomainOutcome,
    ) {
        self.domains.push(DomainReport {
            domain: domain.into(),
            zone: zone.map(str::to_string),
            outcome,
        });
    }

    /// Outcome recorded for `domain`
    pub fn outcome(&self, domain: &str) -> Option<&DomainOutcome> {
        self.domains
            .iter()
            .find(|report| report.domain == domain)
            .map(|report| &report.outcome)
    }

    /// Records rewritten across all domains
    pub fn updated(&self) -> usize {
        self.domains
            .iter()
            .map(|report| match report.outcome {
                DomainOutcome::Updated { updated, .. } => updated,
                DomainOutcome::UpdateFailed { updated, .. } => updated,
                _ => 0,
            })
            .sum()
    }

    /// Domains already pointing at the desired IP
    pub fn converged(&self) -> usize {
        self.count(|outcome| matches!(outcome, DomainOutcome::Converged { .. }))
    }

    /// Domains skipped for lack of a zone or record
    pub fn skipped(&self) -> usize {
        self.count(DomainOutcome::is_skip)
    }

    /// Domains that ended in an error
    pub fn failed(&self) -> usize {
        self.count(DomainOutcome::is_failure)
    }

    /// Whether any domain ended in an error
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, predicate: impl Fn(&DomainOutcome) -> bool) -> usize {
        self.domains
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        write!(
            f,
            "ip={} domains={} updated={} converged={} skipped={} failed={} elapsed={}ms",
            self.ip,
            self.domains.len(),
            self.updated(),
            self.converged(),
            self.skipped(),
            self.failed(),
            elapsed.num_milliseconds()
        )
    }
}
