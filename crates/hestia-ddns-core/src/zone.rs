//! Zone resolution and grouping
//!
//! Maps arbitrary domain names onto the most specific zone that owns them
//! and builds the per-run zone → domains index.
//!
//! ## Matching
//!
//! A domain is treated as a dot-separated label sequence. Every dot-suffix
//! that keeps at least two labels is a candidate, tried from most labels
//! to fewest:
//!
//! ```text
//! a.b.example.com  →  a.b.example.com, b.example.com, example.com
//! ```
//!
//! The first candidate equal to a zone name wins. Specificity comes from
//! the candidate order alone, so the order of the zone list never matters.

use crate::traits::Zone;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Candidate zone names for `domain`, most specific first
///
/// The bare top-level label is never a candidate, so a single-label
/// domain yields nothing. A trailing root dot is ignored.
pub fn zone_candidates(domain: &str) -> impl Iterator<Item = &str> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    let dots: Vec<usize> = domain.match_indices('.').map(|(i, _)| i).collect();
    let count = dots.len();

    std::iter::once(0)
        .chain(dots.into_iter().map(|i| i + 1))
        .take(count)
        .map(move |start| &domain[start..])
}

/// Find the most specific zone owning `domain`
///
/// Names are compared ASCII case-insensitively. Returns `None` when no
/// candidate suffix names a zone; the caller skips such domains.
pub fn resolve_zone<'z>(domain: &str, zones: &'z [Zone]) -> Option<&'z Zone> {
    zone_candidates(domain).find_map(|candidate| {
        zones
            .iter()
            .find(|zone| zone.name.eq_ignore_ascii_case(candidate))
    })
}

/// Domains assigned to one zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneGroup {
    /// Zone name
    pub zone_name: String,
    /// Zone identifier used for provider calls
    pub zone_id: String,
    /// Domains in inventory order
    pub domains: Vec<String>,
}

/// Zone name → domains index for one run
///
/// Groups iterate in the order their zone was first resolved, so identical
/// inputs always produce identical iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneAssignment {
    groups: Vec<ZoneGroup>,
    /// Domains that resolved to no zone, in inventory order
    unresolved: Vec<String>,
}

impl ZoneAssignment {
    /// Groups in first-seen order
    pub fn groups(&self) -> &[ZoneGroup] {
        &self.groups
    }

    /// Look up the group for a zone name
    pub fn get(&self, zone_name: &str) -> Option<&ZoneGroup> {
        self.groups.iter().find(|group| group.zone_name == zone_name)
    }

    /// Domains dropped because no zone owns them
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    /// Zone names in first-seen order
    pub fn zone_names(&self) -> Vec<&str> {
        self.groups.iter().map(|group| group.zone_name.as_str()).collect()
    }

    /// Number of zones with at least one domain
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no domain resolved to any zone
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Group `domains` by the zone each one resolves to
///
/// Domains with no owning zone are logged and kept in
/// [`ZoneAssignment::unresolved`]; they are not an error.
pub fn group_by_zone<S: AsRef<str>>(domains: &[S], zones: &[Zone]) -> ZoneAssignment {
    let mut assignment = ZoneAssignment::default();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for domain in domains {
        let domain = domain.as_ref();
        let Some(zone) = resolve_zone(domain, zones) else {
            warn!(domain, "No zone found for domain, skipping");
            assignment.unresolved.push(domain.to_string());
            continue;
        };

        debug!(domain, zone = %zone.name, "Resolved zone");

        let slot = *index.entry(zone.name.as_str()).or_insert_with(|| {
            assignment.groups.push(ZoneGroup {
                zone_name: zone.name.clone(),
                zone_id: zone.id.clone(),
                domains: Vec::new(),
            });
            assignment.groups.len() - 1
        });
        assignment.groups[slot].domains.push(domain.to_string());
    }

    assignment
}
