//! Core traits for hestia-ddns
//!
//! This module defines the abstract interfaces to every external
//! collaborator of the reconciliation engine.
//!
//! - [`IpSource`]: Discover the current public IP
//! - [`Inventory`]: List panel users and their web domains
//! - [`DnsProvider`]: Read zones and records, rewrite address records
//! - [`SystemSync`]: Post-run hook on the hosting panel

pub mod dns_provider;
pub mod inventory;
pub mod ip_source;
pub mod system_sync;

pub use dns_provider::{DnsProvider, DnsRecord, RecordType, RecordUpdate, Zone};
pub use inventory::{Inventory, WebDomain, collect_domains};
pub use ip_source::IpSource;
pub use system_sync::SystemSync;
