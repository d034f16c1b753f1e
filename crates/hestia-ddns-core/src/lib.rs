// # hestia-ddns-core
//
// Core library keeping DNS address records of HestiaCP-hosted domains in
// sync with the machine's public IP.
//
// ## Architecture Overview
//
// - **IpSource**: Trait for discovering the current public IP
// - **Inventory**: Trait for listing panel users and their web domains
// - **DnsProvider**: Trait for reading zones/records and rewriting records
// - **SystemSync**: Post-run hook on the hosting panel
// - **zone**: Longest-suffix zone matching and zone grouping
// - **filter**: Exact-match exclusion of domains
// - **RecordReconciler**: Per-domain diff-and-update
// - **ReconcileEngine**: One stateless pass over all of the above
//
// ## Design Principles
//
// 1. **Stateless runs**: Every run re-reads IP, inventory and zones
// 2. **Idempotency**: Records already pointing at the IP are never touched
// 3. **Failure isolation**: Only fatal preconditions abort a run
// 4. **Library-First**: The daemon is a thin wiring layer

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod policy;
pub mod reconcile;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use config::{DdnsConfig, HestiaConfig, IpSourceConfig, ProviderConfig, RecordPolicy, SyncConfig};
pub use engine::events::{EngineEvent, EventSink};
pub use engine::report::{DomainOutcome, DomainReport, RunReport};
pub use engine::{ReconcileEngine, RunState};
pub use error::{Error, Result};
pub use filter::{filter_excluded, filter_excluded_names};
pub use policy::{PacingPolicy, RetryPolicy};
pub use reconcile::RecordReconciler;
pub use traits::{DnsProvider, DnsRecord, Inventory, IpSource, RecordType, RecordUpdate, SystemSync, WebDomain, Zone};
pub use zone::{ZoneAssignment, ZoneGroup, group_by_zone, resolve_zone};
