// # System Sync Trait
//
// Post-run hook that lets the hosting panel pick up the new public IP.

use async_trait::async_trait;

/// Best-effort hook called once after a completed reconciliation run
///
/// The result is logged by the engine and never changes the run outcome.
#[async_trait]
pub trait SystemSync: Send + Sync {
    /// Synchronize the panel's notion of the system IP
    ///
    /// Returns `true` if the panel confirmed the sync.
    async fn sync_ip(&self) -> bool;
}
