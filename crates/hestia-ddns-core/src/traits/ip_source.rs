// # IP Source Trait
//
// Defines the interface for discovering the machine's current public IP.
//
// ## Implementations
//
// - HTTP echo services: `hestia-ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use hestia_ddns_core::IpSource;
//
// let ip = source.current().await?;
// println!("public address: {ip}");
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for IP source implementations
///
/// A source is consulted exactly once per reconciliation run. A failure is
/// the run's only fatal precondition: the engine aborts before touching the
/// inventory or the DNS provider.
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: A syntactically valid IP literal
    /// - `Err(Error)`: If no configured service produced one
    async fn current(&self) -> Result<IpAddr, crate::Error>;
}
