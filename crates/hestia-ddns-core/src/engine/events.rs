//! Engine events and the sink they are emitted through

use std::net::IpAddr;
use tokio::sync::mpsc;
use tracing::warn;

/// Events emitted while a reconciliation run progresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Run started
    Started,

    /// Public IP discovered
    IpDiscovered { ip: IpAddr },

    /// Inventory loaded and filtered
    InventoryLoaded { total: usize, after_exclusion: usize },

    /// Domain resolved to its owning zone
    ZoneResolved { domain: String, zone: String },

    /// No zone owns the domain
    SkippedNoZone { domain: String },

    /// Zone has no address record for the domain
    SkippedNoRecord { domain: String, zone: String },

    /// Record already points at the desired IP
    AlreadyConverged {
        domain: String,
        zone: String,
        record_id: String,
    },

    /// Record rewritten to the desired IP
    RecordUpdated {
        domain: String,
        zone: String,
        record_id: String,
        previous: String,
        new_ip: IpAddr,
    },

    /// Listing or updating failed for the domain
    UpdateFailed {
        domain: String,
        zone: String,
        record_id: Option<String>,
        error: String,
    },

    /// Run aborted on a fatal precondition
    Aborted { reason: String },

    /// Run completed
    Finished {
        updated: usize,
        converged: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Non-blocking sender handed to every component that reports progress
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl EventSink {
    /// Create a sink and the receiver observing it
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Emit an event
    ///
    /// A full channel drops the event; a closed channel is ignored.
    pub fn emit(&self, event: EngineEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
