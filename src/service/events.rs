//! Observable outcomes of cache maintenance.
//!
//! Background refreshes have no caller to report to, so their results are
//! broadcast here and counted. Degraded responses (stale or fallback data)
//! are reported the same way.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    RefreshSucceeded { key: String },
    RefreshFailed { key: String, error: String },
    /// Cached data past its TTL was returned because the upstream failed.
    StaleServed { key: String },
    /// Static or empty data was returned because nothing better was available.
    FallbackServed { key: String, reason: String },
}

/// Counters since the service was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub refresh_succeeded: u64,
    pub refresh_failed: u64,
    pub stale_served: u64,
    pub fallback_served: u64,
}

pub(crate) struct EventHub {
    sender: broadcast::Sender<ServiceEvent>,
    refresh_succeeded: AtomicU64,
    refresh_failed: AtomicU64,
    stale_served: AtomicU64,
    fallback_served: AtomicU64,
}

impl EventHub {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            refresh_succeeded: AtomicU64::new(0),
            refresh_failed: AtomicU64::new(0),
            stale_served: AtomicU64::new(0),
            fallback_served: AtomicU64::new(0),
        }
    }

    pub(crate) fn emit(&self, event: ServiceEvent) {
        let counter = match &event {
            ServiceEvent::RefreshSucceeded { .. } => &self.refresh_succeeded,
            ServiceEvent::RefreshFailed { .. } => &self.refresh_failed,
            ServiceEvent::StaleServed { .. } => &self.stale_served,
            ServiceEvent::FallbackServed { .. } => &self.fallback_served,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn stats(&self) -> ServiceStats {
        ServiceStats {
            refresh_succeeded: self.refresh_succeeded.load(Ordering::Relaxed),
            refresh_failed: self.refresh_failed.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
            fallback_served: self.fallback_served.load(Ordering::Relaxed),
        }
    }
}
