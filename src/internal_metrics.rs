//! Counters for the dispatcher, published through the `metrics` facade.
//!
//! No exporter is installed by the crate; without a global recorder the
//! handles are no-ops. The per-run totals the coordinator returns are kept in
//! `DeliveryStats` so callers do not depend on a recorder being present.

use crate::core::DeliveryChannel;
use metrics::Unit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Registers descriptions for every metric the dispatcher emits.
pub fn describe() {
    metrics::describe_counter!(
        "notifications_dispatched_total",
        Unit::Count,
        "Notifications enqueued by the dispatch stage, labeled by channel."
    );
    metrics::describe_counter!(
        "notifications_delivered_total",
        Unit::Count,
        "Notifications successfully handed to an output, labeled by channel."
    );
    metrics::describe_counter!(
        "notifications_failed_total",
        Unit::Count,
        "Notifications that failed to enqueue or deliver, labeled by channel."
    );
    metrics::describe_gauge!("active_workers", Unit::Count, "Worker tasks currently running.");
}

/// Per-run delivery counters shared by all workers of a run.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    delivered: [AtomicUsize; DeliveryChannel::ALL.len()],
    failed: [AtomicUsize; DeliveryChannel::ALL.len()],
}

impl DeliveryStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_delivered(&self, channel: DeliveryChannel) {
        self.delivered[channel.index()].fetch_add(1, Ordering::SeqCst);
        metrics::counter!("notifications_delivered_total", "channel" => channel.as_str())
            .increment(1);
    }

    pub fn record_failed(&self, channel: DeliveryChannel) {
        self.failed[channel.index()].fetch_add(1, Ordering::SeqCst);
        metrics::counter!("notifications_failed_total", "channel" => channel.as_str())
            .increment(1);
    }

    pub fn delivered(&self, channel: DeliveryChannel) -> usize {
        self.delivered[channel.index()].load(Ordering::SeqCst)
    }

    pub fn failed(&self, channel: DeliveryChannel) -> usize {
        self.failed[channel.index()].load(Ordering::SeqCst)
    }

    pub fn total_delivered(&self) -> usize {
        DeliveryChannel::ALL.iter().map(|&c| self.delivered(c)).sum()
    }

    pub fn total_failed(&self) -> usize {
        DeliveryChannel::ALL.iter().map(|&c| self.failed(c)).sum()
    }
}
