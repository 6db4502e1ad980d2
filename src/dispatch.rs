//! The dispatch stage: builds one notification per recipient and fans it out
//! to the routed channel queue.

use crate::channels::ChannelSenders;
use crate::core::{DeliveryChannel, Notification, Recipient};
use crate::error::{DispatchError, Result};
use crate::routing::RoutingTable;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, trace};

/// Outcome of a single `DispatchStage::dispatch` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    enqueued: [usize; DeliveryChannel::ALL.len()],
    /// Recipients whose notification could not be enqueued.
    pub failed: usize,
}

impl DispatchSummary {
    pub fn enqueued(&self, channel: DeliveryChannel) -> usize {
        self.enqueued[channel.index()]
    }

    pub fn total_enqueued(&self) -> usize {
        self.enqueued.iter().sum()
    }
}

/// Owns the producer side of every queue for exactly one dispatch.
pub struct DispatchStage {
    senders: ChannelSenders,
    routing: Arc<RoutingTable>,
}

impl DispatchStage {
    pub fn new(senders: ChannelSenders, routing: Arc<RoutingTable>) -> Self {
        Self { senders, routing }
    }

    /// Enqueues one notification per recipient, then closes every queue.
    ///
    /// Each recipient is handled by its own task. The queues are closed only
    /// after every one of those tasks has finished, successfully or not, and
    /// only by this method; consuming `self` rules out a later send.
    #[instrument(skip_all, fields(recipients = recipients.len()))]
    pub async fn dispatch(
        self,
        recipients: Vec<Recipient>,
        message: impl Into<Arc<str>>,
    ) -> Result<DispatchSummary> {
        let message: Arc<str> = message.into();

        let mut seen = HashSet::with_capacity(recipients.len());
        if let Some(dup) = recipients.iter().find(|r| !seen.insert(r.id)) {
            let id = dup.id;
            // Nothing was enqueued; still close so consumers can finish.
            self.senders.close_all();
            return Err(DispatchError::DuplicateRecipient(id));
        }

        let mut tasks = JoinSet::new();
        for recipient in recipients {
            let channel = self.routing.route(recipient.category);
            let sender = self.senders.sender(channel).clone();
            let message = message.clone();
            tasks.spawn(async move {
                let notification = Notification {
                    recipient_id: recipient.id,
                    message,
                    category: recipient.category,
                    channel,
                    created_at: Utc::now(),
                };
                trace!(recipient = recipient.id, %channel, "Enqueueing notification");
                sender
                    .send(notification)
                    .await
                    .map(|_| channel)
                    .map_err(|_| DispatchError::ChannelClosed(channel))
            });
        }

        let mut summary = DispatchSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(channel)) => {
                    summary.enqueued[channel.index()] += 1;
                    metrics::counter!("notifications_dispatched_total", "channel" => channel.as_str())
                        .increment(1);
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Failed to enqueue notification");
                    if let DispatchError::ChannelClosed(channel) = e {
                        metrics::counter!("notifications_failed_total", "channel" => channel.as_str())
                            .increment(1);
                    }
                    summary.failed += 1;
                }
                Err(e) => {
                    error!(error = %e, "Dispatch task did not complete");
                    summary.failed += 1;
                }
            }
        }

        debug!("All recipients routed, closing channel queues.");
        self.senders.close_all();

        info!(
            enqueued = summary.total_enqueued(),
            failed = summary.failed,
            "Dispatch finished"
        );
        Ok(summary)
    }
}
