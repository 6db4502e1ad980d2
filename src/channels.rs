//! Per-channel notification queues.
//!
//! Each delivery channel gets one multi-producer, multi-consumer queue. The
//! sending halves are owned by the dispatch stage and the receiving halves by
//! the worker pools, so closing the queues is a single-owner operation.

use crate::core::{DeliveryChannel, Notification};
use async_channel::{Receiver, Sender};

/// The producer side of every delivery channel queue.
#[derive(Debug)]
pub struct ChannelSenders {
    senders: [Sender<Notification>; DeliveryChannel::ALL.len()],
}

/// The consumer side of every delivery channel queue.
#[derive(Debug, Clone)]
pub struct ChannelReceivers {
    receivers: [Receiver<Notification>; DeliveryChannel::ALL.len()],
}

/// Creates one queue per delivery channel.
///
/// `capacity` of `None` makes the queues unbounded; `Some(n)` bounds each
/// queue to `n` entries (at least one) so that senders wait when it is full.
pub fn channel_set(capacity: Option<usize>) -> (ChannelSenders, ChannelReceivers) {
    let make = || match capacity {
        Some(cap) => async_channel::bounded(cap.max(1)),
        None => async_channel::unbounded(),
    };
    let (sms_tx, sms_rx) = make();
    let (email_tx, email_rx) = make();
    let (push_tx, push_rx) = make();

    (
        ChannelSenders {
            senders: [sms_tx, email_tx, push_tx],
        },
        ChannelReceivers {
            receivers: [sms_rx, email_rx, push_rx],
        },
    )
}

impl ChannelSenders {
    pub(crate) fn sender(&self, channel: DeliveryChannel) -> &Sender<Notification> {
        &self.senders[channel.index()]
    }

    /// Closes every queue. Consumes the senders so nothing can be sent afterwards.
    pub(crate) fn close_all(self) {
        for (channel, sender) in DeliveryChannel::ALL.iter().zip(self.senders.iter()) {
            sender.close();
            tracing::debug!(%channel, pending = sender.len(), "Closed channel queue");
        }
    }
}

impl ChannelReceivers {
    pub fn receiver(&self, channel: DeliveryChannel) -> &Receiver<Notification> {
        &self.receivers[channel.index()]
    }
}
