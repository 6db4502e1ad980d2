//! The worker pool: a fixed number of consumers per delivery channel.

use crate::core::{DeliveryChannel, Notification, Output};
use crate::error::{DispatchError, Result};
use crate::internal_metrics::DeliveryStats;
use crate::task_manager::TaskManager;
use async_channel::Receiver;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, trace};

/// Settings shared by every worker of a pool.
#[derive(Clone)]
pub struct WorkerPool {
    output: Arc<dyn Output>,
    stats: Arc<DeliveryStats>,
    delivery_delay: Duration,
}

impl WorkerPool {
    pub fn new(output: Arc<dyn Output>, stats: Arc<DeliveryStats>, delivery_delay: Duration) -> Self {
        Self {
            output,
            stats,
            delivery_delay,
        }
    }

    /// Spawns `worker_count` workers draining `receiver` on `task_manager`.
    ///
    /// Workers exit once the queue is closed and empty, or when the shutdown
    /// signal fires.
    pub fn spawn(
        &self,
        channel: DeliveryChannel,
        receiver: Receiver<Notification>,
        worker_count: usize,
        task_manager: &TaskManager,
    ) -> Result<()> {
        if worker_count == 0 {
            return Err(DispatchError::InvalidWorkerCount);
        }
        debug!(%channel, worker_count, output = self.output.name(), "Spawning workers");

        for i in 0..worker_count {
            let pool = self.clone();
            let receiver = receiver.clone();
            let shutdown_rx = task_manager.shutdown_rx();
            task_manager.spawn(format!("{channel}-worker-{i}"), async move {
                pool.run_worker(channel, i, receiver, shutdown_rx).await;
            });
        }
        Ok(())
    }

    async fn run_worker(
        self,
        channel: DeliveryChannel,
        id: usize,
        receiver: Receiver<Notification>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        metrics::gauge!("active_workers").increment(1.0);
        trace!(%channel, worker = id, "Worker started");
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown_rx) => {
                    debug!(%channel, worker = id, "Worker received shutdown signal, exiting.");
                    break;
                }
                res = receiver.recv() => res,
            };

            let notification = match next {
                Ok(notification) => notification,
                Err(_) => {
                    trace!(%channel, worker = id, "Queue closed and drained, worker exiting.");
                    break;
                }
            };

            match self.output.deliver(&notification).await {
                Ok(()) => self.stats.record_delivered(channel),
                Err(e) => {
                    error!(
                        %channel,
                        worker = id,
                        recipient = notification.recipient_id,
                        output = self.output.name(),
                        error = %e,
                        "Delivery failed"
                    );
                    self.stats.record_failed(channel);
                }
            }

            if !self.delivery_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = shutdown_requested(&mut shutdown_rx) => {
                        debug!(%channel, worker = id, "Worker interrupted during delivery delay.");
                        break;
                    }
                    _ = tokio::time::sleep(self.delivery_delay) => {}
                }
            }
        }
        metrics::gauge!("active_workers").decrement(1.0);
    }
}

/// Resolves once shutdown has been signalled. A dropped sender never signals.
async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let signalled = shutdown_rx.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}
