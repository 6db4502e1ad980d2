//! The lifecycle coordinator: wires queues, worker pools and the dispatch
//! stage together for one run.

use crate::{
    channels::channel_set,
    config::{Config, OutputFormat},
    core::{DeliveryChannel, Output, Recipient},
    dispatch::{DispatchStage, DispatchSummary},
    error::Result,
    internal_metrics::DeliveryStats,
    outputs::StdoutOutput,
    routing::RoutingTable,
    task_manager::TaskManager,
    worker::WorkerPool,
};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

/// What happened during one `Coordinator::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub dispatch: DispatchSummary,
    delivered: [usize; DeliveryChannel::ALL.len()],
    failed: [usize; DeliveryChannel::ALL.len()],
}

impl RunReport {
    fn from_stats(dispatch: DispatchSummary, stats: &DeliveryStats) -> Self {
        Self {
            dispatch,
            delivered: DeliveryChannel::ALL.map(|c| stats.delivered(c)),
            failed: DeliveryChannel::ALL.map(|c| stats.failed(c)),
        }
    }

    pub fn delivered(&self, channel: DeliveryChannel) -> usize {
        self.delivered[channel.index()]
    }

    pub fn failed(&self, channel: DeliveryChannel) -> usize {
        self.failed[channel.index()]
    }

    pub fn total_delivered(&self) -> usize {
        self.delivered.iter().sum()
    }

    /// Failed deliveries plus notifications that never made it onto a queue.
    pub fn total_failed(&self) -> usize {
        self.failed.iter().sum::<usize>() + self.dispatch.failed
    }
}

/// Runs dispatches. Every `run` builds fresh queues, workers and counters,
/// so runs never share mutable state.
pub struct Coordinator {
    routing: Arc<RoutingTable>,
    outputs: [Arc<dyn Output>; DeliveryChannel::ALL.len()],
    worker_count: usize,
    queue_capacity: Option<usize>,
    delivery_delay: Duration,
    shutdown_rx: watch::Receiver<bool>,
    // Keeps the default receiver's sender alive when no shutdown is wired in.
    _shutdown_tx: Option<watch::Sender<bool>>,
}

impl Coordinator {
    /// Creates a new `CoordinatorBuilder`.
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    /// Builds a coordinator from a loaded configuration.
    pub fn from_config(config: &Config) -> Result<CoordinatorBuilder> {
        Ok(Coordinator::builder()
            .routing(config.routing_table()?)
            .worker_count(config.workers_per_channel)
            .queue_capacity(config.queue_capacity)
            .delivery_delay(config.delivery_delay())
            .output_format(config.output.format))
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Starts the worker pools, dispatches `message` to every recipient and
    /// returns once every worker has exited.
    #[instrument(skip_all, fields(recipients = recipients.len(), workers = self.worker_count))]
    pub async fn run(
        &self,
        recipients: Vec<Recipient>,
        message: impl Into<Arc<str>>,
    ) -> Result<RunReport> {
        let (senders, receivers) = channel_set(self.queue_capacity);
        let task_manager = TaskManager::new(self.shutdown_rx.clone());
        let stats = DeliveryStats::new();

        // Workers are listening before the first send, so bounded queues
        // cannot deadlock the dispatch stage.
        for channel in DeliveryChannel::ALL {
            let pool = WorkerPool::new(
                self.outputs[channel.index()].clone(),
                stats.clone(),
                self.delivery_delay,
            );
            if let Err(e) = pool.spawn(
                channel,
                receivers.receiver(channel).clone(),
                self.worker_count,
                &task_manager,
            ) {
                senders.close_all();
                task_manager.join().await?;
                return Err(e);
            }
        }
        drop(receivers);
        info!("Spawned {} worker tasks.", task_manager.len());

        let stage = DispatchStage::new(senders, self.routing.clone());
        let dispatched = stage.dispatch(recipients, message).await;

        // Join even when dispatch failed: the queues are closed either way.
        let joined = task_manager.join().await;
        let dispatch = dispatched?;
        joined?;

        let report = RunReport::from_stats(dispatch, &stats);
        info!(
            delivered = report.total_delivered(),
            failed = report.total_failed(),
            "Run finished"
        );
        Ok(report)
    }

    /// Runs like `run`, but sends `true` on `shutdown_tx` as soon as `signal`
    /// resolves and then waits for the stopped workers.
    ///
    /// If `signal` fails the error is returned and the workers are not told to
    /// stop.
    pub async fn run_until<S>(
        &self,
        recipients: Vec<Recipient>,
        message: impl Into<Arc<str>>,
        signal: S,
        shutdown_tx: &watch::Sender<bool>,
    ) -> Result<RunReport>
    where
        S: Future<Output = std::io::Result<()>>,
    {
        let run = self.run(recipients, message);
        tokio::pin!(run);

        let finished = tokio::select! {
            res = &mut run => Some(res),
            res = signal => {
                res?;
                None
            }
        };
        match finished {
            Some(res) => res,
            None => {
                warn!("Shutdown signal received. Stopping workers...");
                shutdown_tx.send_replace(true);
                run.await
            }
        }
    }
}

/// Builder for the coordinator.
///
/// Outputs default to stdout in plain text; tests swap them for doubles.
pub struct CoordinatorBuilder {
    routing: RoutingTable,
    output_format: OutputFormat,
    output_override: Option<Arc<dyn Output>>,
    channel_outputs: [Option<Arc<dyn Output>>; DeliveryChannel::ALL.len()],
    worker_count: usize,
    queue_capacity: Option<usize>,
    delivery_delay: Duration,
    shutdown_rx: Option<watch::Receiver<bool>>,
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self {
            routing: RoutingTable::default(),
            output_format: OutputFormat::default(),
            output_override: None,
            channel_outputs: [None, None, None],
            worker_count: 3,
            queue_capacity: None,
            delivery_delay: Duration::from_secs(1),
            shutdown_rx: None,
        }
    }
}

impl CoordinatorBuilder {
    pub fn routing(mut self, routing: RoutingTable) -> Self {
        self.routing = routing;
        self
    }

    pub fn worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn queue_capacity(mut self, capacity: Option<usize>) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn delivery_delay(mut self, delay: Duration) -> Self {
        self.delivery_delay = delay;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Uses `output` for every delivery channel.
    pub fn output_override(mut self, output: Arc<dyn Output>) -> Self {
        self.output_override = Some(output);
        self
    }

    /// Uses `output` for a single delivery channel.
    pub fn channel_output(mut self, channel: DeliveryChannel, output: Arc<dyn Output>) -> Self {
        self.channel_outputs[channel.index()] = Some(output);
        self
    }

    /// Wires an external shutdown signal into every worker.
    pub fn shutdown_rx(mut self, shutdown_rx: watch::Receiver<bool>) -> Self {
        self.shutdown_rx = Some(shutdown_rx);
        self
    }

    pub fn build(self) -> Coordinator {
        let fallback: Arc<dyn Output> = self
            .output_override
            .unwrap_or_else(|| Arc::new(StdoutOutput::new(self.output_format)) as Arc<dyn Output>);
        let outputs = self
            .channel_outputs
            .map(|output| output.unwrap_or_else(|| fallback.clone()));

        let (shutdown_tx, shutdown_rx) = match self.shutdown_rx {
            Some(rx) => (None, rx),
            None => {
                let (tx, rx) = watch::channel(false);
                (Some(tx), rx)
            }
        };

        Coordinator {
            routing: Arc::new(self.routing),
            outputs,
            worker_count: self.worker_count,
            queue_capacity: self.queue_capacity,
            delivery_delay: self.delivery_delay,
            shutdown_rx,
            _shutdown_tx: shutdown_tx,
        }
    }
}
