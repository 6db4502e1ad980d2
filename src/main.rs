//! fanout - notification dispatcher
//!
//! Loads the recipients and message from configuration, fans the message out
//! to the SMS, Email and Push worker pools, and exits once every worker has
//! drained its queue.

use anyhow::Result;
use clap::Parser;
use fanout::{app::Coordinator, cli::Cli, config::Config, internal_metrics};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            // Logging is not configured yet; fall back to the default filter.
            init_logging("info");
            error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    init_logging(&config.log_level);
    internal_metrics::describe();

    info!("fanout starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Workers Per Channel: {}", config.workers_per_channel);
    match config.queue_capacity {
        Some(capacity) => info!("Queue Capacity: {}", capacity),
        None => info!("Queue Capacity: unbounded"),
    }
    info!("Delivery Delay: {}ms", config.delivery_delay_ms);
    info!("Output Format: {}", config.output.format);
    info!("Recipients: {}", config.recipients.len());
    info!("-------------------------------------------------------");

    // Unknown categories and duplicate ids are rejected before anything is sent.
    let recipients = config.recipients()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let coordinator = Coordinator::from_config(&config)?
        .shutdown_rx(shutdown_rx)
        .build();
    for (category, channel) in config.routing_table()?.iter() {
        info!(%category, %channel, "Route");
    }

    let report = coordinator
        .run_until(
            recipients,
            config.message.as_str(),
            tokio::signal::ctrl_c(),
            &shutdown_tx,
        )
        .await?;

    info!(
        dispatched = report.dispatch.total_enqueued(),
        delivered = report.total_delivered(),
        failed = report.total_failed(),
        "All workers finished. Exiting."
    );
    Ok(())
}

/// Logs go to stderr so stdout only carries delivered notifications.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
