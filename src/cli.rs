//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. `Cli` is also a `figment` provider, so any flag that is set
//! overrides the file and environment configuration.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Fan a message out to recipients over SMS, Email and Push worker pools.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of workers per delivery channel.
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Capacity of each channel queue (unbounded if not set).
    #[arg(long, value_name = "N")]
    pub queue_capacity: Option<usize>,

    /// Simulated delivery latency in milliseconds.
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// The message to send to every recipient.
    #[arg(short, long)]
    pub message: Option<String>,

    /// Print one JSON object per delivered notification.
    #[arg(long)]
    pub json: bool,

    /// Log level filter, e.g. "debug" or "fanout=trace".
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(workers) = self.workers {
            dict.insert("workers_per_channel".into(), Value::from(workers));
        }

        if let Some(capacity) = self.queue_capacity {
            dict.insert("queue_capacity".into(), Value::from(capacity));
        }

        if let Some(delay) = self.delay_ms {
            dict.insert("delivery_delay_ms".into(), Value::from(delay));
        }

        if let Some(message) = &self.message {
            dict.insert("message".into(), Value::from(message.clone()));
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        // `--json` only ever switches the format on; leaving it out keeps
        // whatever the file or environment chose.
        if self.json {
            let mut output = Dict::new();
            output.insert("format".into(), Value::from("Json"));
            dict.insert("output".into(), Value::from(output));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
