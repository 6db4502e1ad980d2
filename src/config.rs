//! Configuration management for the dispatcher
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer built-in defaults, the TOML file named by
//! `--config` (if any), `FANOUT_`-prefixed environment variables and command-line arguments.

use crate::cli::Cli;
use crate::core::Recipient;
use crate::error::Result;
use crate::routing::RoutingTable;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level (an `EnvFilter` directive).
    pub log_level: String,
    /// Number of workers started for each delivery channel.
    pub workers_per_channel: usize,
    /// Capacity of each channel queue. Unbounded when absent.
    #[serde(default)]
    pub queue_capacity: Option<usize>,
    /// Simulated delivery latency per notification, in milliseconds.
    pub delivery_delay_ms: u64,
    /// The message sent to every recipient.
    pub message: String,
    /// The recipients to notify.
    pub recipients: Vec<RecipientConfig>,
    /// Per-category channel overrides, e.g. `end_user = "email"`.
    #[serde(default)]
    pub routing: BTreeMap<String, String>,
    /// Configuration for output.
    pub output: OutputConfig,
}

/// A recipient as written in configuration. The category is validated when
/// converted into a `Recipient`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RecipientConfig {
    pub id: u64,
    pub name: String,
    pub category: String,
}

/// The format for stdout output.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    PlainText,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("Json"),
            OutputFormat::PlainText => f.write_str("PlainText"),
        }
    }
}

/// Configuration for output.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct OutputConfig {
    /// The format to use for stdout output.
    pub format: OutputFormat,
}

impl Config {
    /// Loads the configuration from defaults, the optional file named by
    /// `--config`, the environment and finally the CLI arguments themselves.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = &cli.config {
            figment = figment.merge(Toml::file(path));
        }
        let config: Config = figment
            // Allow overriding with environment variables, e.g. FANOUT_WORKERS_PER_CHANNEL=5
            .merge(Env::prefixed("FANOUT_"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }

    /// Loads the configuration from a TOML file layered over the defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .extract()?;
        Ok(config)
    }

    /// Validates and converts the configured recipients.
    ///
    /// Fails on the first unknown category or repeated id, before anything is
    /// dispatched.
    pub fn recipients(&self) -> Result<Vec<Recipient>> {
        let mut seen = HashSet::with_capacity(self.recipients.len());
        self.recipients
            .iter()
            .map(|raw| {
                if !seen.insert(raw.id) {
                    return Err(crate::error::DispatchError::DuplicateRecipient(raw.id));
                }
                Recipient::try_from(raw)
            })
            .collect()
    }

    /// Builds the routing table from the defaults and the `[routing]` section.
    pub fn routing_table(&self) -> Result<RoutingTable> {
        RoutingTable::from_overrides(&self.routing)
    }

    pub fn delivery_delay(&self) -> Duration {
        Duration::from_millis(self.delivery_delay_ms)
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            workers_per_channel: 3,
            queue_capacity: None,
            delivery_delay_ms: 1000,
            message: "Your order is on the way!".to_string(),
            recipients: vec![
                RecipientConfig {
                    id: 1,
                    name: "Delivery Agent 1".to_string(),
                    category: "Delivery Agent".to_string(),
                },
                RecipientConfig {
                    id: 2,
                    name: "Staff 1".to_string(),
                    category: "Staff".to_string(),
                },
                RecipientConfig {
                    id: 3,
                    name: "End User 1".to_string(),
                    category: "End User".to_string(),
                },
            ],
            routing: BTreeMap::new(),
            output: OutputConfig::default(),
        }
    }
}
