//! Delivery outputs.
//!
//! `StdoutOutput` stands in for a real SMS, Email or Push gateway: it prints
//! one line per notification in the configured format.

use crate::config::OutputFormat;
use crate::core::{Notification, Output};
use crate::formatting::{JsonFormatter, NotificationFormatter, PlainTextFormatter};
use anyhow::Result;
use async_trait::async_trait;
use std::io::Write;
use tracing::trace;

/// Prints each delivered notification to stdout.
pub struct StdoutOutput {
    formatter: Box<dyn NotificationFormatter>,
}

impl StdoutOutput {
    pub fn new(format: OutputFormat) -> Self {
        let formatter: Box<dyn NotificationFormatter> = match format {
            OutputFormat::PlainText => Box::new(PlainTextFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
        };
        Self { formatter }
    }
}

#[async_trait]
impl Output for StdoutOutput {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let line = self.formatter.format(notification);
        trace!(recipient = notification.recipient_id, "Writing notification to stdout");
        // Lock once so concurrent workers never interleave within a line.
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
        Ok(())
    }
}
