//! Error types for the dispatcher.

use crate::core::DeliveryChannel;
use thiserror::Error;

/// Errors surfaced by registration, dispatch and the worker lifecycle.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A recipient category that has no routing entry.
    #[error("unknown recipient category: {0:?}")]
    UnknownCategory(String),

    /// A delivery channel name that does not exist.
    #[error("unknown delivery channel: {0:?}")]
    UnknownChannel(String),

    /// Two recipients in the same batch share an id.
    #[error("duplicate recipient id {0}")]
    DuplicateRecipient(u64),

    /// A worker pool must have at least one worker per channel.
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    /// Every consumer of the queue is gone, so the notification cannot be enqueued.
    #[error("{0} queue is closed")]
    ChannelClosed(DeliveryChannel),

    /// A managed task panicked before finishing.
    #[error("task '{task}' panicked")]
    TaskPanicked { task: String },

    /// The shutdown signal handler could not be installed.
    #[error("failed to listen for the shutdown signal: {0}")]
    Signal(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for DispatchError {
    fn from(err: figment::Error) -> Self {
        DispatchError::Config(Box::new(err))
    }
}

pub type Result<T, E = DispatchError> = std::result::Result<T, E>;
