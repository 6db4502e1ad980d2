/// fanout - a bounded multi-channel notification dispatcher
///
/// Routes one message to many recipients. Each recipient's category selects a
/// delivery channel (SMS, Email or Push), and a fixed pool of workers per
/// channel drains that channel's queue.
pub mod app;
pub mod channels;
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod formatting;
pub mod internal_metrics;
pub mod outputs;
pub mod routing;
pub mod task_manager;
pub mod worker;

// Re-export core types for convenience
pub use crate::app::{Coordinator, RunReport};
pub use crate::core::*;
pub use crate::error::{DispatchError, Result};
