//! Tracks the tasks spawned for a run and joins them.
use crate::error::{DispatchError, Result};
use futures::future::join_all;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A registry of named tasks that acts as the join primitive for a run.
///
/// Tasks are spawned through the manager and awaited together by `join`.
/// The manager also hands out the shutdown receiver tasks select on.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<(String, JoinHandle<()>)>>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskManager {
    pub fn new(shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_rx,
        }
    }

    /// Spawns a new task and records its handle under `name`.
    pub fn spawn<F>(&self, name: impl Into<String>, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        debug!(task_name = %name, "Spawning task");
        let handle = tokio::spawn(future);
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name, handle));
    }

    /// Returns a clone of the shutdown receiver.
    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Number of tasks spawned and not yet joined.
    pub fn len(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits for every managed task to finish.
    ///
    /// All tasks are awaited even if some panicked; the first panicked task is
    /// reported as `DispatchError::TaskPanicked`.
    pub async fn join(self) -> Result<()> {
        let handles = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect::<Vec<_>>();
        info!("Waiting for {} tasks to complete...", handles.len());

        let (names, handles): (Vec<String>, Vec<JoinHandle<()>>) = handles.into_iter().unzip();
        let results = join_all(handles).await;

        let mut panicked = Vec::new();
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(()) => debug!(task_name = %name, "Task finished."),
                Err(e) => {
                    error!(task_name = %name, error = %e, "Task panicked.");
                    panicked.push(name);
                }
            }
        }

        match panicked.into_iter().next() {
            Some(task) => Err(DispatchError::TaskPanicked { task }),
            None => {
                info!("All tasks finished.");
                Ok(())
            }
        }
    }
}
