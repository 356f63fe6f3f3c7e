//! Graceful Shutdown Handling
//!
//! Turns SIGTERM/SIGINT into a broadcast that the polling engine and the
//! metrics server both listen on, then waits a bounded time for them to stop.

use crate::Result;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Fans a single shutdown request out to every long-running task
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    /// How long [`wait_for_tasks`](Self::wait_for_tasks) waits before aborting
    timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { shutdown_tx, timeout }
    }

    /// Receiver for one component; subscribe before spawning it
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Broadcast shutdown to all subscribers
    pub fn trigger(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            debug!("No component listening for shutdown: {}", e);
        }
    }

    /// Wait for SIGTERM, SIGINT or Ctrl+C
    pub async fn wait_for_signal(&self) -> Result<()> {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
                _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
                _ = signal::ctrl_c() => info!("Received Ctrl+C, initiating graceful shutdown"),
            }
        }

        #[cfg(windows)]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        Ok(())
    }

    /// Join the given tasks, aborting any still running after the timeout
    pub async fn wait_for_tasks(&self, tasks: Vec<(&'static str, JoinHandle<()>)>) {
        for (name, mut handle) in tasks {
            match tokio::time::timeout(self.timeout, &mut handle).await {
                Ok(Ok(())) => debug!(task = name, "Task stopped"),
                Ok(Err(e)) if e.is_cancelled() => debug!(task = name, "Task was cancelled"),
                Ok(Err(e)) => error!(task = name, error = %e, "Task failed"),
                Err(_) => {
                    warn!(task = name, timeout = ?self.timeout, "Task did not stop in time, aborting");
                    handle.abort();
                }
            }
        }
    }
}
