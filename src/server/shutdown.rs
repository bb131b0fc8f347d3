//! Coordinated shutdown
//!
//! Each long-running task observes its own [`StopToken`]. The
//! [`ShutdownCoordinator`] stops them in a fixed order so that no client can
//! be admitted or fed once teardown has begun:
//!
//! 1. Acceptor (the listening socket is closed when it returns)
//! 2. Client registry (every client socket is closed)
//! 3. Broadcast loop (the frame source is flushed and released)

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use crate::registry::ClientRegistry;
use crate::stats::LoopStats;

/// Receiving side of a stop request
#[derive(Debug, Clone)]
pub struct StopToken {
    rx: watch::Receiver<bool>,
}

impl StopToken {
    /// Resolve once a stop has been requested
    ///
    /// Also resolves if the requesting side has gone away.
    pub async fn stopped(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }

    /// Whether a stop has already been requested
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Create a stop sender and its token
pub fn stop_channel() -> (watch::Sender<bool>, StopToken) {
    let (tx, rx) = watch::channel(false);
    (tx, StopToken { rx })
}

/// A spawned task together with the means to stop it
pub struct StopHandle<T> {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<T>>,
    output: Option<Result<T, JoinError>>,
}

impl<T> StopHandle<T> {
    pub fn new(stop_tx: watch::Sender<bool>, task: JoinHandle<T>) -> Self {
        Self {
            stop_tx,
            task: Some(task),
            output: None,
        }
    }

    /// Wait for the task to end on its own
    ///
    /// Cancel-safe: dropping the future leaves the task tracked.
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.as_mut() {
            let result = task.await;
            self.task = None;
            self.output = Some(result);
        }
    }

    /// Request a stop and wait for the task to return
    pub async fn stop(&mut self) -> Option<T> {
        self.stop_tx.send_replace(true);
        self.finished().await;

        match self.output.take() {
            Some(Ok(value)) => Some(value),
            Some(Err(e)) => {
                tracing::error!(error = %e, "Task ended abnormally");
                None
            }
            None => None,
        }
    }
}

/// Stops the relay's tasks in teardown order
pub struct ShutdownCoordinator {
    acceptor: StopHandle<()>,
    broadcaster: StopHandle<LoopStats>,
    registry: Arc<ClientRegistry>,
    report: Option<LoopStats>,
    done: bool,
}

impl ShutdownCoordinator {
    pub fn new(
        acceptor: StopHandle<()>,
        broadcaster: StopHandle<LoopStats>,
        registry: Arc<ClientRegistry>,
    ) -> Self {
        Self {
            acceptor,
            broadcaster,
            registry,
            report: None,
            done: false,
        }
    }

    /// Resolve when the broadcast loop ends without being asked to
    pub async fn broadcaster_finished(&mut self) {
        self.broadcaster.finished().await;
    }

    /// Run the stop sequence
    ///
    /// Only the first call does anything; later calls return the same
    /// broadcast loop statistics.
    pub async fn shutdown(&mut self) -> Option<LoopStats> {
        if self.done {
            return self.report.clone();
        }
        self.done = true;

        tracing::info!("Stopping acceptor");
        self.acceptor.stop().await;

        tracing::info!("Closing client connections");
        self.registry.shutdown().await;

        tracing::info!("Stopping capture");
        self.report = self.broadcaster.stop().await;

        tracing::info!("Shutdown complete");
        self.report.clone()
    }
}
