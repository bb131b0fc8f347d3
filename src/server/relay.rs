//! PCM relay server
//!
//! Wires the acceptor, broadcast loop and client registry together and runs
//! them until an external shutdown request or the end of the capture stream.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::audio::FrameSource;
use crate::error::{Error, Result};
use crate::registry::ClientRegistry;
use crate::stats::LoopStats;

use super::acceptor::{AcceptBackoff, Acceptor};
use super::broadcast::BroadcastLoop;
use super::config::RelayConfig;
use super::shutdown::{stop_channel, ShutdownCoordinator, StopHandle};

/// Relay server
pub struct RelayServer {
    config: RelayConfig,
    registry: Arc<ClientRegistry>,
}

impl RelayServer {
    /// Create a server, rejecting an invalid sample spec up front
    pub fn new(config: RelayConfig) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(ClientRegistry::with_config(config.registry.clone()));

        Ok(Self { config, registry })
    }

    /// Get a reference to the client registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Get the configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Bind the listening socket
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_addr;
        TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })
    }

    /// Bind, then relay `source` until `shutdown` resolves
    pub async fn run_until<S, F>(&self, source: S, shutdown: F) -> Result<LoopStats>
    where
        S: FrameSource,
        F: Future<Output = ()>,
    {
        let listener = self.bind().await?;
        Ok(self.serve(listener, source, shutdown).await)
    }

    /// Relay `source` to clients accepted on `listener`
    ///
    /// Returns when `shutdown` resolves or the source ends, after the
    /// listener, every client socket and the source have been closed.
    pub async fn serve<S, F>(&self, listener: TcpListener, source: S, shutdown: F) -> LoopStats
    where
        S: FrameSource,
        F: Future<Output = ()>,
    {
        match listener.local_addr() {
            Ok(addr) => tracing::info!(
                addr = %addr,
                spec = %self.config.sample_spec,
                "PCM relay listening"
            ),
            Err(e) => tracing::warn!(error = %e, "Listening on unknown address"),
        }

        let (acceptor_tx, acceptor_stop) = stop_channel();
        let acceptor = Acceptor::new(
            listener,
            Arc::clone(&self.registry),
            AcceptBackoff::new(self.config.accept_backoff, self.config.accept_backoff_max),
            self.config.tcp_nodelay,
            acceptor_stop,
        );
        let acceptor_task = tokio::spawn(acceptor.run());

        let (loop_tx, loop_stop) = stop_channel();
        let broadcast_loop = BroadcastLoop::new(
            source,
            Arc::clone(&self.registry),
            self.config.frame_layout(),
            loop_stop,
        );
        let loop_task = tokio::spawn(broadcast_loop.run());

        let mut coordinator = ShutdownCoordinator::new(
            StopHandle::new(acceptor_tx, acceptor_task),
            StopHandle::new(loop_tx, loop_task),
            Arc::clone(&self.registry),
        );

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = coordinator.broadcaster_finished() => {
                tracing::info!("Capture stopped, shutting down");
            }
        }

        let stats = coordinator.shutdown().await.unwrap_or_default();

        tracing::info!(
            frames = stats.frames_read,
            bytes = stats.bytes_read,
            byte_rate = stats.byte_rate(),
            "Relay stopped"
        );

        stats
    }
}
