//! Client registry implementation
//!
//! The single owner of the set of connected consumers. Every mutation
//! (admission, fan-out with eviction, shutdown) runs under one exclusive
//! lock, held across the socket writes of a broadcast.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWrite;
use tokio::sync::Mutex;

use crate::audio::AudioFrame;
use crate::error::Error;
use crate::stats::RegistryStats;

use super::config::RegistryConfig;
use super::connection::{Connection, ConnectionId};

/// Per-connection result of one broadcast step
enum Delivery {
    Delivered,
    Evict(Error),
}

/// Summary of one [`ClientRegistry::broadcast`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Connections that received the whole frame
    pub delivered: usize,
    /// Connections evicted during this call
    pub evicted: usize,
}

struct RegistryState {
    connections: HashMap<ConnectionId, Connection>,
    closed: bool,
    stats: RegistryStats,
}

/// Set of currently connected consumers
pub struct ClientRegistry {
    state: Mutex<RegistryState>,
    next_id: AtomicU64,
    config: RegistryConfig,
}

impl ClientRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                connections: HashMap::new(),
                closed: false,
                stats: RegistryStats::default(),
            }),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a consumer
    ///
    /// After shutdown the writer is dropped (closing the socket) and `None`
    /// is returned. Otherwise the connection receives every frame broadcast
    /// from now on.
    pub async fn add<W>(&self, writer: W, peer_addr: Option<SocketAddr>) -> Option<ConnectionId>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut state = self.state.lock().await;

        if state.closed {
            state.stats.total_rejected += 1;
            drop(writer);
            tracing::warn!(peer = ?peer_addr, "Registry closed, connection dropped");
            return None;
        }

        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let connection = Connection::new(
            id,
            peer_addr,
            Box::new(writer),
            self.config.write_buffer_size,
        );
        state.connections.insert(id, connection);
        state.stats.total_accepted += 1;

        tracing::info!(
            connection_id = %id,
            peer = ?peer_addr,
            clients = state.connections.len(),
            "Client registered"
        );

        Some(id)
    }

    /// Send a frame to every registered connection
    ///
    /// Connections whose write or flush fails are closed and removed once
    /// the whole set has been visited. A failing connection never affects
    /// delivery to the others, and the call itself never fails.
    pub async fn broadcast(&self, frame: &AudioFrame) -> BroadcastOutcome {
        let mut state = self.state.lock().await;

        if state.closed {
            return BroadcastOutcome::default();
        }

        let timeout = self.config.write_timeout;
        let mut results = Vec::with_capacity(state.connections.len());

        for (id, connection) in state.connections.iter_mut() {
            let delivery = match connection.send(&frame.data, timeout).await {
                Ok(()) => Delivery::Delivered,
                Err(e) => Delivery::Evict(e),
            };
            results.push((*id, delivery));
        }

        let mut outcome = BroadcastOutcome::default();

        for (id, delivery) in results {
            match delivery {
                Delivery::Delivered => outcome.delivered += 1,
                Delivery::Evict(e) => {
                    if let Some(connection) = state.connections.remove(&id) {
                        tracing::debug!(
                            connection_id = %id,
                            peer = ?connection.peer_addr(),
                            error = %e,
                            "Evicting client"
                        );
                        connection.close();
                    }
                    outcome.evicted += 1;
                }
            }
        }

        state.stats.frames_broadcast += 1;
        state.stats.bytes_sent += (frame.len() * outcome.delivered) as u64;
        state.stats.total_evicted += outcome.evicted as u64;

        if outcome.evicted > 0 {
            tracing::info!(
                evicted = outcome.evicted,
                clients = state.connections.len(),
                "Dead clients removed"
            );
        }

        tracing::trace!(
            sequence = frame.sequence,
            delivered = outcome.delivered,
            "Frame broadcast"
        );

        outcome
    }

    /// Close every connection and refuse all later ones
    ///
    /// Idempotent: only the first call has any effect.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;

        if state.closed {
            return;
        }
        state.closed = true;

        let count = state.connections.len();
        for (_, connection) in state.connections.drain() {
            connection.close();
        }

        tracing::info!(closed = count, "Client registry shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) has run
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Number of registered connections
    pub async fn len(&self) -> usize {
        self.state.lock().await.connections.len()
    }

    /// Whether no connections are registered
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Ids of the registered connections
    pub async fn connection_ids(&self) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        let mut ids: Vec<ConnectionId> = state.connections.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Snapshot of registry counters
    pub async fn stats(&self) -> RegistryStats {
        let state = self.state.lock().await;
        RegistryStats {
            active: state.connections.len(),
            ..state.stats.clone()
        }
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
