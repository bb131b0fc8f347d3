//! Relay server
//!
//! This module provides:
//! - The TCP accept loop feeding the client registry
//! - The broadcast loop pumping frames from the capture source
//! - Ordered shutdown of both plus the registry

pub mod acceptor;
pub mod broadcast;
pub mod config;
pub mod relay;
pub mod shutdown;

pub use acceptor::{AcceptBackoff, Acceptor};
pub use broadcast::BroadcastLoop;
pub use config::{resolve_listen_addr, RelayConfig};
pub use relay::RelayServer;
pub use shutdown::{stop_channel, ShutdownCoordinator, StopHandle, StopToken};
