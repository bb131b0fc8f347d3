//! # pcm-relay
//!
//! Relays one live PCM capture stream to any number of TCP clients.
//!
//! Every client receives the same raw, unframed sample bytes (signed 16-bit
//! little-endian at the configured rate and channel count) starting with
//! the first frame captured after it connects. Clients that stop accepting
//! data are dropped without affecting the others.
//!
//! ```text
//!  FrameSource ──► BroadcastLoop ──► ClientRegistry ──► client sockets
//!                                          ▲
//!                        Acceptor ─────────┘
//! ```
//!
//! # Example
//! ```no_run
//! use pcm_relay::audio::ParecSource;
//! use pcm_relay::{RelayConfig, RelayServer};
//!
//! # async fn example() -> pcm_relay::error::Result<()> {
//! let config = RelayConfig::default();
//! let server = RelayServer::new(config.clone())?;
//! let source = ParecSource::connect("", "", &config.sample_spec, config.buffer_ms)?;
//!
//! server
//!     .run_until(source, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod error;
pub mod registry;
pub mod server;
pub mod stats;

pub use audio::{AudioFrame, FrameLayout, FrameSource, SampleSpec};
pub use error::{Error, Result, SourceError};
pub use registry::{ClientRegistry, RegistryConfig};
pub use server::{RelayConfig, RelayServer};
