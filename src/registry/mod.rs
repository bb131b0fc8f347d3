//! Client registry for PCM fan-out
//!
//! The registry owns every connected consumer and copies each captured
//! frame to all of them. Dead connections are detected by write failure
//! and evicted after the fan-out pass that found them.
//!
//! # Architecture
//!
//! ```text
//!                     Arc<ClientRegistry>
//!                ┌──────────────────────────────┐
//!                │ Mutex<                       │
//!                │   connections: HashMap<Id,   │
//!                │     Connection {             │
//!                │       writer: BufWriter,     │
//!                │     }                        │
//!                │   >,                         │
//!                │   closed: bool,              │
//!                │ >                            │
//!                └──────┬───────────────▲───────┘
//!                       │               │
//!          broadcast()  │               │  add()
//!                       │               │
//!   [BroadcastLoop] ────┘               └──── [Acceptor]
//!   read_frame()                              accept()
//!        │
//!        └──► write_all + flush ──► TCP (each client)
//! ```
//!
//! # Zero-Copy Design
//!
//! Frames are `bytes::Bytes`, so one allocation per capture read is shared
//! by every connection written during that broadcast.

pub mod config;
pub mod connection;
pub mod store;

pub use config::RegistryConfig;
pub use connection::{BoxedWriter, Connection, ConnectionId};
pub use store::{BroadcastOutcome, ClientRegistry};
