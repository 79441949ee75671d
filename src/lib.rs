//! # shardnet
//!
//! Network protocol core for a legacy game-shard server: the codec, framing,
//! and dispatch engine that turns a raw TCP byte stream into typed packets.
//!
//! ## Components
//! - **Binary Cursor** ([`core`]): big-endian-first primitive and string
//!   encoding/decoding with pooled storage and two-pass length patching
//! - **Descriptor Registry** ([`protocol::registry`]): static opcode table
//!   mapping each opcode to its sizing policy and packet factory
//! - **Stream Framer** ([`protocol::framer`]): per-session reassembly state
//!   machine with the seed handshake and a protocol-violation circuit breaker
//! - **Dispatcher** ([`protocol::dispatcher`]): per-opcode listener fan-out
//!   with failure isolation
//! - **Transport** ([`transport`]): tokio TCP accept loop wiring the pieces
//!   together
//!
//! ## Wire Format
//! ```text
//! Fixed frame:    [opcode:1][payload: N-1 bytes]
//! Variable frame: [opcode:1][length:u16 BE, self-inclusive][payload]
//! ```
//!
//! ## Quick Start
//! ```rust,no_run
//! use shardnet::protocol::dispatcher::Dispatcher;
//! use shardnet::protocol::packets::{self, SeasonChange};
//! use shardnet::protocol::registry::PacketRegistry;
//! use shardnet::transport::OutboundRouter;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> shardnet::error::Result<()> {
//!     let config = shardnet::config::NetworkConfig::default();
//!     shardnet::utils::logging::init_logging(&config.logging)?;
//!
//!     let mut registry = PacketRegistry::new();
//!     packets::register_defaults(&mut registry)?;
//!
//!     let dispatcher = Dispatcher::new();
//!     dispatcher.add_listener(0xBC, |session, packet| {
//!         let season = packet.as_any().downcast_ref::<SeasonChange>();
//!         tracing::info!(%session, ?season, "season change");
//!         Ok(true)
//!     })?;
//!
//!     shardnet::transport::start_server(config, Arc::new(registry), dispatcher, OutboundRouter::new()).await
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use config::NetworkConfig;
pub use core::{PacketReader, PacketWriter};
pub use error::{ProtocolError, Result};
pub use protocol::dispatcher::Dispatcher;
pub use protocol::framer::{SessionFramer, SessionId, SessionState};
pub use protocol::registry::{Packet, PacketRegistry, PacketSizing};
pub use transport::OutboundRouter;
