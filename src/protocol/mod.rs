//! # Protocol Layer
//!
//! The stream-to-packet pipeline: descriptor registry, per-session framer,
//! listener dispatcher, and the concrete legacy packet types.
//!
//! Data flow: transport bytes → [`SessionFramer`](framer::SessionFramer)
//! reassembles frames using the [`PacketRegistry`](registry::PacketRegistry)
//! → decoded packets fan out through the [`Dispatcher`](dispatcher::Dispatcher).

pub mod dispatcher;
pub mod framer;
pub mod packets;
pub mod registry;
