//! # Transport Layer
//!
//! TCP plumbing around the protocol core: the accept loop, per-connection
//! read/dispatch/write tasks, and the outbound byte router that external
//! packet producers send through.

pub mod tcp;

pub use tcp::{start_server, start_server_with_shutdown, OutboundRouter};
