//! # Error Types
//!
//! Comprehensive error handling for the shard protocol core.
//!
//! This module defines all error variants that can occur while encoding,
//! framing, and dispatching legacy packets, from short-buffer reads to
//! per-session protocol violations.
//!
//! ## Error Categories
//! - **I/O Errors**: Socket and file system failures
//! - **Cursor Errors**: Capacity, seek, and short-buffer failures
//! - **Framing Errors**: Handshake, length, and violation-budget failures
//! - **Registry Errors**: Duplicate opcode registration (fatal at startup)
//!
//! All errors implement `std::error::Error` for interoperability.

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common cases.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Framing errors
    pub const ERR_ZERO_SEED: &str = "Handshake rejected: zero login seed";
}

/// Primary error type for all protocol-core operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The cursor needed more capacity than it holds and growth is disabled.
    #[error("cursor capacity exceeded: needed {needed} bytes, capacity {capacity}")]
    CapacityExceeded { needed: usize, capacity: usize },

    /// A seek landed outside the writable region.
    #[error("seek out of bounds: target {target}, length {len}")]
    SeekOutOfBounds { target: i64, len: usize },

    /// A read ran past the end of the frame.
    #[error("short buffer: needed {needed} bytes, {available} available")]
    ShortBuffer { needed: usize, available: usize },

    /// A string field held bytes invalid for its declared encoding.
    #[error("invalid {encoding} string data")]
    InvalidString { encoding: &'static str },

    /// Two packet types claimed the same opcode at startup.
    #[error("duplicate opcode registration: 0x{0:02X}")]
    DuplicateOpcode(u8),

    /// A frame failed its packet-level decode routine.
    #[error("malformed packet 0x{opcode:02X}: {reason}")]
    MalformedPacket { opcode: u8, reason: String },

    /// The session never presented a usable login seed.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// The session's pending buffer exceeded `max_pending_buffer_bytes`.
    #[error("pending buffer overflow: {size} bytes buffered, cap {cap}")]
    BufferOverflow { size: usize, cap: usize },

    /// The session burned through its protocol-violation budget.
    #[error("violation budget exhausted: {count} violations")]
    ViolationBudgetExhausted { count: u32 },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timeout occurred")]
    Timeout,

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("custom error: {0}")]
    Custom(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
