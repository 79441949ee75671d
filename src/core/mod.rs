//! # Core Protocol Components
//!
//! Low-level binary encoding and decoding for the legacy wire format.
//!
//! This module provides the foundation for the protocol: a seekable binary
//! cursor over a growable byte buffer, used by every packet's encode and
//! decode routine.
//!
//! ## Components
//! - **PacketWriter**: big-endian-first primitive and string encoding with
//!   pooled storage, auto-grow, and two-pass length patching
//! - **PacketReader**: bounds-checked decoding over a borrowed frame
//!
//! ## Wire Conventions
//! ```text
//! Fixed frame:    [opcode:1][payload: N-1 bytes]        (N from descriptor)
//! Variable frame: [opcode:1][length:u16 BE][payload]    (length self-inclusive)
//! ```
//!
//! Numeric fields default to big-endian; an explicit little-endian API exists
//! for specific legacy fields.

pub mod cursor;

pub use cursor::{PacketReader, PacketWriter};
