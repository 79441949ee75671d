//! Per-connection stream framer and protocol state machine.
//!
//! TCP delivers bytes with no message boundaries, so each session owns a
//! [`SessionFramer`] that reassembles the inbound byte stream into discrete
//! frames: it runs the seed handshake, asks the [`PacketRegistry`] how large
//! the next frame is, waits for enough bytes, then slices the frame out of
//! the pending buffer zero-copy (`split_to` + `freeze`) and decodes it into a
//! typed packet.
//!
//! Anomalous input is handled in two tiers. Local violations (unknown opcode,
//! invalid declared length, failed decode) drop only the offending bytes and
//! count toward a per-session budget; exhausting the budget, overflowing the
//! pending-buffer cap, or presenting a zero login seed is fatal for the
//! session and surfaces as an `Err`, which closes the connection.
//!
//! The framer implements `tokio_util::codec::Decoder`, so the transport can
//! drive it with a `FramedRead`. Tests call [`SessionFramer::advance`]
//! directly against a `BytesMut`.

use crate::config::{ProtocolLimits, LOGIN_SEED_MARKER};
use crate::core::PacketReader;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::registry::{Packet, PacketRegistry, PacketSizing};
use crate::utils::metrics::global_metrics;
use bytes::{Buf, BytesMut};
use std::sync::Arc;
use tokio_util::codec::Decoder;
use tracing::{debug, trace, warn};

/// Identifies one connection for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Protocol phase of a session. Transitions are monotonic; `Disconnecting`
/// is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Freshly connected; the first bytes are the handshake.
    AwaitingSeed,
    /// Seed accepted (or login-seed marker observed); ordinary frames flow.
    Login,
    /// Application play state; opaque to the framing core.
    Game,
    /// Torn down. No further input is processed.
    Disconnecting,
}

/// Per-session counters, readable as a snapshot by observability collectors.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    pub bytes_received: u64,
    pub frames_parsed: u64,
    pub unknown_opcode_drops: u64,
    pub invalid_length_drops: u64,
    pub parse_failures: u64,
    pub buffer_overflows: u64,
    pub violations: u32,
}

/// Stream reassembly state for one connection.
pub struct SessionFramer {
    registry: Arc<PacketRegistry>,
    limits: ProtocolLimits,
    session: SessionId,
    state: SessionState,
    seed: u32,
    stats: SessionStats,
}

impl SessionFramer {
    pub fn new(session: SessionId, registry: Arc<PacketRegistry>, limits: ProtocolLimits) -> Self {
        Self {
            registry,
            limits,
            session,
            state: SessionState::AwaitingSeed,
            seed: 0,
            stats: SessionStats::default(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The handshake seed, zero until a legacy seed has been accepted.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn is_disconnecting(&self) -> bool {
        self.state == SessionState::Disconnecting
    }

    /// Promote the session into the opaque application play state. Ignored
    /// once the session is disconnecting; transitions never go backwards.
    pub fn enter_game(&mut self) {
        if self.state == SessionState::Login {
            self.state = SessionState::Game;
        }
    }

    /// Account inbound bytes against this session's counters.
    pub fn note_inbound(&mut self, count: usize) {
        self.stats.bytes_received += count as u64;
        global_metrics().bytes_in(count as u64);
    }

    /// Carve the next complete frame out of `buf` and decode it.
    ///
    /// Returns `Ok(Some(packet))` for each decoded frame, `Ok(None)` when the
    /// buffered bytes do not yet form a complete frame, and `Err` on fatal
    /// conditions (zero seed, buffer overflow, exhausted violation budget),
    /// after which the session is `Disconnecting` and ignores further input.
    pub fn advance(&mut self, buf: &mut BytesMut) -> Result<Option<Box<dyn Packet>>> {
        if self.state == SessionState::Disconnecting {
            buf.clear();
            return Ok(None);
        }

        if buf.len() > self.limits.max_pending_buffer_bytes {
            let size = buf.len();
            self.stats.buffer_overflows += 1;
            self.stats.violations += 1;
            global_metrics().buffer_overflow();
            buf.clear();
            self.state = SessionState::Disconnecting;
            warn!(
                session = %self.session,
                size,
                cap = self.limits.max_pending_buffer_bytes,
                "Pending buffer overflow, disconnecting"
            );
            return Err(ProtocolError::BufferOverflow {
                size,
                cap: self.limits.max_pending_buffer_bytes,
            });
        }

        if self.state == SessionState::AwaitingSeed && !self.handshake(buf)? {
            return Ok(None);
        }

        loop {
            if buf.is_empty() {
                return Ok(None);
            }

            let opcode = buf[0];
            let Some(descriptor) = self.registry.descriptor(opcode) else {
                // Resynchronize one byte at a time.
                buf.advance(1);
                self.stats.unknown_opcode_drops += 1;
                global_metrics().unknown_opcode();
                trace!(session = %self.session, opcode = format_args!("0x{opcode:02X}"), "Unknown opcode dropped");
                self.check_budget(buf)?;
                continue;
            };

            let (declared, header_len) = match descriptor.sizing {
                PacketSizing::Fixed(length) => (length, 1usize),
                PacketSizing::Variable => {
                    if buf.len() < 3 {
                        return Ok(None);
                    }
                    (u16::from_be_bytes([buf[1], buf[2]]) as usize, 3usize)
                }
            };

            if declared < header_len || declared > self.limits.max_declared_packet_length {
                let dropped = if header_len == 3 && buf.len() >= 3 { 3 } else { 1 };
                buf.advance(dropped);
                self.stats.invalid_length_drops += 1;
                global_metrics().invalid_length();
                debug!(
                    session = %self.session,
                    opcode = format_args!("0x{opcode:02X}"),
                    declared,
                    "Invalid declared length, header dropped"
                );
                self.check_budget(buf)?;
                continue;
            }

            if buf.len() < declared {
                // Core reassembly behavior: wait for the rest of the frame.
                return Ok(None);
            }

            let frame = buf.split_to(declared).freeze();

            let Some(mut packet) = (descriptor.factory)() else {
                // Construction failure skips the frame; no violation is
                // recorded.
                debug!(
                    session = %self.session,
                    opcode = format_args!("0x{opcode:02X}"),
                    "Packet construction failed, frame skipped"
                );
                continue;
            };

            let mut reader = PacketReader::new(&frame);
            reader.skip(header_len)?;

            match packet.decode(&mut reader) {
                Ok(()) => {
                    self.stats.frames_parsed += 1;
                    global_metrics().frame_parsed();
                    trace!(
                        session = %self.session,
                        opcode = format_args!("0x{opcode:02X}"),
                        length = declared,
                        "Frame decoded"
                    );
                    return Ok(Some(packet));
                }
                Err(error) => {
                    self.stats.parse_failures += 1;
                    global_metrics().parse_failure();
                    debug!(
                        session = %self.session,
                        opcode = format_args!("0x{opcode:02X}"),
                        %error,
                        "Frame failed to decode"
                    );
                    self.check_budget(buf)?;
                    continue;
                }
            }
        }
    }

    /// Run the `AwaitingSeed` step. Returns `Ok(true)` once the session is in
    /// `Login`, `Ok(false)` when more bytes are needed.
    fn handshake(&mut self, buf: &mut BytesMut) -> Result<bool> {
        if buf.is_empty() {
            return Ok(false);
        }

        // The marker byte is also the opcode of the packet that follows; it
        // is interpreted here, not consumed.
        if buf[0] == LOGIN_SEED_MARKER {
            self.state = SessionState::Login;
            debug!(session = %self.session, "Login-seed marker observed");
            return Ok(true);
        }

        if buf.len() < 4 {
            return Ok(false);
        }

        let seed = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if seed == 0 {
            buf.clear();
            self.state = SessionState::Disconnecting;
            warn!(session = %self.session, "Zero login seed, disconnecting");
            return Err(ProtocolError::HandshakeFailed(
                constants::ERR_ZERO_SEED.to_string(),
            ));
        }

        buf.advance(4);
        self.seed = seed;
        self.state = SessionState::Login;
        debug!(session = %self.session, seed = format_args!("0x{seed:08X}"), "Seed accepted");
        Ok(true)
    }

    /// Uniform circuit breaker: every violation kind counts against one
    /// budget, and reaching it disconnects the session.
    fn check_budget(&mut self, buf: &mut BytesMut) -> Result<()> {
        self.stats.violations += 1;
        if self.stats.violations >= self.limits.max_violations_per_session {
            let count = self.stats.violations;
            buf.clear();
            self.state = SessionState::Disconnecting;
            global_metrics().session_force_closed();
            warn!(session = %self.session, count, "Violation budget exhausted, disconnecting");
            return Err(ProtocolError::ViolationBudgetExhausted { count });
        }
        Ok(())
    }
}

impl std::fmt::Debug for SessionFramer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFramer")
            .field("session", &self.session)
            .field("state", &self.state)
            .field("violations", &self.stats.violations)
            .finish()
    }
}

impl Decoder for SessionFramer {
    type Item = Box<dyn Packet>;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.advance(src)
    }
}
