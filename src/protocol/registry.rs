//! Opcode descriptor registry.
//!
//! Maps each opcode byte to the metadata the framer needs before a frame can
//! be carved out of the stream: how the frame is sized and how to construct
//! an empty packet instance for decoding.
//!
//! The registry is populated once at startup and read-only afterwards, so
//! lookups on the framing hot path take `&self` with no locking. Registering
//! the same opcode twice fails loudly: a silent collision would otherwise
//! surface as a protocol-integrity bug at runtime.

use crate::core::{PacketReader, PacketWriter};
use crate::error::{ProtocolError, Result};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A typed protocol packet.
///
/// Inbound packets implement [`decode`](Packet::decode); outbound packets
/// implement [`encode`](Packet::encode); a few legacy packets travel both
/// directions and implement both. The reader handed to `decode` is positioned
/// past the frame header (opcode, plus the length field for variable frames).
pub trait Packet: Send + Sync + fmt::Debug {
    /// The opcode byte identifying this packet type on the wire.
    fn opcode(&self) -> u8;

    /// Populate fields from a frame's payload.
    fn decode(&mut self, reader: &mut PacketReader<'_>) -> Result<()>;

    /// Emit the full frame, header included.
    fn encode(&self, _writer: &mut PacketWriter) -> Result<()> {
        Err(ProtocolError::Custom(format!(
            "packet 0x{:02X} is inbound-only",
            self.opcode()
        )))
    }

    /// Downcasting hook for listeners that want the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// How the framer determines a frame's total length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketSizing {
    /// The frame is always exactly this many bytes, opcode included.
    Fixed(usize),
    /// The frame carries a self-inclusive big-endian u16 length after the
    /// opcode.
    Variable,
}

/// Constructs an empty packet instance for decoding. `None` models a
/// construction failure; the framer skips the frame without recording a
/// violation.
pub type PacketFactory = Arc<dyn Fn() -> Option<Box<dyn Packet>> + Send + Sync>;

/// Registry metadata for one opcode.
#[derive(Clone)]
pub struct PacketDescriptor {
    pub opcode: u8,
    pub sizing: PacketSizing,
    pub factory: PacketFactory,
    pub description: &'static str,
}

impl fmt::Debug for PacketDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketDescriptor")
            .field("opcode", &format_args!("0x{:02X}", self.opcode))
            .field("sizing", &self.sizing)
            .field("description", &self.description)
            .finish()
    }
}

/// Declarative registration metadata attached to a packet type, consumed by
/// [`PacketRegistry::register`].
pub trait RegisteredPacket: Packet + Default + 'static {
    const OPCODE: u8;
    const SIZING: PacketSizing;
    const DESCRIPTION: &'static str;
}

/// Static opcode table: 256 slots, populated single-threaded at startup.
#[derive(Default)]
pub struct PacketRegistry {
    table: Vec<Option<PacketDescriptor>>,
}

impl PacketRegistry {
    pub fn new() -> Self {
        Self {
            table: vec![None; 256],
        }
    }

    fn insert(&mut self, descriptor: PacketDescriptor) -> Result<()> {
        if self.table.is_empty() {
            self.table = vec![None; 256];
        }
        let slot = &mut self.table[descriptor.opcode as usize];
        if slot.is_some() {
            return Err(ProtocolError::DuplicateOpcode(descriptor.opcode));
        }
        debug!(
            opcode = format_args!("0x{:02X}", descriptor.opcode),
            sizing = ?descriptor.sizing,
            description = descriptor.description,
            "Registered packet descriptor"
        );
        *slot = Some(descriptor);
        Ok(())
    }

    /// Register a fixed-length packet. `length` counts the opcode byte.
    pub fn register_fixed(
        &mut self,
        opcode: u8,
        length: usize,
        description: &'static str,
        factory: PacketFactory,
    ) -> Result<()> {
        if length == 0 {
            return Err(ProtocolError::ConfigError(format!(
                "fixed packet 0x{opcode:02X} must have a nonzero length"
            )));
        }
        self.insert(PacketDescriptor {
            opcode,
            sizing: PacketSizing::Fixed(length),
            factory,
            description,
        })
    }

    /// Register a variable-length packet (self-inclusive u16 length header).
    pub fn register_variable(
        &mut self,
        opcode: u8,
        description: &'static str,
        factory: PacketFactory,
    ) -> Result<()> {
        self.insert(PacketDescriptor {
            opcode,
            sizing: PacketSizing::Variable,
            factory,
            description,
        })
    }

    /// Register a packet type from its declarative metadata.
    pub fn register<P: RegisteredPacket>(&mut self) -> Result<()> {
        if let PacketSizing::Fixed(0) = P::SIZING {
            return Err(ProtocolError::ConfigError(format!(
                "fixed packet 0x{:02X} must have a nonzero length",
                P::OPCODE
            )));
        }
        self.insert(PacketDescriptor {
            opcode: P::OPCODE,
            sizing: P::SIZING,
            factory: Arc::new(|| Some(Box::new(P::default()) as Box<dyn Packet>)),
            description: P::DESCRIPTION,
        })
    }

    /// Look up the descriptor for an opcode.
    pub fn descriptor(&self, opcode: u8) -> Option<&PacketDescriptor> {
        self.table.get(opcode as usize).and_then(|slot| slot.as_ref())
    }

    /// Invoke the factory for an opcode. Pure construction, no decoding.
    pub fn create(&self, opcode: u8) -> Option<Box<dyn Packet>> {
        self.descriptor(opcode).and_then(|desc| (desc.factory)())
    }

    /// Number of registered opcodes.
    pub fn len(&self) -> usize {
        self.table.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for PacketRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketRegistry")
            .field("registered", &self.len())
            .finish()
    }
}
