//! Concrete legacy packet types.
//!
//! A small set of real protocol packets, enough to cover every codec shape:
//! fixed and variable sizing, fixed-width ASCII fields, null-terminated
//! UTF-16 text, and the two-pass length patch on the encode side. Game-logic
//! handlers for these live outside the core; here they are wire types only.

use crate::core::{PacketReader, PacketWriter};
use crate::error::{ProtocolError, Result};
use crate::protocol::registry::{Packet, PacketRegistry, PacketSizing, RegisteredPacket};
use std::any::Any;

/// First packet of a modern client: its opcode doubles as the login-seed
/// marker the handshake recognizes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoginSeed {
    pub seed: u32,
    pub version_major: u32,
    pub version_minor: u32,
    pub version_revision: u32,
    pub version_prototype: u32,
}

impl Packet for LoginSeed {
    fn opcode(&self) -> u8 {
        Self::OPCODE
    }

    fn decode(&mut self, reader: &mut PacketReader<'_>) -> Result<()> {
        self.seed = reader.read_u32()?;
        self.version_major = reader.read_u32()?;
        self.version_minor = reader.read_u32()?;
        self.version_revision = reader.read_u32()?;
        self.version_prototype = reader.read_u32()?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RegisteredPacket for LoginSeed {
    const OPCODE: u8 = 0xEF;
    const SIZING: PacketSizing = PacketSizing::Fixed(21);
    const DESCRIPTION: &'static str = "Login Seed";
}

/// Account credentials, sent once after the handshake.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AccountLogin {
    pub username: String,
    pub password: String,
    pub next_login_key: u8,
}

impl Packet for AccountLogin {
    fn opcode(&self) -> u8 {
        Self::OPCODE
    }

    fn decode(&mut self, reader: &mut PacketReader<'_>) -> Result<()> {
        self.username = reader.read_ascii_fixed(30)?;
        self.password = reader.read_ascii_fixed(30)?;
        self.next_login_key = reader.read_u8()?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RegisteredPacket for AccountLogin {
    const OPCODE: u8 = 0x80;
    const SIZING: PacketSizing = PacketSizing::Fixed(62);
    const DESCRIPTION: &'static str = "Account Login";
}

/// Keep-alive, echoed back with the same sequence number.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Ping {
    pub sequence: u8,
}

impl Packet for Ping {
    fn opcode(&self) -> u8 {
        Self::OPCODE
    }

    fn decode(&mut self, reader: &mut PacketReader<'_>) -> Result<()> {
        self.sequence = reader.read_u8()?;
        Ok(())
    }

    fn encode(&self, writer: &mut PacketWriter) -> Result<()> {
        writer.write_u8(Self::OPCODE)?;
        writer.write_u8(self.sequence)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RegisteredPacket for Ping {
    const OPCODE: u8 = 0x73;
    const SIZING: PacketSizing = PacketSizing::Fixed(2);
    const DESCRIPTION: &'static str = "Ping";
}

/// In-game season.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    #[default]
    Spring = 0,
    Summer = 1,
    Winter = 2,
    Autumn = 3,
    Desolation = 4,
}

impl TryFrom<u8> for Season {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Season::Spring),
            1 => Ok(Season::Summer),
            2 => Ok(Season::Winter),
            3 => Ok(Season::Autumn),
            4 => Ok(Season::Desolation),
            other => Err(ProtocolError::MalformedPacket {
                opcode: SeasonChange::OPCODE,
                reason: format!("unknown season {other}"),
            }),
        }
    }
}

/// Season switch, travels both directions.
///
/// Wire form: `[0xBC][season:u8][play_sound:u8]`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeasonChange {
    pub season: Season,
    pub play_sound: bool,
}

impl Packet for SeasonChange {
    fn opcode(&self) -> u8 {
        Self::OPCODE
    }

    fn decode(&mut self, reader: &mut PacketReader<'_>) -> Result<()> {
        self.season = Season::try_from(reader.read_u8()?)?;
        self.play_sound = reader.read_bool()?;
        Ok(())
    }

    fn encode(&self, writer: &mut PacketWriter) -> Result<()> {
        writer.write_u8(Self::OPCODE)?;
        writer.write_u8(self.season as u8)?;
        writer.write_bool(self.play_sound)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RegisteredPacket for SeasonChange {
    const OPCODE: u8 = 0xBC;
    const SIZING: PacketSizing = PacketSizing::Fixed(3);
    const DESCRIPTION: &'static str = "Season Change";
}

/// Player speech with a UTF-16 body and language tag.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnicodeSpeech {
    pub mode: u8,
    pub hue: u16,
    pub font: u16,
    pub language: String,
    pub text: String,
}

impl Packet for UnicodeSpeech {
    fn opcode(&self) -> u8 {
        Self::OPCODE
    }

    fn decode(&mut self, reader: &mut PacketReader<'_>) -> Result<()> {
        self.mode = reader.read_u8()?;
        self.hue = reader.read_u16()?;
        self.font = reader.read_u16()?;
        self.language = reader.read_ascii_fixed(4)?;
        self.text = reader.read_utf16_be_null()?;
        Ok(())
    }

    fn encode(&self, writer: &mut PacketWriter) -> Result<()> {
        writer.begin_variable(Self::OPCODE)?;
        writer.write_u8(self.mode)?;
        writer.write_u16(self.hue)?;
        writer.write_u16(self.font)?;
        writer.write_ascii_fixed(&self.language, 4)?;
        writer.write_utf16_be_null(&self.text)?;
        writer.finish_variable()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RegisteredPacket for UnicodeSpeech {
    const OPCODE: u8 = 0xAD;
    const SIZING: PacketSizing = PacketSizing::Variable;
    const DESCRIPTION: &'static str = "Unicode Speech";
}

/// Register every packet type this crate ships. A duplicate opcode fails the
/// whole registration.
pub fn register_defaults(registry: &mut PacketRegistry) -> Result<()> {
    registry.register::<LoginSeed>()?;
    registry.register::<AccountLogin>()?;
    registry.register::<Ping>()?;
    registry.register::<SeasonChange>()?;
    registry.register::<UnicodeSpeech>()?;
    Ok(())
}
