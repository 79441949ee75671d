//! Integration tests for the binary cursor.
//!
//! These cover the wire-format laws packets rely on: big-endian defaults,
//! the explicit little-endian API, every string shape, the two-pass length
//! patch, and the ownership-transfer semantics of pooled writers.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use shardnet::core::{PacketReader, PacketWriter};
use shardnet::error::ProtocolError;
use shardnet::protocol::packets::{Season, SeasonChange, UnicodeSpeech};
use shardnet::protocol::registry::Packet;
use shardnet::utils::buffer_pool::BufferPool;
use std::io::SeekFrom;

#[test]
fn test_primitives_round_trip_mixed_endian() {
    let mut w = PacketWriter::with_capacity(64);
    w.write_u8(0x7F).expect("u8");
    w.write_i8(-2).expect("i8");
    w.write_u16(0xBEEF).expect("u16");
    w.write_i32(-123_456).expect("i32");
    w.write_u64(0x0102_0304_0506_0708).expect("u64");
    w.write_u16_le(0xBEEF).expect("u16 le");
    w.write_u32_le(0xCAFEBABE).expect("u32 le");

    let bytes = w.into_bytes();
    let mut r = PacketReader::new(&bytes);
    assert_eq!(r.read_u8().unwrap(), 0x7F);
    assert_eq!(r.read_i8().unwrap(), -2);
    assert_eq!(r.read_u16().unwrap(), 0xBEEF);
    assert_eq!(r.read_i32().unwrap(), -123_456);
    assert_eq!(r.read_u64().unwrap(), 0x0102_0304_0506_0708);
    assert_eq!(r.read_u16_le().unwrap(), 0xBEEF);
    assert_eq!(r.read_u32_le().unwrap(), 0xCAFEBABE);
    assert_eq!(r.remaining(), 0);
}

#[test]
fn test_big_endian_is_the_default_wire_order() {
    let mut w = PacketWriter::with_capacity(4);
    w.write_u32(0x11223344).unwrap();
    assert_eq!(w.as_slice(), &[0x11, 0x22, 0x33, 0x44]);
}

#[test]
fn test_season_vector_encodes_to_exact_bytes() {
    let packet = SeasonChange {
        season: Season::Winter,
        play_sound: true,
    };

    let mut w = PacketWriter::with_capacity(4);
    packet.encode(&mut w).expect("encode");
    assert_eq!(w.as_slice(), &[0xBC, 0x02, 0x01]);

    // Decoding those exact bytes recovers the fields.
    let mut decoded = SeasonChange::default();
    let mut r = PacketReader::new(&[0xBC, 0x02, 0x01]);
    r.skip(1).unwrap();
    decoded.decode(&mut r).expect("decode");
    assert_eq!(decoded, packet);
}

#[test]
fn test_unicode_speech_round_trip() {
    let packet = UnicodeSpeech {
        mode: 0,
        hue: 0x0035,
        font: 3,
        language: "ENU".to_string(),
        text: "an corp ✓".to_string(),
    };

    let mut w = PacketWriter::with_capacity(64);
    packet.encode(&mut w).expect("encode");
    let bytes = w.into_bytes();

    // Self-inclusive length: opcode + length field + payload.
    let declared = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
    assert_eq!(declared, bytes.len());

    let mut decoded = UnicodeSpeech::default();
    let mut r = PacketReader::new(&bytes);
    r.skip(3).unwrap();
    decoded.decode(&mut r).expect("decode");
    assert_eq!(decoded, packet);
}

#[test]
fn test_null_terminated_strings_consume_terminator() {
    let mut w = PacketWriter::with_capacity(64);
    w.write_ascii_null("first").unwrap();
    w.write_utf8_null("second✓").unwrap();
    w.write_utf16_le_null("third").unwrap();
    let bytes = w.into_bytes();

    let mut r = PacketReader::new(&bytes);
    assert_eq!(r.read_ascii_null().unwrap(), "first");
    assert_eq!(r.read_utf8_null().unwrap(), "second✓");
    assert_eq!(r.read_utf16_le_null().unwrap(), "third");
    assert_eq!(r.remaining(), 0);
}

#[test]
fn test_fixed_width_fields_are_exact() {
    let mut w = PacketWriter::with_capacity(64);
    w.write_ascii_fixed("user", 30).unwrap();
    w.write_utf8_fixed("né", 8).unwrap();
    w.write_utf16_le_fixed("hi", 10).unwrap();
    let bytes = w.into_bytes();
    assert_eq!(bytes.len(), 30 + 8 + 10);

    let mut r = PacketReader::new(&bytes);
    assert_eq!(r.read_ascii_fixed(30).unwrap(), "user");
    assert_eq!(r.read_utf8_fixed(8).unwrap(), "né");
    assert_eq!(r.read_utf16_le_fixed(10).unwrap(), "hi");
}

#[test]
fn test_utf8_fixed_truncates_at_character_boundary() {
    let mut w = PacketWriter::with_capacity(8);
    // 'é' is two bytes; a 4-byte field cannot hold "abcé" without splitting it.
    w.write_utf8_fixed("abcé", 4).unwrap();
    let bytes = w.into_bytes();
    assert_eq!(&bytes, b"abc\0");

    let mut r = PacketReader::new(&bytes);
    assert_eq!(r.read_utf8_fixed(4).unwrap(), "abc");
}

#[test]
fn test_two_pass_length_patch() {
    let mut w = PacketWriter::with_capacity(32);
    w.begin_variable(0xB0).unwrap();
    w.write_u32(0xAABBCCDD).unwrap();
    w.write_ascii_null("body").unwrap();
    w.finish_variable().unwrap();

    let bytes = w.into_bytes();
    let declared = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
    assert_eq!(declared, bytes.len());
    assert_eq!(bytes.len(), 3 + 4 + 5);
    // Cursor returned to the end after the patch.
    assert_eq!(bytes[0], 0xB0);
}

#[test]
fn test_seek_relative_to_start_current_and_end() {
    let mut w = PacketWriter::with_capacity(16);
    w.write_slice(&[1, 2, 3, 4, 5, 6]).unwrap();

    w.seek(SeekFrom::Start(2)).unwrap();
    w.write_u8(0xAA).unwrap();

    w.seek(SeekFrom::Current(1)).unwrap();
    w.write_u8(0xBB).unwrap();

    w.seek(SeekFrom::End(-1)).unwrap();
    w.write_u8(0xCC).unwrap();

    assert_eq!(w.as_slice(), &[1, 2, 0xAA, 4, 0xBB, 0xCC]);
}

#[test]
fn test_capped_writer_reports_capacity_error() {
    let mut w = PacketWriter::with_capacity(8).fixed_capacity();
    w.write_u64(0).unwrap();
    match w.write_u8(0) {
        Err(ProtocolError::CapacityExceeded { needed, capacity }) => {
            assert_eq!(needed, 9);
            assert_eq!(capacity, 8);
        }
        other => panic!("expected capacity error, got {other:?}"),
    }
}

#[test]
fn test_reader_reports_remaining_and_fails_short() {
    let bytes = [0u8; 6];
    let mut r = PacketReader::new(&bytes);
    assert_eq!(r.remaining(), 6);
    r.read_u32().unwrap();
    assert_eq!(r.remaining(), 2);

    match r.read_u32() {
        Err(ProtocolError::ShortBuffer { needed, available }) => {
            assert_eq!(needed, 4);
            assert_eq!(available, 2);
        }
        other => panic!("expected short-buffer error, got {other:?}"),
    }
    // Failed read consumed nothing.
    assert_eq!(r.remaining(), 2);
}

#[test]
fn test_pooled_ownership_transfer_is_single_owner() {
    let pool = BufferPool::new(2);
    let before = pool.available();

    let mut w = PacketWriter::from_pool(&pool, 256);
    w.write_ascii_null("pooled").unwrap();

    // Move: the pool permanently loses custody of this storage.
    let owned = w.into_bytes();
    assert_eq!(&owned[..6], b"pooled");
    assert_eq!(pool.available(), before - 1);

    // A dropped writer, by contrast, returns its rent.
    let w2 = PacketWriter::from_pool(&pool, 256);
    assert_eq!(pool.available(), before - 2);
    drop(w2);
    assert_eq!(pool.available(), before - 1);
}
