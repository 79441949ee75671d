//! Chaos tests for the framing core.
//!
//! The framer's contract is that byte-stream fragmentation is invisible:
//! however TCP slices the stream, the same frames come out in the same
//! order. These tests hammer that contract with randomized fragmentation,
//! garbage interleaving, and many concurrent sessions.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::BytesMut;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shardnet::config::ProtocolLimits;
use shardnet::protocol::framer::{SessionFramer, SessionId};
use shardnet::protocol::packets::{self, Ping, SeasonChange, UnicodeSpeech};
use shardnet::protocol::registry::{Packet, PacketRegistry};
use shardnet::PacketWriter;
use std::sync::Arc;

fn default_registry() -> Arc<PacketRegistry> {
    let mut registry = PacketRegistry::new();
    packets::register_defaults(&mut registry).expect("registration");
    Arc::new(registry)
}

const SEED_BYTES: [u8; 4] = [0x12, 0x34, 0x56, 0x78];

/// A stream of `count` frames cycling through every sizing shape, preceded by
/// the handshake seed. Returns the raw bytes and the expected sequence of
/// (opcode, marker) pairs.
fn build_stream(count: usize) -> (Vec<u8>, Vec<(u8, u8)>) {
    let mut bytes = SEED_BYTES.to_vec();
    let mut expected = Vec::with_capacity(count);

    for i in 0..count {
        let marker = (i % 251) as u8;
        match i % 3 {
            0 => {
                bytes.extend_from_slice(&[0x73, marker]);
                expected.push((0x73, marker));
            }
            1 => {
                bytes.extend_from_slice(&[0xBC, (marker % 5), 0x01]);
                expected.push((0xBC, marker % 5));
            }
            _ => {
                let speech = UnicodeSpeech {
                    mode: marker,
                    hue: 0x0035,
                    font: 3,
                    language: "ENU".to_string(),
                    text: format!("kal vas {i}"),
                };
                let mut w = PacketWriter::with_capacity(64);
                speech.encode(&mut w).unwrap();
                bytes.extend_from_slice(&w.into_bytes());
                expected.push((0xAD, marker));
            }
        }
    }

    (bytes, expected)
}

/// Extract (opcode, marker) from a decoded packet for comparison against
/// [`build_stream`]'s expectations.
fn fingerprint(packet: &dyn Packet) -> (u8, u8) {
    if let Some(ping) = packet.as_any().downcast_ref::<Ping>() {
        (0x73, ping.sequence)
    } else if let Some(season) = packet.as_any().downcast_ref::<SeasonChange>() {
        (0xBC, season.season as u8)
    } else if let Some(speech) = packet.as_any().downcast_ref::<UnicodeSpeech>() {
        (0xAD, speech.mode)
    } else {
        panic!("unexpected packet type: {packet:?}");
    }
}

/// Feed `bytes` into a fresh framer in random-sized chunks, returning every
/// decoded frame in order. Fatal framer errors fail the test.
fn run_fragmented(bytes: &[u8], rng: &mut StdRng, limits: ProtocolLimits) -> Vec<(u8, u8)> {
    let mut framer = SessionFramer::new(SessionId(99), default_registry(), limits);
    let mut buf = BytesMut::new();
    let mut parsed = Vec::new();

    let mut offset = 0;
    while offset < bytes.len() {
        let chunk = rng.random_range(1..=16.min(bytes.len() - offset));
        buf.extend_from_slice(&bytes[offset..offset + chunk]);
        offset += chunk;

        while let Some(packet) = framer.advance(&mut buf).expect("advance") {
            parsed.push(fingerprint(packet.as_ref()));
        }
    }

    parsed
}

#[test]
fn test_random_fragmentation_is_invisible() {
    let (bytes, expected) = build_stream(150);

    // Many fragmentation patterns of the same stream, all equivalent.
    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let parsed = run_fragmented(&bytes, &mut rng, ProtocolLimits::default());
        assert_eq!(parsed, expected, "rng seed {seed}");
    }
}

#[test]
fn test_garbage_between_frames_never_stalls_the_stream() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut bytes = SEED_BYTES.to_vec();
    let mut expected = Vec::new();

    // Valid frames with bursts of unregistered opcodes between them. The
    // budget is raised so resynchronization, not disconnection, is on trial.
    for i in 0..100u8 {
        for _ in 0..rng.random_range(0..6) {
            bytes.push(rng.random_range(0x01..0x10));
        }
        bytes.extend_from_slice(&[0x73, i]);
        expected.push((0x73, i));
    }

    let limits = ProtocolLimits {
        max_violations_per_session: u32::MAX,
        ..ProtocolLimits::default()
    };
    let parsed = run_fragmented(&bytes, &mut rng, limits);
    assert_eq!(parsed, expected);
}

#[test]
fn test_truncated_tail_loses_only_the_final_frame() {
    let (bytes, expected) = build_stream(30);
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..10 {
        // Cut somewhere inside the last speech frame.
        let cut = rng.random_range(bytes.len() - 8..bytes.len());
        let parsed = run_fragmented(&bytes[..cut], &mut rng, ProtocolLimits::default());
        assert!(parsed.len() >= expected.len() - 1);
        assert_eq!(&parsed[..], &expected[..parsed.len()]);
    }
}

#[tokio::test]
async fn test_many_concurrent_sessions_stay_isolated() {
    let registry = default_registry();
    let (bytes, expected) = build_stream(60);
    let bytes = Arc::new(bytes);
    let expected = Arc::new(expected);

    let mut handles = Vec::new();
    for n in 0..32u64 {
        let registry = registry.clone();
        let bytes = bytes.clone();
        let expected = expected.clone();

        handles.push(tokio::spawn(async move {
            let mut framer =
                SessionFramer::new(SessionId(n), registry, ProtocolLimits::default());
            let mut rng = StdRng::seed_from_u64(n);
            let mut buf = BytesMut::new();
            let mut parsed = Vec::new();

            let mut offset = 0;
            while offset < bytes.len() {
                let chunk = rng.random_range(1..=32.min(bytes.len() - offset));
                buf.extend_from_slice(&bytes[offset..offset + chunk]);
                offset += chunk;

                while let Some(packet) = framer.advance(&mut buf).expect("advance") {
                    parsed.push(fingerprint(packet.as_ref()));
                }
            }

            assert_eq!(&parsed, expected.as_ref());
            assert_eq!(framer.stats().violations, 0);
        }));
    }

    for result in futures::future::join_all(handles).await {
        result.expect("session task");
    }
}
