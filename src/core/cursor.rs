//! Binary cursor over a growable byte buffer.
//!
//! `PacketWriter` and `PacketReader` are the two halves of the legacy wire
//! codec. The writer owns its storage (fresh, caller-supplied, or rented from
//! a [`BufferPool`]) and supports seeking, which packet encoders use to patch
//! a length field after the payload is known. The reader borrows a frame and
//! never panics on short input; every read is bounds-checked and returns a
//! `ProtocolError` on failure.
//!
//! Integer fields default to big-endian. A parallel `_le` API covers the
//! handful of legacy fields that are little-endian on the wire.

use crate::error::{ProtocolError, Result};
use crate::utils::buffer_pool::BufferPool;
use std::io::SeekFrom;

/// Writer half of the binary cursor.
///
/// Storage rented from a pool is returned automatically when the writer is
/// dropped. Converting the contents to a caller-owned buffer with
/// [`into_bytes`](PacketWriter::into_bytes) is a move: it consumes the writer,
/// so the storage can never be referenced or released twice. Use
/// [`to_vec`](PacketWriter::to_vec) when an independent copy is needed and the
/// writer should keep its storage.
#[derive(Debug)]
pub struct PacketWriter {
    buf: Vec<u8>,
    pos: usize,
    growable: bool,
    pool: Option<BufferPool>,
    var_start: Option<usize>,
}

impl PacketWriter {
    /// Create a growable writer with the given initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            pos: 0,
            growable: true,
            pool: None,
            var_start: None,
        }
    }

    /// Create a writer over caller-supplied storage. Existing bytes are kept;
    /// the cursor starts at the end of them.
    pub fn from_vec(buf: Vec<u8>) -> Self {
        let pos = buf.len();
        Self {
            buf,
            pos,
            growable: true,
            pool: None,
            var_start: None,
        }
    }

    /// Rent storage from a pool. The storage returns to the pool when the
    /// writer is dropped, unless ownership is transferred with `into_bytes`.
    pub fn from_pool(pool: &BufferPool, capacity: usize) -> Self {
        Self {
            buf: pool.take(capacity),
            pos: 0,
            growable: true,
            pool: Some(pool.clone()),
            var_start: None,
        }
    }

    /// Disable auto-grow: writes past the current capacity fail with
    /// `CapacityExceeded` instead of reallocating.
    pub fn fixed_capacity(mut self) -> Self {
        self.growable = false;
        self
    }

    /// Number of bytes written so far (the logical frame length).
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Current storage capacity.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// View the written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Transfer ownership of the written bytes to the caller.
    ///
    /// This is a move, not a copy: the writer is consumed and pool-rented
    /// storage is detached from the pool, so nothing else can release or
    /// reuse it.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.pool = None;
        std::mem::take(&mut self.buf)
    }

    /// Copy the written bytes into an independent, non-pool-tracked buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.clone()
    }

    fn ensure_capacity(&mut self, needed: usize) -> Result<()> {
        let capacity = self.buf.capacity();
        if needed <= capacity {
            return Ok(());
        }
        if !self.growable {
            return Err(ProtocolError::CapacityExceeded { needed, capacity });
        }
        let target = needed.max(capacity * 2);
        self.buf.reserve(target - self.buf.len());
        Ok(())
    }

    /// Write raw bytes at the cursor, growing the logical length as needed.
    pub fn write_slice(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.pos + bytes.len();
        self.ensure_capacity(end)?;
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    /// Move the cursor. Seeking past the logical end zero-fills the gap when
    /// growth is enabled and fails with `CapacityExceeded` when it is not.
    pub fn seek(&mut self, from: SeekFrom) -> Result<usize> {
        let target = match from {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::Current(d) => self.pos as i64 + d,
            SeekFrom::End(d) => self.buf.len() as i64 + d,
        };
        if target < 0 {
            return Err(ProtocolError::SeekOutOfBounds {
                target,
                len: self.buf.len(),
            });
        }
        let target = target as usize;
        if target > self.buf.len() {
            self.ensure_capacity(target)?;
            self.buf.resize(target, 0);
        }
        self.pos = target;
        Ok(target)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_slice(&[value])
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_slice(&[value as u8])
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_slice(&value.to_be_bytes())
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_slice(&value.to_be_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_slice(&value.to_be_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_slice(&value.to_be_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_slice(&value.to_be_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_slice(&value.to_be_bytes())
    }

    pub fn write_u16_le(&mut self, value: u16) -> Result<()> {
        self.write_slice(&value.to_le_bytes())
    }

    pub fn write_i16_le(&mut self, value: i16) -> Result<()> {
        self.write_slice(&value.to_le_bytes())
    }

    pub fn write_u32_le(&mut self, value: u32) -> Result<()> {
        self.write_slice(&value.to_le_bytes())
    }

    pub fn write_i32_le(&mut self, value: i32) -> Result<()> {
        self.write_slice(&value.to_le_bytes())
    }

    pub fn write_u64_le(&mut self, value: u64) -> Result<()> {
        self.write_slice(&value.to_le_bytes())
    }

    pub fn write_i64_le(&mut self, value: i64) -> Result<()> {
        self.write_slice(&value.to_le_bytes())
    }

    /// ASCII string followed by a single zero terminator. Characters outside
    /// the ASCII range are replaced with `?`, as the legacy protocol expects.
    pub fn write_ascii_null(&mut self, value: &str) -> Result<()> {
        for c in value.chars() {
            self.write_u8(ascii_byte(c))?;
        }
        self.write_u8(0)
    }

    /// ASCII string in an exact field of `len` bytes, zero-padded or truncated.
    pub fn write_ascii_fixed(&mut self, value: &str, len: usize) -> Result<()> {
        let mut written = 0;
        for c in value.chars().take(len) {
            self.write_u8(ascii_byte(c))?;
            written += 1;
        }
        self.write_zeros(len - written)
    }

    /// UTF-8 string followed by a single zero terminator.
    pub fn write_utf8_null(&mut self, value: &str) -> Result<()> {
        self.write_slice(value.as_bytes())?;
        self.write_u8(0)
    }

    /// UTF-8 string in an exact field of `len` bytes, zero-padded; truncation
    /// happens at a character boundary so the field never holds a split
    /// code point.
    pub fn write_utf8_fixed(&mut self, value: &str, len: usize) -> Result<()> {
        let bytes = value.as_bytes();
        let cut = if bytes.len() <= len {
            bytes.len()
        } else {
            let mut cut = len;
            while cut > 0 && !value.is_char_boundary(cut) {
                cut -= 1;
            }
            cut
        };
        self.write_slice(&bytes[..cut])?;
        self.write_zeros(len - cut)
    }

    /// UTF-16 big-endian string followed by a two-byte zero terminator.
    pub fn write_utf16_be_null(&mut self, value: &str) -> Result<()> {
        for unit in value.encode_utf16() {
            self.write_u16(unit)?;
        }
        self.write_u16(0)
    }

    /// UTF-16 little-endian string followed by a two-byte zero terminator.
    pub fn write_utf16_le_null(&mut self, value: &str) -> Result<()> {
        for unit in value.encode_utf16() {
            self.write_u16_le(unit)?;
        }
        self.write_u16_le(0)
    }

    /// UTF-16 big-endian string in an exact field of `len` bytes, zero-padded
    /// or truncated at a code-unit boundary.
    pub fn write_utf16_be_fixed(&mut self, value: &str, len: usize) -> Result<()> {
        let mut written = 0;
        for unit in value.encode_utf16() {
            if written + 2 > len {
                break;
            }
            self.write_u16(unit)?;
            written += 2;
        }
        self.write_zeros(len - written)
    }

    /// UTF-16 little-endian string in an exact field of `len` bytes.
    pub fn write_utf16_le_fixed(&mut self, value: &str, len: usize) -> Result<()> {
        let mut written = 0;
        for unit in value.encode_utf16() {
            if written + 2 > len {
                break;
            }
            self.write_u16_le(unit)?;
            written += 2;
        }
        self.write_zeros(len - written)
    }

    fn write_zeros(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.write_u8(0)?;
        }
        Ok(())
    }

    /// Start a variable-length frame: writes the opcode and a two-byte length
    /// placeholder. Finish with [`finish_variable`](PacketWriter::finish_variable).
    pub fn begin_variable(&mut self, opcode: u8) -> Result<()> {
        if self.var_start.is_some() {
            return Err(ProtocolError::Custom(
                "variable frame already in progress".to_string(),
            ));
        }
        self.var_start = Some(self.pos);
        self.write_u8(opcode)?;
        self.write_u16(0)
    }

    /// Patch the length field of the frame opened by `begin_variable` with the
    /// final self-inclusive byte count, then return the cursor to the end.
    pub fn finish_variable(&mut self) -> Result<()> {
        let start = self.var_start.take().ok_or_else(|| {
            ProtocolError::Custom("no variable frame in progress".to_string())
        })?;
        let total = self.buf.len() - start;
        if total > u16::MAX as usize {
            return Err(ProtocolError::Custom(format!(
                "variable frame too large: {total} bytes"
            )));
        }
        self.seek(SeekFrom::Start(start as u64 + 1))?;
        self.write_u16(total as u16)?;
        self.seek(SeekFrom::End(0))?;
        Ok(())
    }
}

impl Drop for PacketWriter {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(std::mem::take(&mut self.buf));
        }
    }
}

fn ascii_byte(c: char) -> u8 {
    if c.is_ascii() {
        c as u8
    } else {
        b'?'
    }
}

fn ascii_char(b: u8) -> char {
    if b.is_ascii() {
        b as char
    } else {
        '?'
    }
}

/// Reader half of the binary cursor: bounds-checked decoding over a borrowed
/// frame. Short buffers and invalid string data fail with an error; nothing
/// here panics on malformed input.
#[derive(Debug)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Total frame length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Advance past `count` bytes without interpreting them.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(ProtocolError::ShortBuffer {
                needed: count,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    /// Borrow `count` raw bytes from the frame.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.take(count)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(i64::from_be_bytes(raw))
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_i16_le(&mut self) -> Result<i16> {
        let b = self.take(2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }

    pub fn read_i64_le(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(i64::from_le_bytes(raw))
    }

    /// ASCII string terminated by a zero byte, or by the end of the frame.
    /// The terminator is consumed. Non-ASCII bytes decode as `?`.
    pub fn read_ascii_null(&mut self) -> Result<String> {
        let mut out = String::new();
        while self.remaining() > 0 {
            let b = self.take(1)?[0];
            if b == 0 {
                break;
            }
            out.push(ascii_char(b));
        }
        Ok(out)
    }

    /// ASCII string in an exact field of `len` bytes; trailing zero padding
    /// is stripped.
    pub fn read_ascii_fixed(&mut self, len: usize) -> Result<String> {
        let raw = self.take(len)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(raw[..end].iter().map(|&b| ascii_char(b)).collect())
    }

    /// UTF-8 string terminated by a zero byte, or by the end of the frame.
    pub fn read_utf8_null(&mut self) -> Result<String> {
        let start = self.pos;
        let end = self.buf[start..]
            .iter()
            .position(|&b| b == 0)
            .map(|i| start + i)
            .unwrap_or(self.buf.len());
        let raw = &self.buf[start..end];
        // Consume the terminator when present.
        self.pos = (end + 1).min(self.buf.len());
        String::from_utf8(raw.to_vec())
            .map_err(|_| ProtocolError::InvalidString { encoding: "UTF-8" })
    }

    /// UTF-8 string in an exact field of `len` bytes.
    pub fn read_utf8_fixed(&mut self, len: usize) -> Result<String> {
        let raw = self.take(len)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8(raw[..end].to_vec())
            .map_err(|_| ProtocolError::InvalidString { encoding: "UTF-8" })
    }

    /// UTF-16 big-endian string terminated by a zero unit, or by the end of
    /// the frame. A trailing odd byte ends the string.
    pub fn read_utf16_be_null(&mut self) -> Result<String> {
        self.read_utf16_null(u16::from_be_bytes)
    }

    /// UTF-16 little-endian string terminated by a zero unit.
    pub fn read_utf16_le_null(&mut self) -> Result<String> {
        self.read_utf16_null(u16::from_le_bytes)
    }

    /// UTF-16 big-endian string in an exact field of `len` bytes; trailing
    /// zero units are stripped.
    pub fn read_utf16_be_fixed(&mut self, len: usize) -> Result<String> {
        self.read_utf16_fixed(len, u16::from_be_bytes)
    }

    /// UTF-16 little-endian string in an exact field of `len` bytes.
    pub fn read_utf16_le_fixed(&mut self, len: usize) -> Result<String> {
        self.read_utf16_fixed(len, u16::from_le_bytes)
    }

    fn read_utf16_null(&mut self, decode: fn([u8; 2]) -> u16) -> Result<String> {
        let mut units = Vec::new();
        while self.remaining() >= 2 {
            let b = self.take(2)?;
            let unit = decode([b[0], b[1]]);
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        String::from_utf16(&units)
            .map_err(|_| ProtocolError::InvalidString { encoding: "UTF-16" })
    }

    fn read_utf16_fixed(&mut self, len: usize, decode: fn([u8; 2]) -> u16) -> Result<String> {
        let raw = self.take(len)?;
        let mut units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| decode([pair[0], pair[1]]))
            .collect();
        while units.last() == Some(&0) {
            units.pop();
        }
        String::from_utf16(&units)
            .map_err(|_| ProtocolError::InvalidString { encoding: "UTF-16" })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn writes_default_to_big_endian() {
        let mut w = PacketWriter::with_capacity(16);
        w.write_u16(0x1234).unwrap();
        w.write_u32(0xDEADBEEF).unwrap();
        assert_eq!(w.as_slice(), &[0x12, 0x34, 0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn little_endian_variants_flip_byte_order() {
        let mut w = PacketWriter::with_capacity(16);
        w.write_u16_le(0x1234).unwrap();
        w.write_u32_le(0xDEADBEEF).unwrap();
        assert_eq!(w.as_slice(), &[0x34, 0x12, 0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn fixed_capacity_writer_fails_instead_of_growing() {
        let mut w = PacketWriter::with_capacity(4).fixed_capacity();
        w.write_u32(1).unwrap();
        let err = w.write_u8(0).unwrap_err();
        assert!(matches!(err, ProtocolError::CapacityExceeded { .. }));
    }

    #[test]
    fn growth_doubles_capacity_at_minimum() {
        let mut w = PacketWriter::with_capacity(8);
        w.write_u64(0).unwrap();
        w.write_u8(1).unwrap();
        assert!(w.capacity() >= 16);
    }

    #[test]
    fn seek_back_and_patch() {
        let mut w = PacketWriter::with_capacity(8);
        w.write_u16(0).unwrap();
        w.write_u32(0xAABBCCDD).unwrap();
        w.seek(SeekFrom::Start(0)).unwrap();
        w.write_u16(6).unwrap();
        w.seek(SeekFrom::End(0)).unwrap();
        assert_eq!(w.as_slice(), &[0x00, 0x06, 0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(w.position(), 6);
    }

    #[test]
    fn seek_before_start_fails() {
        let mut w = PacketWriter::with_capacity(4);
        let err = w.seek(SeekFrom::Current(-1)).unwrap_err();
        assert!(matches!(err, ProtocolError::SeekOutOfBounds { .. }));
    }

    #[test]
    fn variable_frame_length_is_self_inclusive() {
        let mut w = PacketWriter::with_capacity(16);
        w.begin_variable(0xAD).unwrap();
        w.write_slice(&[1, 2, 3, 4, 5]).unwrap();
        w.finish_variable().unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes[0], 0xAD);
        assert_eq!(u16::from_be_bytes([bytes[1], bytes[2]]), 8);
        assert_eq!(bytes.len(), 8);
    }

    #[test]
    fn reader_fails_cleanly_on_short_buffer() {
        let mut r = PacketReader::new(&[0x01, 0x02]);
        assert_eq!(r.read_u8().unwrap(), 1);
        let err = r.read_u32().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::ShortBuffer {
                needed: 4,
                available: 1
            }
        ));
    }

    #[test]
    fn ascii_fixed_round_trip_pads_and_truncates() {
        let mut w = PacketWriter::with_capacity(16);
        w.write_ascii_fixed("abc", 6).unwrap();
        w.write_ascii_fixed("toolong", 4).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(&bytes, b"abc\0\0\0tool");

        let mut r = PacketReader::new(&bytes);
        assert_eq!(r.read_ascii_fixed(6).unwrap(), "abc");
        assert_eq!(r.read_ascii_fixed(4).unwrap(), "tool");
    }

    #[test]
    fn non_ascii_characters_become_question_marks() {
        let mut w = PacketWriter::with_capacity(8);
        w.write_ascii_null("héllo").unwrap();
        let bytes = w.into_bytes();
        assert_eq!(&bytes, b"h?llo\0");
    }

    #[test]
    fn non_ascii_bytes_decode_as_question_marks() {
        let mut r = PacketReader::new(&[b'h', 0xFF, b'i', 0x00]);
        assert_eq!(r.read_ascii_null().unwrap(), "h?i");

        let mut r = PacketReader::new(&[0xC3, b'o', b'k', 0x00, 0x00]);
        assert_eq!(r.read_ascii_fixed(5).unwrap(), "?ok");
    }

    #[test]
    fn utf16_null_round_trip_both_orders() {
        let mut w = PacketWriter::with_capacity(32);
        w.write_utf16_be_null("hi✓").unwrap();
        w.write_utf16_le_null("hi✓").unwrap();
        let bytes = w.into_bytes();

        let mut r = PacketReader::new(&bytes);
        assert_eq!(r.read_utf16_be_null().unwrap(), "hi✓");
        assert_eq!(r.read_utf16_le_null().unwrap(), "hi✓");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn utf16_fixed_field_is_exact_width() {
        let mut w = PacketWriter::with_capacity(16);
        w.write_utf16_be_fixed("ab", 8).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &[0x00, b'a', 0x00, b'b']);

        let mut r = PacketReader::new(&bytes);
        assert_eq!(r.read_utf16_be_fixed(8).unwrap(), "ab");
    }

    #[test]
    fn invalid_utf8_is_rejected_not_panicked() {
        let mut r = PacketReader::new(&[0xFF, 0xFE, 0x00]);
        let err = r.read_utf8_null().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidString { encoding: "UTF-8" }
        ));
    }

    #[test]
    fn into_bytes_is_a_move_to_vec_is_a_copy() {
        let mut w = PacketWriter::with_capacity(8);
        w.write_u32(7).unwrap();

        let copy = w.to_vec();
        assert_eq!(copy, w.as_slice());

        let moved = w.into_bytes();
        assert_eq!(moved, copy);
        // `w` no longer exists; the storage has exactly one owner.
    }

    #[test]
    fn pooled_storage_returns_on_drop_but_not_after_move() {
        let pool = BufferPool::new(1);
        assert_eq!(pool.available(), 1);

        {
            let mut w = PacketWriter::from_pool(&pool, 64);
            assert_eq!(pool.available(), 0);
            w.write_u8(1).unwrap();
        }
        // Dropped without transfer: storage is back in the pool.
        assert_eq!(pool.available(), 1);

        let mut w = PacketWriter::from_pool(&pool, 64);
        w.write_u8(2).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes, vec![2]);
        // Ownership moved to the caller: the pool never sees it again.
        assert_eq!(pool.available(), 0);
    }
}
