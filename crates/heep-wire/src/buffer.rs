// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Byte-buffer primitives, a bounds-checked read cursor and a bounded packet writer.
// Author: Lukas Bower

//! Flat byte-buffer primitives used by every HEEP component.

use crate::WireError;

/// Widest big-endian integer the protocol carries.
const MAX_INT_WIDTH: usize = 4;

/// Append `bytes` to a length-tracked buffer that may not grow beyond `capacity`.
///
/// Returns the new length of the buffer.
pub fn append(buffer: &mut Vec<u8>, capacity: usize, bytes: &[u8]) -> Result<usize, WireError> {
    let needed = buffer.len() + bytes.len();
    if needed > capacity {
        return Err(WireError::Overflow { needed, capacity });
    }
    buffer.extend_from_slice(bytes);
    Ok(buffer.len())
}

/// Read a `width`-byte big-endian integer at `pos`.
///
/// Returns the value together with the position just past it.
pub fn read_be(buffer: &[u8], pos: usize, width: usize) -> Result<(u32, usize), WireError> {
    if width > MAX_INT_WIDTH {
        return Err(WireError::ValueTooWide(width));
    }
    let end = pos.checked_add(width).ok_or(WireError::Truncated)?;
    let bytes = buffer.get(pos..end).ok_or(WireError::Truncated)?;
    let value = bytes
        .iter()
        .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));
    Ok((value, end))
}

/// Compare the first `len` bytes of two buffers.
///
/// A buffer shorter than `len` never compares equal.
#[must_use]
pub fn buffers_equal(left: &[u8], right: &[u8], len: usize) -> bool {
    match (left.get(..len), right.get(..len)) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

/// Bounds-checked read cursor over an immutable packet.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Start reading at the beginning of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Start reading at `pos`.
    #[must_use]
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Current read position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Everything not yet read.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        self.buf.get(self.pos..).unwrap_or(&[])
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        let byte = *self.buf.get(self.pos).ok_or(WireError::Truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read a two-byte big-endian integer.
    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        let (value, pos) = read_be(self.buf, self.pos, 2)?;
        self.pos = pos;
        // read_be over two bytes never exceeds u16::MAX
        Ok(value as u16)
    }

    /// Read a `width`-byte big-endian integer.
    pub fn read_be(&mut self, width: usize) -> Result<u32, WireError> {
        let (value, pos) = read_be(self.buf, self.pos, width)?;
        self.pos = pos;
        Ok(value)
    }

    /// Borrow the next `len` bytes.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(len).ok_or(WireError::Truncated)?;
        let bytes = self.buf.get(self.pos..end).ok_or(WireError::Truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    /// Copy the next `N` bytes into a fixed array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }
}

/// Writer that fills an output buffer without exceeding a fixed limit.
///
/// Creating a writer clears the buffer; a response is always written from
/// scratch.
#[derive(Debug)]
pub struct PacketWriter<'a> {
    buf: &'a mut Vec<u8>,
    limit: usize,
}

impl<'a> PacketWriter<'a> {
    /// Clear `buf` and prepare to write at most `limit` bytes into it.
    pub fn new(buf: &'a mut Vec<u8>, limit: usize) -> Self {
        buf.clear();
        Self { buf, limit }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Discard everything written so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Append one byte.
    pub fn push(&mut self, byte: u8) -> Result<(), WireError> {
        append(self.buf, self.limit, &[byte]).map(|_| ())
    }

    /// Append a byte slice.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        append(self.buf, self.limit, bytes).map(|_| ())
    }

    /// Append the low `width` bytes of `value`, most significant first.
    pub fn push_be(&mut self, value: u32, width: usize) -> Result<(), WireError> {
        if width > MAX_INT_WIDTH {
            return Err(WireError::ValueTooWide(width));
        }
        let bytes = value.to_be_bytes();
        self.extend(&bytes[MAX_INT_WIDTH - width..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_two_byte_number() {
        let buffer = [0x01, 0xFF, 0x00, 0x00];
        assert_eq!(read_be(&buffer, 0, 2), Ok((511, 2)));
    }

    #[test]
    fn read_past_end_is_truncated() {
        let buffer = [0x01, 0xFF];
        assert_eq!(read_be(&buffer, 1, 2), Err(WireError::Truncated));
        assert_eq!(read_be(&buffer, 0, 5), Err(WireError::ValueTooWide(5)));
    }

    #[test]
    fn zero_width_reads_zero() {
        assert_eq!(read_be(&[], 0, 0), Ok((0, 0)));
    }

    #[test]
    fn append_respects_capacity() {
        let mut buffer = Vec::new();
        assert_eq!(append(&mut buffer, 3, b"ab"), Ok(2));
        assert_eq!(
            append(&mut buffer, 3, b"cd"),
            Err(WireError::Overflow {
                needed: 4,
                capacity: 3
            })
        );
        assert_eq!(buffer, b"ab");
    }

    #[test]
    fn equality_over_prefix() {
        assert!(buffers_equal(b"abcd", b"abxx", 2));
        assert!(!buffers_equal(b"abcd", b"abxx", 3));
        assert!(!buffers_equal(b"a", b"a", 2));
    }

    #[test]
    fn cursor_reads_in_order() {
        let packet = [0x0A, 0x07, 0x03, 0x01, 0x12, 0x34];
        let mut cursor = Cursor::new(&packet);
        assert_eq!(cursor.read_u8(), Ok(0x0A));
        assert_eq!(cursor.read_array::<2>(), Ok([0x07, 0x03]));
        assert_eq!(cursor.read_u8(), Ok(0x01));
        assert_eq!(cursor.read_u16(), Ok(0x1234));
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(cursor.read_u8(), Err(WireError::Truncated));
    }

    #[test]
    fn writer_clears_and_bounds() {
        let mut out = vec![9, 9, 9];
        let mut writer = PacketWriter::new(&mut out, 4);
        assert!(writer.is_empty());
        writer.push_be(0x0102, 2).expect("fits");
        writer.push(3).expect("fits");
        assert!(writer.extend(&[4, 5]).is_err());
        assert_eq!(writer.len(), 3);
        assert_eq!(out, vec![1, 2, 3]);
    }
}
