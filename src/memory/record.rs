// CLASSIFICATION: COMMUNITY
// Filename: record.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Tagged record layout shared by every memory record kind.
//!
//! A record is `[tag][id][len][len bytes]` where the id is one or four bytes
//! wide depending on the id mode. A fragment keeps the tag slot and the len
//! slot of the record it replaced, but the len slot then holds the total
//! size of the record rather than its payload size.

use heep_wire::{LocalId, OpCode, Vertex};

use super::StoreError;

/// Largest record a one-byte length can describe.
pub const MAX_RECORD_LEN: usize = 255;

/// Header geometry for one id width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    id_size: usize,
}

impl RecordLayout {
    pub const fn new(id_size: usize) -> Self {
        Self { id_size }
    }

    pub fn id_size(&self) -> usize {
        self.id_size
    }

    /// Tag, id and length byte.
    pub fn header_len(&self) -> usize {
        self.id_size + 2
    }

    /// Position of the length byte inside a record.
    pub fn len_offset(&self) -> usize {
        self.id_size + 1
    }

    /// Total size of the record starting at `offset` in `bytes`.
    ///
    /// Fragments are sized by their stored total; everything else by header
    /// plus declared payload.
    pub fn record_len(&self, bytes: &[u8], offset: usize) -> Result<usize, StoreError> {
        let header = bytes
            .get(offset..offset + self.header_len())
            .ok_or(StoreError::Corrupt(offset))?;
        let len = usize::from(header[self.len_offset()]);
        let total = if header[0] == OpCode::Fragment.as_u8() {
            if len < self.header_len() {
                return Err(StoreError::Corrupt(offset));
            }
            len
        } else {
            self.header_len() + len
        };
        if offset + total > bytes.len() {
            return Err(StoreError::Corrupt(offset));
        }
        Ok(total)
    }

    /// Build a record from its parts.
    pub fn build(&self, tag: u8, id: &[u8], payload: &[u8]) -> Result<Vec<u8>, StoreError> {
        if id.len() != self.id_size {
            return Err(StoreError::Malformed("id width does not match store layout"));
        }
        let total = self.header_len() + payload.len();
        if total > MAX_RECORD_LEN {
            return Err(StoreError::RecordTooLarge(total));
        }
        let mut record = Vec::with_capacity(total);
        record.push(tag);
        record.extend_from_slice(id);
        record.push(payload.len() as u8);
        record.extend_from_slice(payload);
        Ok(record)
    }

    /// `[XyPosition][id][4][x][y]`.
    pub fn xy_record(&self, id: LocalId, x: u16, y: u16) -> Result<Vec<u8>, StoreError> {
        let mut payload = [0u8; 4];
        payload[..2].copy_from_slice(&x.to_be_bytes());
        payload[2..].copy_from_slice(&y.to_be_bytes());
        self.build(OpCode::XyPosition.as_u8(), id.as_bytes(), &payload)
    }

    pub fn name_record(&self, id: LocalId, name: &str) -> Result<Vec<u8>, StoreError> {
        self.build(OpCode::DeviceName.as_u8(), id.as_bytes(), name.as_bytes())
    }

    /// `[Vertex][tx][len][rx][tx control][rx control][o4][o3][o2][o1]`.
    pub fn vertex_record(
        &self,
        tx: LocalId,
        rx: LocalId,
        vertex: &Vertex,
    ) -> Result<Vec<u8>, StoreError> {
        let mut payload = Vec::with_capacity(rx.len() + 6);
        payload.extend_from_slice(rx.as_bytes());
        payload.push(vertex.tx_control);
        payload.push(vertex.rx_control);
        payload.extend_from_slice(&vertex.rx_address.to_wire());
        self.build(OpCode::Vertex.as_u8(), tx.as_bytes(), &payload)
    }
}

/// Borrowed view of one stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub offset: usize,
    pub tag: u8,
    pub id: &'a [u8],
    /// Empty for fragments.
    pub payload: &'a [u8],
    pub bytes: &'a [u8],
}

impl<'a> Record<'a> {
    pub(crate) fn parse(
        layout: RecordLayout,
        buf: &'a [u8],
        offset: usize,
    ) -> Result<Self, StoreError> {
        let total = layout.record_len(buf, offset)?;
        let bytes = &buf[offset..offset + total];
        let payload: &[u8] = if bytes[0] == OpCode::Fragment.as_u8() {
            &[]
        } else {
            &bytes[layout.header_len()..]
        };
        Ok(Self {
            offset,
            tag: bytes[0],
            id: &bytes[1..layout.len_offset()],
            payload,
            bytes,
        })
    }

    pub fn kind(&self) -> Option<OpCode> {
        OpCode::try_from(self.tag).ok()
    }

    pub fn is_fragment(&self) -> bool {
        self.tag == OpCode::Fragment.as_u8()
    }

    pub fn total_len(&self) -> usize {
        self.bytes.len()
    }
}
