// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Ack/retry buffer.
//!
//! Copies of outbound packets are kept in one flat region as
//! `[timestamp][retries][opcode][packet id][length][packet]` entries. Entries
//! are packed with no gaps; the first entry whose timestamp byte is 0 marks
//! the end of live data. Deleting an entry shifts everything after it left
//! and zeroes the vacated tail.

mod timing;

pub use timing::{displacement, AckDecision, RetryPolicy};

use heep_wire::packet_id_of;
use log::{debug, trace, warn};
use thiserror::Error;

/// Bytes in front of every stored packet.
pub const ENTRY_HEADER_LEN: usize = 5;

const TIMESTAMP: usize = 0;
const RETRIES: usize = 1;
const OPCODE: usize = 2;
const PACKET_ID: usize = 3;
const LENGTH: usize = 4;

/// Errors raised by the ack/retry buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AckError {
    #[error("ack buffer full: entry needs {needed} bytes, {available} free")]
    OutOfSpace { needed: usize, available: usize },
    #[error("packet of {0} bytes cannot be tracked")]
    PacketTooLarge(usize),
    #[error("packet too short to carry a packet id")]
    PacketTooShort,
    #[error("offset {0} is not the start of an ack entry")]
    NotAnEntry(usize),
    #[error("retry count {retries} does not fit a {timeout} tick timeout")]
    InvalidPolicy { timeout: u8, retries: u8 },
    #[error("every packet id is awaiting acknowledgement")]
    NoFreePacketId,
}

/// Borrowed view of one stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckEntry<'a> {
    pub offset: usize,
    pub timestamp: u8,
    pub retries: u8,
    pub opcode: u8,
    pub packet_id: u8,
    pub packet: &'a [u8],
}

impl AckEntry<'_> {
    /// Bytes the entry occupies including its header.
    pub fn size(&self) -> usize {
        ENTRY_HEADER_LEN + self.packet.len()
    }
}

/// Entry removed by an acknowledgement or by expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledPacket {
    pub opcode: u8,
    pub packet_id: u8,
    pub retries: u8,
}

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Packets whose retry slot opened, to be sent again verbatim.
    pub resend: Vec<Vec<u8>>,
    /// Packets that ran out of time; delivery has failed.
    pub expired: Vec<SettledPacket>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.resend.is_empty() && self.expired.is_empty()
    }
}

/// Fixed-capacity buffer of packets awaiting acknowledgement.
#[derive(Debug, Clone)]
pub struct AckBuffer {
    buf: Vec<u8>,
    policy: RetryPolicy,
}

impl AckBuffer {
    pub fn new(capacity: usize, policy: RetryPolicy) -> Self {
        Self {
            buf: vec![0; capacity],
            policy,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Raw contents, including the zeroed tail.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Offset of the first empty slot.
    pub fn end(&self) -> usize {
        let mut pos = 0;
        while let Some(size) = self.entry_size(pos) {
            pos += size;
        }
        pos
    }

    pub fn free_bytes(&self) -> usize {
        self.capacity() - self.end()
    }

    pub fn entries(&self) -> Entries<'_> {
        Entries { buf: &self.buf, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_size(0).is_none()
    }

    /// Whether an entry with `packet_id` is awaiting acknowledgement.
    pub fn in_flight(&self, packet_id: u8) -> bool {
        self.entries().any(|entry| entry.packet_id == packet_id)
    }

    /// Store a copy of an outbound packet stamped with `now`.
    ///
    /// Returns the offset of the new entry.
    pub fn register(&mut self, packet: &[u8], now: u8) -> Result<usize, AckError> {
        let len = u8::try_from(packet.len()).map_err(|_| AckError::PacketTooLarge(packet.len()))?;
        let (opcode, packet_id) = match (packet.first(), packet_id_of(packet)) {
            (Some(opcode), Some(packet_id)) => (*opcode, packet_id),
            _ => return Err(AckError::PacketTooShort),
        };
        let offset = self.end();
        let needed = ENTRY_HEADER_LEN + packet.len();
        let available = self.capacity() - offset;
        if needed > available {
            warn!("ack buffer full, packet {packet_id} will not be retried");
            return Err(AckError::OutOfSpace { needed, available });
        }
        let stamp = if now == 0 { 1 } else { now };
        self.buf[offset..offset + ENTRY_HEADER_LEN]
            .copy_from_slice(&[stamp, 0, opcode, packet_id, len]);
        self.buf[offset + ENTRY_HEADER_LEN..offset + needed].copy_from_slice(packet);
        debug!("tracking packet {packet_id} at offset {offset} stamped {stamp}");
        Ok(offset)
    }

    /// Remove the entry at `offset`, closing the gap it leaves.
    pub fn delete_at(&mut self, offset: usize) -> Result<(), AckError> {
        let mut pos = 0;
        while pos < offset {
            pos += self.entry_size(pos).ok_or(AckError::NotAnEntry(offset))?;
        }
        let size = match self.entry_size(offset) {
            Some(size) if pos == offset => size,
            _ => return Err(AckError::NotAnEntry(offset)),
        };
        let end = self.end();
        self.buf.copy_within(offset + size..end, offset);
        self.buf[end - size..end].fill(0);
        Ok(())
    }

    /// Settle the first entry carrying `packet_id`.
    ///
    /// Returns `None` when nothing matches; such an ack is stale and ignored.
    pub fn acknowledge(&mut self, packet_id: u8) -> Option<SettledPacket> {
        let entry = self.entries().find(|entry| entry.packet_id == packet_id)?;
        let settled = SettledPacket {
            opcode: entry.opcode,
            packet_id,
            retries: entry.retries,
        };
        let offset = entry.offset;
        self.delete_at(offset).ok()?;
        debug!("packet {packet_id} acknowledged after {} retries", settled.retries);
        Some(settled)
    }

    /// Age every entry against `now`.
    pub fn sweep(&mut self, now: u8) -> SweepReport {
        let mut report = SweepReport::default();
        let mut pos = 0;
        while let Some(size) = self.entry_size(pos) {
            let start = self.buf[pos + TIMESTAMP];
            let retries = self.buf[pos + RETRIES];
            let packet_id = self.buf[pos + PACKET_ID];
            match self.policy.decide(start, retries, now) {
                AckDecision::Expired => {
                    warn!("packet {packet_id} expired after {retries} retries");
                    report.expired.push(SettledPacket {
                        opcode: self.buf[pos + OPCODE],
                        packet_id,
                        retries,
                    });
                    if self.delete_at(pos).is_err() {
                        break;
                    }
                }
                AckDecision::Retry => {
                    trace!("retrying packet {packet_id} (attempt {})", retries + 1);
                    self.buf[pos + RETRIES] = retries.saturating_add(1);
                    report
                        .resend
                        .push(self.buf[pos + ENTRY_HEADER_LEN..pos + size].to_vec());
                    pos += size;
                }
                AckDecision::Wait => pos += size,
            }
        }
        report
    }

    pub fn clear(&mut self) {
        self.buf.fill(0);
    }

    fn entry_size(&self, pos: usize) -> Option<usize> {
        entry_size(&self.buf, pos)
    }
}

fn entry_size(buf: &[u8], pos: usize) -> Option<usize> {
    let header = buf.get(pos..pos + ENTRY_HEADER_LEN)?;
    if header[TIMESTAMP] == 0 {
        return None;
    }
    let size = ENTRY_HEADER_LEN + usize::from(header[LENGTH]);
    (pos + size <= buf.len()).then_some(size)
}

/// Iterator over stored entries in order.
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Entries<'a> {
    type Item = AckEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let size = entry_size(self.buf, self.pos)?;
        let bytes = &self.buf[self.pos..self.pos + size];
        let entry = AckEntry {
            offset: self.pos,
            timestamp: bytes[TIMESTAMP],
            retries: bytes[RETRIES],
            opcode: bytes[OPCODE],
            packet_id: bytes[PACKET_ID],
            packet: &bytes[ENTRY_HEADER_LEN..],
        };
        self.pos += size;
        Some(entry)
    }
}
