// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Device memory store.
//!
//! An append-only region of tagged records. The high-water mark only grows:
//! deleting a record rewrites it in place as a fragment of the same size.
//! `compact` is the one operation that gives space back.

mod record;

pub use record::{Record, RecordLayout, MAX_RECORD_LEN};

use heep_wire::{buffers_equal, LocalId, OpCode};
use log::{debug, error, info};
use thiserror::Error;

/// Errors raised by the memory store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("device memory full: need {needed} bytes, {available} free")]
    OutOfSpace { needed: usize, available: usize },
    #[error("malformed record: {0}")]
    Malformed(&'static str),
    #[error("record of {0} bytes exceeds the one-byte length limit")]
    RecordTooLarge(usize),
    #[error("offset {0} is not a record boundary")]
    NotARecordBoundary(usize),
    #[error("corrupt record at offset {0}")]
    Corrupt(usize),
}

/// Fixed-capacity store of device memory records.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    buf: Vec<u8>,
    capacity: usize,
    layout: RecordLayout,
}

impl MemoryStore {
    pub fn new(capacity: usize, id_size: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
            layout: RecordLayout::new(id_size),
        }
    }

    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// High-water mark.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn available(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Every byte up to the high-water mark, fragments included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append one complete record at the high-water mark.
    ///
    /// Returns the offset it was written at.
    pub fn append(&mut self, record: &[u8]) -> Result<usize, StoreError> {
        self.append_all(&[record])
    }

    /// Append several records, all or none.
    ///
    /// Every record is checked and the combined size reserved before the
    /// first byte is written. Returns the offset of the last record.
    pub fn append_all<R: AsRef<[u8]>>(&mut self, records: &[R]) -> Result<usize, StoreError> {
        let mut needed = 0;
        for record in records {
            let record = record.as_ref();
            self.check_record(record)?;
            needed += record.len();
        }
        if needed > self.available() {
            return Err(StoreError::OutOfSpace {
                needed,
                available: self.available(),
            });
        }
        let mut offset = self.buf.len();
        for record in records {
            let record = record.as_ref();
            offset = self.buf.len();
            self.buf.extend_from_slice(record);
            debug!("stored {:#04x} record at {offset} ({} bytes)", record[0], record.len());
        }
        Ok(offset)
    }

    fn check_record(&self, record: &[u8]) -> Result<(), StoreError> {
        if record.len() > MAX_RECORD_LEN {
            return Err(StoreError::RecordTooLarge(record.len()));
        }
        if record.first() == Some(&OpCode::Fragment.as_u8()) {
            return Err(StoreError::Malformed("fragments are only made by deletion"));
        }
        match self.layout.record_len(record, 0) {
            Ok(total) if total == record.len() => Ok(()),
            _ => Err(StoreError::Malformed("declared length disagrees with record")),
        }
    }

    /// Records from offset 0. Stops early at a record that cannot be sized.
    pub fn scan(&self) -> Records<'_> {
        Records {
            layout: self.layout,
            buf: &self.buf,
            pos: 0,
        }
    }

    /// The record starting exactly at `offset`.
    pub fn record_at(&self, offset: usize) -> Result<Record<'_>, StoreError> {
        self.scan()
            .find(|record| record.offset >= offset)
            .filter(|record| record.offset == offset)
            .ok_or(StoreError::NotARecordBoundary(offset))
    }

    /// Rewrite the record at `offset` as a fragment of the same size.
    pub fn tombstone(&mut self, offset: usize) -> Result<(), StoreError> {
        let total = self.record_at(offset)?.total_len();
        self.buf[offset] = OpCode::Fragment.as_u8();
        // total never exceeds MAX_RECORD_LEN
        self.buf[offset + self.layout.len_offset()] = total as u8;
        Ok(())
    }

    /// Offsets of live records whose leading bytes equal `pattern`.
    pub fn find_matching(&self, pattern: &[u8]) -> Vec<usize> {
        if pattern.is_empty() {
            return Vec::new();
        }
        self.scan()
            .filter(|record| !record.is_fragment())
            .filter(|record| buffers_equal(record.bytes, pattern, pattern.len()))
            .map(|record| record.offset)
            .collect()
    }

    /// Tombstone every live record matching `pattern`; returns the count.
    pub fn find_and_delete_matching(&mut self, pattern: &[u8]) -> Result<usize, StoreError> {
        let offsets = self.find_matching(pattern);
        for offset in &offsets {
            self.tombstone(*offset)?;
        }
        Ok(offsets.len())
    }

    /// Tombstone the first live record matching `pattern`.
    pub fn find_and_delete_first(&mut self, pattern: &[u8]) -> Result<bool, StoreError> {
        match self.find_matching(pattern).first() {
            Some(offset) => self.tombstone(*offset).map(|()| true),
            None => Ok(false),
        }
    }

    /// Bytes held by fragments.
    pub fn reclaimable_bytes(&self) -> usize {
        self.scan()
            .filter(Record::is_fragment)
            .map(|record| record.total_len())
            .sum()
    }

    /// Drop every fragment, moving live records down. Returns bytes freed.
    pub fn compact(&mut self) -> usize {
        let mut live = Vec::with_capacity(self.capacity);
        for record in self.scan().filter(|record| !record.is_fragment()) {
            live.extend_from_slice(record.bytes);
        }
        let freed = self.buf.len() - live.len();
        self.buf = live;
        if freed > 0 {
            info!("compacted device memory, {freed} bytes reclaimed");
        }
        freed
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// First live record of `kind` stored under `id`.
    pub fn find_record(&self, kind: OpCode, id: LocalId) -> Option<Record<'_>> {
        self.scan()
            .find(|record| record.tag == kind.as_u8() && record.id == id.as_bytes())
    }

    /// Move the device to `(x, y)`, in place when a position is already stored.
    pub fn update_xy(&mut self, id: LocalId, x: u16, y: u16) -> Result<(), StoreError> {
        let record = self.layout.xy_record(id, x, y)?;
        let existing = self
            .find_record(OpCode::XyPosition, id)
            .filter(|found| found.total_len() == record.len())
            .map(|found| found.offset);
        match existing {
            Some(offset) => {
                self.buf[offset..offset + record.len()].copy_from_slice(&record);
                Ok(())
            }
            None => self.append(&record).map(|_| ()),
        }
    }

    pub fn xy(&self, id: LocalId) -> Option<(u16, u16)> {
        let record = self.find_record(OpCode::XyPosition, id)?;
        match record.payload {
            [x1, x2, y1, y2] => Some((u16::from_be_bytes([*x1, *x2]), u16::from_be_bytes([*y1, *y2]))),
            _ => None,
        }
    }

    /// Replace the stored name for `id`.
    ///
    /// The old name is only tombstoned once the new one is known to fit.
    pub fn set_device_name(&mut self, id: LocalId, name: &str) -> Result<(), StoreError> {
        let record = self.layout.name_record(id, name)?;
        if record.len() > self.available() {
            return Err(StoreError::OutOfSpace {
                needed: record.len(),
                available: self.available(),
            });
        }
        while let Some(old) = self.find_record(OpCode::DeviceName, id).map(|r| r.offset) {
            self.tombstone(old)?;
        }
        self.append(&record).map(|_| ())
    }

    pub fn device_name(&self, id: LocalId) -> Option<String> {
        let record = self.find_record(OpCode::DeviceName, id)?;
        String::from_utf8(record.payload.to_vec()).ok()
    }
}

/// Iterator over stored records.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    layout: RecordLayout,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }
        match Record::parse(self.layout, self.buf, self.pos) {
            Ok(record) => {
                self.pos += record.total_len();
                Some(record)
            }
            Err(err) => {
                error!("memory scan stopped: {err}");
                self.pos = self.buf.len();
                None
            }
        }
    }
}
