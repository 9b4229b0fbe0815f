// CLASSIFICATION: COMMUNITY
// Filename: compact.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Id compaction for records crossing the wire/storage boundary.
//!
//! In indexed mode each foreign device id gets a one-byte index, recorded in
//! memory as `[LocalDeviceId][index][4][standard id]` so the mapping travels
//! with a memory dump.

use heep_wire::{DeviceId, LocalId, OpCode, INDEXED_ID_SIZE, STANDARD_ID_SIZE};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory::{MemoryStore, StoreError};

/// Smallest generic object: tag, standard id and length byte.
pub const MOP_HEADER_LEN: usize = 1 + STANDARD_ID_SIZE + 1;

/// Width of ids kept in device memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdMode {
    Standard,
    Indexed,
}

impl IdMode {
    pub fn id_size(self) -> usize {
        match self {
            IdMode::Standard => STANDARD_ID_SIZE,
            IdMode::Indexed => INDEXED_ID_SIZE,
        }
    }
}

impl Default for IdMode {
    fn default() -> Self {
        if cfg!(feature = "indexed-ids") {
            IdMode::Indexed
        } else {
            IdMode::Standard
        }
    }
}

/// Whether an unknown id may be given a new index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdAssignment {
    Assign,
    LookupOnly,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MopError {
    #[error("malformed memory object: {0}")]
    Malformed(&'static str),
    #[error("device {0} has no local index")]
    UnknownId(DeviceId),
    #[error("all 256 local indices are in use")]
    IndexExhausted,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stored ids for a group of devices and the mapping records not yet in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingIds {
    /// One per requested id, in order.
    pub locals: Vec<LocalId>,
    pub mappings: Vec<Vec<u8>>,
}

/// A generic object in its stored form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestructuredMop {
    pub record: Vec<u8>,
    /// Must be stored before `record`.
    pub mappings: Vec<Vec<u8>>,
}

impl RestructuredMop {
    /// Mapping records followed by the object itself.
    pub fn into_records(self) -> Vec<Vec<u8>> {
        let mut records = self.mappings;
        records.push(self.record);
        records
    }
}

/// Maps standard ids to their stored form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdCompactor {
    mode: IdMode,
}

impl IdCompactor {
    pub fn new(mode: IdMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> IdMode {
        self.mode
    }

    /// Stored form of `id`, assigning the next free index when needed.
    pub fn compact(&self, store: &mut MemoryStore, id: DeviceId) -> Result<LocalId, MopError> {
        let pending = self.plan(store, &[id])?;
        store.append_all(&pending.mappings)?;
        let local = pending.locals[0];
        if let (false, Some(index)) = (pending.mappings.is_empty(), local.index()) {
            info!("device {id} assigned local index {index}");
        }
        Ok(local)
    }

    /// Stored forms of `ids` without touching `store`.
    ///
    /// Ids not yet mapped get consecutive indices; their mapping records are
    /// returned for the caller to append together with whatever uses them.
    pub fn plan(&self, store: &MemoryStore, ids: &[DeviceId]) -> Result<PendingIds, MopError> {
        let mut pending = PendingIds::default();
        let mut assigned: Vec<(DeviceId, u8)> = Vec::new();
        let mut next: Option<u16> = None;
        for &id in ids {
            if let Some(local) = self.lookup(store, id) {
                pending.locals.push(local);
                continue;
            }
            if let Some(&(_, index)) = assigned.iter().find(|(seen, _)| *seen == id) {
                pending.locals.push(LocalId::indexed(index));
                continue;
            }
            let index = next.unwrap_or_else(|| Self::first_free_index(store));
            let index = u8::try_from(index).map_err(|_| MopError::IndexExhausted)?;
            next = Some(u16::from(index) + 1);
            let record = store
                .layout()
                .build(OpCode::LocalDeviceId.as_u8(), &[index], id.as_bytes())?;
            debug!("device {id} pending local index {index}");
            assigned.push((id, index));
            pending.mappings.push(record);
            pending.locals.push(LocalId::indexed(index));
        }
        Ok(pending)
    }

    /// One past the highest mapped index; 256 once every index is taken.
    fn first_free_index(store: &MemoryStore) -> u16 {
        store
            .scan()
            .filter(|record| record.tag == OpCode::LocalDeviceId.as_u8())
            .filter_map(|record| record.id.first().copied())
            .max()
            .map_or(0, |max| u16::from(max) + 1)
    }

    /// Stored form of `id` without assigning anything.
    pub fn lookup(&self, store: &MemoryStore, id: DeviceId) -> Option<LocalId> {
        match self.mode {
            IdMode::Standard => Some(LocalId::standard(id)),
            IdMode::Indexed => store
                .scan()
                .find(|record| {
                    record.tag == OpCode::LocalDeviceId.as_u8()
                        && record.payload == id.as_bytes()
                })
                .and_then(|record| record.id.first().copied())
                .map(LocalId::indexed),
        }
    }

    /// Standard id behind a stored id.
    pub fn expand(&self, store: &MemoryStore, local: LocalId) -> Option<DeviceId> {
        match (self.mode, local.index()) {
            (IdMode::Standard, None) => {
                let bytes: [u8; STANDARD_ID_SIZE] = local.as_bytes().try_into().ok()?;
                Some(DeviceId::new(bytes))
            }
            (IdMode::Indexed, Some(index)) => store
                .scan()
                .find(|record| {
                    record.tag == OpCode::LocalDeviceId.as_u8() && record.id == [index]
                })
                .and_then(|record| <[u8; STANDARD_ID_SIZE]>::try_from(record.payload).ok())
                .map(DeviceId::new),
            _ => None,
        }
    }

    /// Check a generic object and return it rewritten with its compacted id.
    ///
    /// Only the first `declared` bytes of `object` are considered; they must
    /// hold exactly one record whose length byte agrees with `declared`.
    /// Fragments and id mappings are owned by the store and never accepted.
    /// Nothing is written: new id mappings come back in the result.
    pub fn validate_and_restructure(
        &self,
        store: &MemoryStore,
        declared: u8,
        object: &[u8],
        assignment: IdAssignment,
    ) -> Result<RestructuredMop, MopError> {
        let declared = usize::from(declared);
        if declared < MOP_HEADER_LEN {
            return Err(MopError::Malformed("shorter than a record header"));
        }
        let object = object
            .get(..declared)
            .ok_or(MopError::Malformed("fewer bytes than declared"))?;
        let tag = object[0];
        if tag == OpCode::Fragment.as_u8() {
            return Err(MopError::Malformed("fragment tag"));
        }
        if tag == OpCode::LocalDeviceId.as_u8() {
            return Err(MopError::Malformed("local id mappings are managed by the device"));
        }
        let len = object[MOP_HEADER_LEN - 1];
        if MOP_HEADER_LEN + usize::from(len) != declared {
            return Err(MopError::Malformed("record length disagrees with declared length"));
        }
        let mut id = [0u8; STANDARD_ID_SIZE];
        id.copy_from_slice(&object[1..=STANDARD_ID_SIZE]);
        let id = DeviceId::new(id);
        let (local, mappings) = match assignment {
            IdAssignment::Assign => {
                let pending = self.plan(store, &[id])?;
                (pending.locals[0], pending.mappings)
            }
            IdAssignment::LookupOnly => {
                let local = self.lookup(store, id).ok_or(MopError::UnknownId(id))?;
                (local, Vec::new())
            }
        };
        let mut record = Vec::with_capacity(declared);
        record.push(tag);
        record.extend_from_slice(local.as_bytes());
        record.push(len);
        record.extend_from_slice(&object[MOP_HEADER_LEN..]);
        debug!("memory object {tag:#04x} for {id} restructured to {} bytes", record.len());
        Ok(RestructuredMop { record, mappings })
    }
}
