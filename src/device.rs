// CLASSIFICATION: COMMUNITY
// Filename: device.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Everything one device owns: its identity, controls, vertices and memory.

use heep_wire::{DeviceId, LocalId, Vertex};
use log::{info, warn};

use crate::compact::{IdAssignment, IdCompactor, MopError};
use crate::config::EngineConfig;
use crate::control::{Control, ControlError, ControlTable};
use crate::memory::{MemoryStore, StoreError};
use crate::vertex::VertexGraph;

#[derive(Debug, Clone)]
pub struct DeviceState {
    device_id: DeviceId,
    local_id: LocalId,
    firmware_version: u8,
    pub(crate) store: MemoryStore,
    compactor: IdCompactor,
    pub(crate) controls: ControlTable,
    pub(crate) vertices: VertexGraph,
}

impl DeviceState {
    /// Fresh device. In indexed mode the device's own id takes index 0.
    pub fn new(config: &EngineConfig) -> Result<Self, MopError> {
        let compactor = IdCompactor::new(config.id_mode);
        let mut store = MemoryStore::new(config.memory_capacity, config.id_mode.id_size());
        let device_id = config.device_id();
        let local_id = compactor.compact(&mut store, device_id)?;
        Ok(Self {
            device_id,
            local_id,
            firmware_version: config.firmware_version,
            store,
            compactor,
            controls: ControlTable::new(),
            vertices: VertexGraph::new(),
        })
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Id this device uses for its own memory records.
    pub fn local_id(&self) -> LocalId {
        self.local_id
    }

    pub fn firmware_version(&self) -> u8 {
        self.firmware_version
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.store
    }

    pub fn controls(&self) -> &ControlTable {
        &self.controls
    }

    pub fn vertices(&self) -> &VertexGraph {
        &self.vertices
    }

    pub fn compactor(&self) -> IdCompactor {
        self.compactor
    }

    pub fn add_control(&mut self, control: Control) -> Result<(), ControlError> {
        info!("control {} ({}) registered", control.id, control.name);
        self.controls.add(control)
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), StoreError> {
        self.store.set_device_name(self.local_id, name)
    }

    pub fn name(&self) -> Option<String> {
        self.store.device_name(self.local_id)
    }

    pub fn set_position(&mut self, x: u16, y: u16) -> Result<(), StoreError> {
        self.store.update_xy(self.local_id, x, y)
    }

    pub fn position(&self) -> Option<(u16, u16)> {
        self.store.xy(self.local_id)
    }

    /// Append a generic object after compacting its id.
    ///
    /// A new id mapping and the object are stored together or not at all.
    pub fn add_mop(&mut self, declared: u8, object: &[u8]) -> Result<usize, MopError> {
        let restructured = self.compactor.validate_and_restructure(
            &self.store,
            declared,
            object,
            IdAssignment::Assign,
        )?;
        Ok(self.store.append_all(&restructured.into_records())?)
    }

    /// Tombstone every stored copy of a generic object.
    pub fn delete_mop(&mut self, declared: u8, object: &[u8]) -> Result<usize, MopError> {
        let pattern = self.compactor.validate_and_restructure(
            &self.store,
            declared,
            object,
            IdAssignment::LookupOnly,
        )?;
        Ok(self.store.find_and_delete_matching(&pattern.record)?)
    }

    /// Mirror a vertex into memory so it is reported by a dump.
    pub fn persist_vertex(&mut self, vertex: &Vertex) -> Result<(), MopError> {
        let pending = self
            .compactor
            .plan(&self.store, &[vertex.tx_id, vertex.rx_id])?;
        let (tx, rx) = (pending.locals[0], pending.locals[1]);
        let mut records = pending.mappings;
        records.push(self.store.layout().vertex_record(tx, rx, vertex)?);
        self.store.append_all(&records)?;
        Ok(())
    }

    /// Tombstone the first memory record describing `vertex`.
    pub fn forget_vertex(&mut self, vertex: &Vertex) -> Result<bool, MopError> {
        let ids = (
            self.compactor.lookup(&self.store, vertex.tx_id),
            self.compactor.lookup(&self.store, vertex.rx_id),
        );
        let (Some(tx), Some(rx)) = ids else {
            warn!("vertex ids not in memory, nothing to tombstone");
            return Ok(false);
        };
        let record = self.store.layout().vertex_record(tx, rx, vertex)?;
        Ok(self.store.find_and_delete_first(&record)?)
    }
}
