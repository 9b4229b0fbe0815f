// CLASSIFICATION: COMMUNITY
// Filename: engine.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Protocol engine context.
//!
//! [`HeepEngine`] owns the device state, the ack/retry buffer and the output
//! buffer. Every operation takes `&mut self`, so dispatch and sweep can never
//! interleave; a multi-threaded host wraps the engine in one mutex.

use heep_wire::{is_response, packet_id_of, write_set_value_cop, PacketWriter, WireError};
use log::{debug, info, warn};
use thiserror::Error;

use crate::ack::{displacement, AckBuffer, AckError, SettledPacket, SweepReport};
use crate::clock::TickSource;
use crate::compact::MopError;
use crate::config::{ConfigError, EngineConfig};
use crate::control::{BoundedSetter, ControlSetter};
use crate::device::DeviceState;
use crate::dispatch::{dispatch, Dispatched};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Ack(#[from] AckError),
    #[error(transparent)]
    Mop(#[from] MopError),
}

/// What happened to one inbound packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A control packet was answered; the response is in the output buffer.
    Dispatched(Dispatched),
    /// A response packet settled a tracked packet, or matched nothing.
    Acknowledged(Option<SettledPacket>),
}

pub struct HeepEngine<C, S = BoundedSetter> {
    config: EngineConfig,
    clock: C,
    setter: S,
    device: DeviceState,
    acks: AckBuffer,
    output: Vec<u8>,
    next_packet_id: u8,
    last_sweep: Option<u8>,
}

impl<C: TickSource> HeepEngine<C> {
    /// Engine whose SetValue only enforces control bounds.
    pub fn new(config: EngineConfig, clock: C) -> Result<Self, EngineError> {
        Self::with_setter(config, clock, BoundedSetter)
    }
}

impl<C: TickSource, S: ControlSetter> HeepEngine<C, S> {
    pub fn with_setter(config: EngineConfig, clock: C, setter: S) -> Result<Self, EngineError> {
        config.validate()?;
        let device = DeviceState::new(&config)?;
        let acks = AckBuffer::new(config.ack_capacity, config.retry_policy()?);
        info!(
            "engine up for device {} ({:?} ids, {} bytes of memory)",
            config.device_id(),
            config.id_mode,
            config.memory_capacity
        );
        Ok(Self {
            output: Vec::with_capacity(config.output_capacity),
            config,
            clock,
            setter,
            device,
            acks,
            next_packet_id: 1,
            last_sweep: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn device(&self) -> &DeviceState {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut DeviceState {
        &mut self.device
    }

    pub fn acks(&self) -> &AckBuffer {
        &self.acks
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Last response written by [`Self::dispatch`].
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Route one inbound packet: responses settle ack entries, everything
    /// else is dispatched.
    pub fn handle_inbound(&mut self, bytes: &[u8]) -> Result<Inbound, EngineError> {
        match bytes.first() {
            Some(opcode) if is_response(*opcode) => {
                Ok(Inbound::Acknowledged(self.acknowledge(bytes)))
            }
            _ => self.dispatch(bytes).map(Inbound::Dispatched),
        }
    }

    /// Answer one control packet into the output buffer.
    pub fn dispatch(&mut self, input: &[u8]) -> Result<Dispatched, EngineError> {
        let limit = self.config.output_capacity;
        Ok(dispatch(
            &mut self.device,
            &mut self.setter,
            input,
            &mut self.output,
            limit,
        )?)
    }

    /// Track the current output for retry until it is acknowledged.
    pub fn register_output(&mut self) -> Result<usize, EngineError> {
        let now = self.clock.now_tick();
        Ok(self.acks.register(&self.output, now)?)
    }

    /// Settle the ack entry matching a response's packet id.
    pub fn acknowledge(&mut self, response: &[u8]) -> Option<SettledPacket> {
        let packet_id = packet_id_of(response)?;
        let settled = self.acks.acknowledge(packet_id);
        if settled.is_none() {
            debug!("ignoring stale ack for packet {packet_id}");
        }
        settled
    }

    /// Age every tracked packet against the current tick.
    pub fn sweep(&mut self) -> SweepReport {
        let now = self.clock.now_tick();
        self.last_sweep = Some(now);
        self.acks.sweep(now)
    }

    /// Sweep when at least one sweep interval has passed since the last one.
    pub fn maybe_sweep(&mut self) -> Option<SweepReport> {
        let now = self.clock.now_tick();
        let due = match self.last_sweep {
            Some(last) => displacement(last, now) >= self.config.sweep_interval_ticks,
            None => true,
        };
        due.then(|| self.sweep())
    }

    /// Build a SetValue request for a peer and track it for retry.
    pub fn set_value_cop(&mut self, control_id: u8, value: u8) -> Result<Vec<u8>, EngineError> {
        let packet_id = self.allocate_packet_id()?;
        let mut packet = Vec::with_capacity(5);
        let mut writer = PacketWriter::new(&mut packet, self.config.output_capacity);
        write_set_value_cop(&mut writer, packet_id, control_id, value)?;
        let now = self.clock.now_tick();
        if let Err(err) = self.acks.register(&packet, now) {
            warn!("set value packet {packet_id} sent untracked: {err}");
            return Err(err.into());
        }
        Ok(packet)
    }

    /// Drop memory fragments; returns bytes reclaimed.
    pub fn compact_memory(&mut self) -> usize {
        self.device.store.compact()
    }

    fn allocate_packet_id(&mut self) -> Result<u8, AckError> {
        let mut candidate = self.next_packet_id;
        for _ in 0..=u8::MAX {
            if !self.acks.in_flight(candidate) {
                self.next_packet_id = candidate.wrapping_add(1);
                return Ok(candidate);
            }
            candidate = candidate.wrapping_add(1);
        }
        Err(AckError::NoFreePacketId)
    }
}
