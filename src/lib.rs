// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v0.1
// Date Modified: 2026-10-19
// Author: Lukas Bower

//! HEEP device-control protocol engine.

/// Ack/retry buffer for outbound packets
pub mod ack;

/// Coarse tick source
pub mod clock;

/// Id compaction and generic memory object validation
pub mod compact;

/// Engine configuration and its process-wide default
pub mod config;

/// Controls and the value-setting seam
pub mod control;

/// Per-device state
pub mod device;

/// Control packet dispatcher
pub mod dispatch;

/// Engine context owning all shared state
pub mod engine;

/// Device memory store
pub mod memory;

/// Transport seam and bounded exchange loop
pub mod transport;

/// Wiring edges between controls
pub mod vertex;

pub use engine::{EngineError, HeepEngine, Inbound};
pub use heep_wire as wire;
