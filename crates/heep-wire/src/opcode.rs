// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Enumerate HEEP opcodes shared by packets and memory records.
// Author: Lukas Bower

//! Opcode table shared by wire packets and device memory records.

use crate::WireError;

/// Every opcode understood by HEEP devices.
///
/// Packets and memory records share one opcode space: a memory record's tag
/// byte is drawn from the same table as a packet's first byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Client data record carrying the firmware version.
    ClientData = 0x01,
    /// Control descriptor record.
    Control = 0x02,
    /// Vertex definition record.
    Vertex = 0x03,
    /// Icon identifier record.
    IconId = 0x04,
    /// Custom icon drawing record.
    CustomIconDrawing = 0x05,
    /// Device name record.
    DeviceName = 0x06,
    /// XY position record.
    XyPosition = 0x07,
    /// IP address record.
    IpAddress = 0x08,
    /// Request a memory dump from a device.
    IsHeepDevice = 0x09,
    /// Set a control value.
    SetValue = 0x0A,
    /// Set the device position.
    SetPosition = 0x0B,
    /// Add a vertex.
    SetVertex = 0x0C,
    /// Delete a vertex.
    DeleteVertex = 0x0D,
    /// Echo request, reserved.
    Echo = 0x0E,
    /// Memory dump response.
    MemoryDump = 0x0F,
    /// Success response.
    Success = 0x10,
    /// Error response.
    Error = 0x11,
    /// Tombstone left behind by a deleted memory record.
    Fragment = 0x12,
    /// Append a generic memory object.
    AddMop = 0x13,
    /// Dynamic memory size record.
    DynamicMemorySize = 0x14,
    /// Delete a generic memory object.
    DeleteMop = 0x15,
    /// Mapping from a compact local index to a standard device id.
    LocalDeviceId = 0x16,
}

impl OpCode {
    /// Raw byte value of the opcode.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether this opcode names a response packet.
    #[must_use]
    pub const fn is_response(self) -> bool {
        matches!(self, OpCode::MemoryDump | OpCode::Success | OpCode::Error)
    }
}

impl From<OpCode> for u8 {
    fn from(value: OpCode) -> Self {
        value.as_u8()
    }
}

impl TryFrom<u8> for OpCode {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, WireError> {
        use OpCode::*;
        Ok(match value {
            0x01 => ClientData,
            0x02 => Control,
            0x03 => Vertex,
            0x04 => IconId,
            0x05 => CustomIconDrawing,
            0x06 => DeviceName,
            0x07 => XyPosition,
            0x08 => IpAddress,
            0x09 => IsHeepDevice,
            0x0A => SetValue,
            0x0B => SetPosition,
            0x0C => SetVertex,
            0x0D => DeleteVertex,
            0x0E => Echo,
            0x0F => MemoryDump,
            0x10 => Success,
            0x11 => Error,
            0x12 => Fragment,
            0x13 => AddMop,
            0x14 => DynamicMemorySize,
            0x15 => DeleteMop,
            0x16 => LocalDeviceId,
            other => return Err(WireError::UnknownOpcode(other)),
        })
    }
}

/// Classify a raw opcode byte as a response (MemoryDump, Success or Error).
///
/// Hosts use this to route an inbound packet to acknowledgement matching
/// instead of the request dispatcher.
#[must_use]
pub fn is_response(opcode: u8) -> bool {
    OpCode::try_from(opcode).is_ok_and(OpCode::is_response)
}
