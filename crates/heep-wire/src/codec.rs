// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Encode and decode HEEP control and response packets.
// Author: Lukas Bower

//! Encode/decode helpers for HEEP packets.
//!
//! Control packets are laid out as `[opcode][packet id][numBytes][body]`,
//! response packets as `[opcode][device id][packet id][length][payload]`.

use core::str;

use crate::{
    Cursor, DeviceId, OpCode, PacketWriter, Vertex, WireError, STANDARD_ID_SIZE, VERTEX_BODY_LEN,
};

/// Opcode, packet id and body length.
pub const COP_HEADER_LEN: usize = 3;

/// Opcode, device id, packet id and payload length.
pub const ROP_HEADER_LEN: usize = 1 + STANDARD_ID_SIZE + 2;

/// Decoded control packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    /// Identity query answered with a memory dump.
    IsHeepDevice,
    /// Set the value of a local control.
    SetValue {
        /// Control to update.
        control_id: u8,
        /// Requested value.
        value: u32,
    },
    /// Move the device on the host's canvas.
    SetPosition {
        /// Horizontal coordinate.
        x: u16,
        /// Vertical coordinate.
        y: u16,
    },
    /// Add a wiring edge.
    SetVertex(Vertex),
    /// Remove a wiring edge.
    DeleteVertex(Vertex),
    /// Append a generic memory object.
    AddMop {
        /// Length declared by the sender.
        declared: u8,
        /// Bytes following the declared length; may be shorter or longer
        /// than `declared`.
        object: &'a [u8],
    },
    /// Remove a generic memory object matching the supplied bytes.
    DeleteMop {
        /// Length declared by the sender.
        declared: u8,
        /// Bytes following the declared length.
        object: &'a [u8],
    },
}

impl Request<'_> {
    /// Opcode that carries this request.
    #[must_use]
    pub fn opcode(&self) -> OpCode {
        match self {
            Request::IsHeepDevice => OpCode::IsHeepDevice,
            Request::SetValue { .. } => OpCode::SetValue,
            Request::SetPosition { .. } => OpCode::SetPosition,
            Request::SetVertex(_) => OpCode::SetVertex,
            Request::DeleteVertex(_) => OpCode::DeleteVertex,
            Request::AddMop { .. } => OpCode::AddMop,
            Request::DeleteMop { .. } => OpCode::DeleteMop,
        }
    }
}

/// Outcome carried by a status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Request applied.
    Success,
    /// Request rejected.
    Error,
}

impl ResponseStatus {
    /// Response opcode for this status.
    #[must_use]
    pub fn opcode(self) -> OpCode {
        match self {
            ResponseStatus::Success => OpCode::Success,
            ResponseStatus::Error => OpCode::Error,
        }
    }
}

/// Decoded response packet header and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response<'a> {
    /// MemoryDump, Success or Error.
    pub opcode: OpCode,
    /// Device that produced the response.
    pub device_id: DeviceId,
    /// Packet id of the request being answered.
    pub packet_id: u8,
    /// Length byte as sent; a memory dump's length wraps at 256.
    pub declared_len: u8,
    /// Payload bytes.
    pub payload: &'a [u8],
}

impl<'a> Response<'a> {
    /// Status text of a Success or Error response.
    #[must_use]
    pub fn message(&self) -> Option<&'a str> {
        match self.opcode {
            OpCode::Success | OpCode::Error => str::from_utf8(self.payload).ok(),
            _ => None,
        }
    }
}

/// Packet id of a control packet, fixed at position 1.
///
/// A packet too short to carry one is answered with packet id 0.
#[must_use]
pub fn request_packet_id(bytes: &[u8]) -> u8 {
    bytes.get(1).copied().unwrap_or(0)
}

/// Packet id of any packet, looking past the device id for responses.
#[must_use]
pub fn packet_id_of(bytes: &[u8]) -> Option<u8> {
    let opcode = *bytes.first()?;
    if crate::is_response(opcode) {
        bytes.get(1 + STANDARD_ID_SIZE).copied()
    } else {
        bytes.get(1).copied()
    }
}

/// Decode a control packet.
pub fn decode_request(bytes: &[u8]) -> Result<Request<'_>, WireError> {
    let mut cursor = Cursor::new(bytes);
    let raw = cursor.read_u8()?;
    let opcode = OpCode::try_from(raw)?;
    let _packet_id = cursor.read_u8()?;
    match opcode {
        OpCode::IsHeepDevice => Ok(Request::IsHeepDevice),
        OpCode::SetValue => {
            let declared = usize::from(cursor.read_u8()?);
            let width = declared
                .checked_sub(1)
                .ok_or(WireError::Malformed("set value carries no control id"))?;
            let control_id = cursor.read_u8()?;
            let value = cursor.read_be(width)?;
            Ok(Request::SetValue { control_id, value })
        }
        OpCode::SetPosition => {
            let _declared = cursor.read_u8()?;
            let x = cursor.read_u16()?;
            let y = cursor.read_u16()?;
            Ok(Request::SetPosition { x, y })
        }
        OpCode::SetVertex | OpCode::DeleteVertex => {
            let _declared = cursor.read_u8()?;
            let vertex = Vertex::decode(&mut cursor)?;
            Ok(if opcode == OpCode::SetVertex {
                Request::SetVertex(vertex)
            } else {
                Request::DeleteVertex(vertex)
            })
        }
        OpCode::AddMop | OpCode::DeleteMop => {
            let declared = cursor.read_u8()?;
            let object = cursor.rest();
            Ok(if opcode == OpCode::AddMop {
                Request::AddMop { declared, object }
            } else {
                Request::DeleteMop { declared, object }
            })
        }
        _ => Err(WireError::UnexpectedOpcode(raw)),
    }
}

/// Encode a control packet.
pub fn encode_request(
    writer: &mut PacketWriter<'_>,
    packet_id: u8,
    request: &Request<'_>,
) -> Result<(), WireError> {
    writer.clear();
    writer.push(request.opcode().as_u8())?;
    writer.push(packet_id)?;
    match request {
        Request::IsHeepDevice => Ok(()),
        Request::SetValue { control_id, value } => {
            let width = value_width(*value);
            writer.push(width as u8 + 1)?;
            writer.push(*control_id)?;
            writer.push_be(*value, width)
        }
        Request::SetPosition { x, y } => {
            writer.push(4)?;
            writer.push_be(u32::from(*x), 2)?;
            writer.push_be(u32::from(*y), 2)
        }
        Request::SetVertex(vertex) | Request::DeleteVertex(vertex) => {
            writer.push(VERTEX_BODY_LEN as u8)?;
            vertex.encode(writer)
        }
        Request::AddMop { declared, object } | Request::DeleteMop { declared, object } => {
            writer.push(*declared)?;
            writer.extend(object)
        }
    }
}

/// Decode a MemoryDump, Success or Error packet.
pub fn decode_response(bytes: &[u8]) -> Result<Response<'_>, WireError> {
    let mut cursor = Cursor::new(bytes);
    let raw = cursor.read_u8()?;
    let opcode = OpCode::try_from(raw)?;
    if !opcode.is_response() {
        return Err(WireError::UnexpectedOpcode(raw));
    }
    let device_id = DeviceId::new(cursor.read_array()?);
    let packet_id = cursor.read_u8()?;
    let declared_len = cursor.read_u8()?;
    let payload = match opcode {
        OpCode::MemoryDump => cursor.rest(),
        _ => cursor.read_slice(usize::from(declared_len))?,
    };
    Ok(Response {
        opcode,
        device_id,
        packet_id,
        declared_len,
        payload,
    })
}

/// Write a Success or Error response carrying a text message.
pub fn write_status(
    writer: &mut PacketWriter<'_>,
    status: ResponseStatus,
    device_id: DeviceId,
    packet_id: u8,
    message: &str,
) -> Result<(), WireError> {
    let len: u8 = message
        .len()
        .try_into()
        .map_err(|_| WireError::Malformed("status message longer than 255 bytes"))?;
    writer.clear();
    writer.push(status.opcode().as_u8())?;
    writer.extend(device_id.as_bytes())?;
    writer.push(packet_id)?;
    writer.push(len)?;
    writer.extend(message.as_bytes())
}

/// Write an outbound SetValue packet as sent to a vertex peer.
pub fn write_set_value_cop(
    writer: &mut PacketWriter<'_>,
    packet_id: u8,
    control_id: u8,
    value: u8,
) -> Result<(), WireError> {
    writer.clear();
    writer.push(OpCode::SetValue.as_u8())?;
    writer.push(packet_id)?;
    writer.push(2)?;
    writer.push(control_id)?;
    writer.push(value)
}

fn value_width(value: u32) -> usize {
    let bits = 32 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}
