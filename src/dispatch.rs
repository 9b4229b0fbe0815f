// CLASSIFICATION: COMMUNITY
// Filename: dispatch.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Control packet dispatcher.
//!
//! One inbound control packet in, exactly one response packet out. Failures
//! the peer should know about are answered in-band with an Error response
//! carrying a fixed message and the request's packet id.

use heep_wire::{
    decode_request, request_packet_id, write_status, OpCode, PacketWriter, Request,
    ResponseStatus, WireError,
};
use log::{debug, info, warn};

use crate::compact::MopError;
use crate::control::ControlSetter;
use crate::device::DeviceState;
use crate::memory::StoreError;

/// Fixed response texts. Existing clients match on these exactly.
pub mod messages {
    pub const VALUE_SET: &str = "Value Set";
    pub const FAILED_TO_SET: &str = "Failed to Set";
    pub const VERTEX_SET: &str = "Vertex Set";
    pub const VERTEX_DELETED: &str = "Vertex Deleted!";
    pub const VERTEX_DELETE_FAILED: &str = "Failed to delete Vertex!";
    pub const MOP_ADDED: &str = "MOP Added!";
    pub const MOP_ADD_INVALID: &str =
        "Cannot Add: Delivered Generic MOP was determined to be invalid!";
    pub const MOP_ADD_NO_SPACE: &str = "Cannot Add: Device memory is full";
    pub const MOP_DELETED: &str = "MOP Deleted!";
    pub const MOP_NOT_FOUND: &str = "Cannot Delete: MOP not found";
    pub const MOP_DELETE_INVALID: &str = "Cannot Delete: Generic MOP was invalid!";
    pub const INVALID_COP: &str = "Invalid COP Received";
    pub const MALFORMED_COP: &str = "Malformed COP Received";
    pub const RESPONSE_TOO_LARGE: &str = "Response too large";
}

/// Summary of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatched {
    /// Request opcode when it was recognised.
    pub request: Option<OpCode>,
    pub packet_id: u8,
    /// MemoryDump, Success or Error.
    pub response: OpCode,
}

enum Outcome {
    Dump,
    Status(ResponseStatus, &'static str),
}

fn success(message: &'static str) -> Outcome {
    Outcome::Status(ResponseStatus::Success, message)
}

fn error(message: &'static str) -> Outcome {
    Outcome::Status(ResponseStatus::Error, message)
}

/// Handle `input` and write the response into `out`, at most `limit` bytes.
///
/// A memory dump too large for `limit` is replaced by an Error response.
pub fn dispatch<S: ControlSetter + ?Sized>(
    device: &mut DeviceState,
    setter: &mut S,
    input: &[u8],
    out: &mut Vec<u8>,
    limit: usize,
) -> Result<Dispatched, WireError> {
    let packet_id = request_packet_id(input);
    let (request, outcome) = match decode_request(input) {
        Ok(request) => {
            debug!(
                "dispatching {:?} packet {packet_id}: {}",
                request.opcode(),
                hex::encode(input)
            );
            (Some(request.opcode()), handle(device, setter, request))
        }
        Err(WireError::UnknownOpcode(_) | WireError::UnexpectedOpcode(_)) => {
            warn!("invalid control packet: {}", hex::encode(input));
            (None, error(messages::INVALID_COP))
        }
        Err(err) => {
            warn!("malformed control packet ({err}): {}", hex::encode(input));
            let request = input.first().and_then(|op| OpCode::try_from(*op).ok());
            (request, error(messages::MALFORMED_COP))
        }
    };

    let mut writer = PacketWriter::new(out, limit);
    let written = match outcome {
        Outcome::Dump => write_memory_dump(&mut writer, device, packet_id)
            .map(|()| OpCode::MemoryDump),
        Outcome::Status(status, message) => {
            write_status(&mut writer, status, device.device_id(), packet_id, message)
                .map(|()| status.opcode())
        }
    };
    let response = match written {
        Ok(response) => response,
        Err(err) => {
            warn!("response to packet {packet_id} does not fit: {err}");
            write_status(
                &mut writer,
                ResponseStatus::Error,
                device.device_id(),
                packet_id,
                messages::RESPONSE_TOO_LARGE,
            )?;
            OpCode::Error
        }
    };
    Ok(Dispatched {
        request,
        packet_id,
        response,
    })
}

fn handle<S: ControlSetter + ?Sized>(
    device: &mut DeviceState,
    setter: &mut S,
    request: Request<'_>,
) -> Outcome {
    match request {
        Request::IsHeepDevice => Outcome::Dump,
        Request::SetValue { control_id, value } => {
            match device.controls.set_value(control_id, value, setter) {
                Ok(_) => success(messages::VALUE_SET),
                Err(err) => {
                    debug!("set value refused: {err}");
                    error(messages::FAILED_TO_SET)
                }
            }
        }
        Request::SetPosition { x, y } => {
            if let Err(err) = device.set_position(x, y) {
                warn!("position ({x}, {y}) not stored: {err}");
            }
            success(messages::VALUE_SET)
        }
        Request::SetVertex(vertex) => {
            device.vertices.add(vertex);
            if let Err(err) = device.persist_vertex(&vertex) {
                warn!("vertex not mirrored to memory: {err}");
            }
            info!(
                "vertex set {}:{} -> {}:{} at {}",
                vertex.tx_id,
                vertex.tx_control,
                vertex.rx_id,
                vertex.rx_control,
                vertex.rx_address
            );
            success(messages::VERTEX_SET)
        }
        Request::DeleteVertex(vertex) => match device.vertices.delete(&vertex) {
            Ok(_) => {
                if let Err(err) = device.forget_vertex(&vertex) {
                    warn!("vertex record not tombstoned: {err}");
                }
                info!(
                    "vertex deleted {}:{} -> {}:{}",
                    vertex.tx_id, vertex.tx_control, vertex.rx_id, vertex.rx_control
                );
                success(messages::VERTEX_DELETED)
            }
            Err(_) => error(messages::VERTEX_DELETE_FAILED),
        },
        Request::AddMop { declared, object } => match device.add_mop(declared, object) {
            Ok(offset) => {
                info!("memory object added at offset {offset}");
                success(messages::MOP_ADDED)
            }
            Err(MopError::IndexExhausted | MopError::Store(StoreError::OutOfSpace { .. })) => {
                error(messages::MOP_ADD_NO_SPACE)
            }
            Err(err) => {
                debug!("memory object rejected: {err}");
                error(messages::MOP_ADD_INVALID)
            }
        },
        Request::DeleteMop { declared, object } => match device.delete_mop(declared, object) {
            Ok(0) | Err(MopError::UnknownId(_)) => error(messages::MOP_NOT_FOUND),
            Ok(count) => {
                info!("{count} memory object(s) deleted");
                success(messages::MOP_DELETED)
            }
            Err(err) => {
                debug!("memory object delete rejected: {err}");
                error(messages::MOP_DELETE_INVALID)
            }
        },
    }
}

/// Client data, every control, the dynamic memory size and then the raw
/// store, under one MemoryDump header.
fn write_memory_dump(
    writer: &mut PacketWriter<'_>,
    device: &DeviceState,
    packet_id: u8,
) -> Result<(), WireError> {
    let local = device.local_id();
    let id_size = local.len();
    let controls_len: usize = device
        .controls()
        .iter()
        .map(|control| id_size + 8 + control.name.len())
        .sum();
    let declared = device.memory().len() + (id_size + 3) + controls_len + 1;

    writer.clear();
    writer.push(OpCode::MemoryDump.as_u8())?;
    writer.extend(device.device_id().as_bytes())?;
    writer.push(packet_id)?;
    // length byte wraps at 256
    writer.push(declared as u8)?;

    writer.push(OpCode::ClientData.as_u8())?;
    writer.extend(local.as_bytes())?;
    writer.push(1)?;
    writer.push(device.firmware_version())?;

    for control in device.controls().iter() {
        writer.push(OpCode::Control.as_u8())?;
        writer.extend(local.as_bytes())?;
        writer.push((control.name.len() + 6) as u8)?;
        writer.push(control.id)?;
        writer.push(control.control_type as u8)?;
        writer.push(control.direction as u8)?;
        writer.push(control.low)?;
        writer.push(control.high)?;
        writer.push(control.value)?;
        writer.extend(control.name.as_bytes())?;
    }

    writer.push(OpCode::DynamicMemorySize.as_u8())?;
    writer.extend(local.as_bytes())?;
    writer.push(1)?;
    writer.push(device.memory().capacity() as u8)?;

    writer.extend(device.memory().as_bytes())
}
