// Author: Lukas Bower
// Purpose: Provide HEEP wire types, opcodes and codec primitives for device firmware and hosts.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! HEEP wire types and codec primitives shared by the protocol engine and
//! by hosts that talk to HEEP devices.
//!
//! Every packet starts with a one-byte opcode. Control packets (COPs) carry
//! the packet id at position 1; response packets (ROPs) carry the responding
//! device id first and the packet id after it.

mod buffer;
mod codec;
mod fuzz;
mod opcode;
mod types;

pub use buffer::{append, buffers_equal, read_be, Cursor, PacketWriter};
pub use codec::{
    decode_request, decode_response, encode_request, packet_id_of, request_packet_id,
    write_set_value_cop, write_status, Request, Response, ResponseStatus, COP_HEADER_LEN,
    ROP_HEADER_LEN,
};
pub use fuzz::fuzz_decode;
pub use opcode::{is_response, OpCode};
pub use types::*;
