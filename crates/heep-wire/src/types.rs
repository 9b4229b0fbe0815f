// Author: Lukas Bower
// Purpose: Define HEEP wire types and constants shared across components.
#![allow(clippy::module_name_repetitions)]

//! HEEP data model definitions shared by the codec and the engine.

use core::fmt;
use core::str::FromStr;
use std::net::Ipv4Addr;

use crate::{Cursor, PacketWriter};

/// Width of a globally unique device id on the wire.
pub const STANDARD_ID_SIZE: usize = 4;

/// Width of a compact, device-local indexed id.
pub const INDEXED_ID_SIZE: usize = 1;

/// Encoded size of a vertex body: two ids, two control ids and four octets.
pub const VERTEX_BODY_LEN: usize = 2 * STANDARD_ID_SIZE + 2 + 4;

/// Globally unique device identifier as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceId([u8; STANDARD_ID_SIZE]);

impl DeviceId {
    /// Wrap raw id bytes.
    #[must_use]
    pub const fn new(bytes: [u8; STANDARD_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw id bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; STANDARD_ID_SIZE] {
        &self.0
    }

    /// Consume the id and return its bytes.
    #[must_use]
    pub fn into_bytes(self) -> [u8; STANDARD_ID_SIZE] {
        self.0
    }
}

impl From<[u8; STANDARD_ID_SIZE]> for DeviceId {
    fn from(value: [u8; STANDARD_ID_SIZE]) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Device id in the form used inside device memory: either the standard id
/// unchanged or a one-byte index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalId {
    bytes: [u8; STANDARD_ID_SIZE],
    len: u8,
}

impl LocalId {
    /// Local form that keeps the standard id.
    #[must_use]
    pub fn standard(id: DeviceId) -> Self {
        Self {
            bytes: id.into_bytes(),
            len: STANDARD_ID_SIZE as u8,
        }
    }

    /// Local form carrying a one-byte index.
    #[must_use]
    pub fn indexed(index: u8) -> Self {
        Self {
            bytes: [index, 0, 0, 0],
            len: INDEXED_ID_SIZE as u8,
        }
    }

    /// Bytes written to memory for this id.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    /// Encoded width.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    /// Always false; a local id has at least one byte.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index value when this is an indexed id.
    #[must_use]
    pub fn index(&self) -> Option<u8> {
        (usize::from(self.len) == INDEXED_ID_SIZE).then_some(self.bytes[0])
    }
}

/// IPv4 address of a vertex peer, kept in HEEP octet order.
///
/// The wire carries `Octet4, Octet3, Octet2, Octet1` in that order and the
/// textual form is `o4.o3.o2.o1`; no byte order conversion is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IpAddress {
    /// First octet on the wire.
    pub octet4: u8,
    /// Second octet on the wire.
    pub octet3: u8,
    /// Third octet on the wire.
    pub octet2: u8,
    /// Fourth octet on the wire.
    pub octet1: u8,
}

impl IpAddress {
    /// Build an address from octets in wire order.
    #[must_use]
    pub const fn new(octet4: u8, octet3: u8, octet2: u8, octet1: u8) -> Self {
        Self {
            octet4,
            octet3,
            octet2,
            octet1,
        }
    }

    /// Octets in wire order.
    #[must_use]
    pub fn to_wire(self) -> [u8; 4] {
        [self.octet4, self.octet3, self.octet2, self.octet1]
    }

    /// Build an address from octets in wire order.
    #[must_use]
    pub fn from_wire(octets: [u8; 4]) -> Self {
        Self::new(octets[0], octets[1], octets[2], octets[3])
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.octet4, self.octet3, self.octet2, self.octet1
        )
    }
}

impl FromStr for IpAddress {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 4];
        let mut parts = s.split('.');
        for octet in &mut octets {
            *octet = parts
                .next()
                .and_then(|part| part.trim().parse().ok())
                .ok_or(WireError::InvalidAddress)?;
        }
        if parts.next().is_some() {
            return Err(WireError::InvalidAddress);
        }
        Ok(Self::from_wire(octets))
    }
}

impl From<IpAddress> for Ipv4Addr {
    fn from(value: IpAddress) -> Self {
        Ipv4Addr::new(value.octet4, value.octet3, value.octet2, value.octet1)
    }
}

impl From<Ipv4Addr> for IpAddress {
    fn from(value: Ipv4Addr) -> Self {
        Self::from_wire(value.octets())
    }
}

/// Wiring edge from a control on the transmitting device to a control on a
/// remote device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vertex {
    /// Device that owns the transmitting control.
    pub tx_id: DeviceId,
    /// Remote device receiving values.
    pub rx_id: DeviceId,
    /// Control id on the transmitting device.
    pub tx_control: u8,
    /// Control id on the remote device.
    pub rx_control: u8,
    /// Network address of the remote device.
    pub rx_address: IpAddress,
}

impl Vertex {
    /// Decode a vertex body in wire order.
    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self, WireError> {
        let tx_id = DeviceId::new(cursor.read_array()?);
        let rx_id = DeviceId::new(cursor.read_array()?);
        let tx_control = cursor.read_u8()?;
        let rx_control = cursor.read_u8()?;
        let rx_address = IpAddress::from_wire(cursor.read_array()?);
        Ok(Self {
            tx_id,
            rx_id,
            tx_control,
            rx_control,
            rx_address,
        })
    }

    /// Encode a vertex body in wire order.
    pub fn encode(&self, writer: &mut PacketWriter<'_>) -> Result<(), WireError> {
        writer.extend(self.tx_id.as_bytes())?;
        writer.extend(self.rx_id.as_bytes())?;
        writer.push(self.tx_control)?;
        writer.push(self.rx_control)?;
        writer.extend(&self.rx_address.to_wire())
    }
}

/// Possible errors produced while encoding or decoding HEEP packets.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Input ended before a field could be read.
    #[error("truncated packet")]
    Truncated,
    /// Output would exceed the buffer limit.
    #[error("output overflow: needed {needed} bytes, capacity {capacity}")]
    Overflow {
        /// Bytes the write required.
        needed: usize,
        /// Fixed capacity of the buffer.
        capacity: usize,
    },
    /// First byte is not a known opcode.
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    /// Opcode is known but not valid in this position.
    #[error("unexpected opcode {0:#04x}")]
    UnexpectedOpcode(u8),
    /// Integer field wider than four bytes.
    #[error("integer field of {0} bytes exceeds 4")]
    ValueTooWide(usize),
    /// Declared field length is inconsistent with the packet.
    #[error("malformed packet: {0}")]
    Malformed(&'static str),
    /// Text did not parse as `o4.o3.o2.o1`.
    #[error("invalid ip address")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_text_keeps_wire_order() {
        let addr: IpAddress = "192.168.1.20".parse().expect("valid address");
        assert_eq!(addr.to_wire(), [192, 168, 1, 20]);
        assert_eq!(addr.to_string(), "192.168.1.20");
        assert_eq!(Ipv4Addr::from(addr), Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!("10.0.0".parse::<IpAddress>(), Err(WireError::InvalidAddress));
        assert_eq!("10.0.0.1.2".parse::<IpAddress>(), Err(WireError::InvalidAddress));
    }

    #[test]
    fn local_id_widths() {
        let standard = LocalId::standard(DeviceId::new([1, 2, 3, 4]));
        assert_eq!(standard.as_bytes(), &[1, 2, 3, 4]);
        assert_eq!(standard.index(), None);
        let indexed = LocalId::indexed(7);
        assert_eq!(indexed.as_bytes(), &[7]);
        assert_eq!(indexed.index(), Some(7));
    }

    #[test]
    fn device_id_displays_as_hex() {
        assert_eq!(DeviceId::new([0x0a, 0x00, 0xff, 0x10]).to_string(), "0a00ff10");
    }
}
