//! Just enough FIP to tell what a frame is
//!
//! FIP itself (solicitation, advertisement, virtual link instantiation) is
//! not implemented; ports only log the operation code.

use core::fmt;

use crate::DecodeError;

/// The FIP operation code at payload offset 2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FipOp {
    Discovery,
    LinkService,
    Control,
    Vlan,
    Vn2Vn,
    Unknown(u16),
}

impl FipOp {
    pub fn from_u16(op: u16) -> Self {
        match op {
            1 => FipOp::Discovery,
            2 => FipOp::LinkService,
            3 => FipOp::Control,
            4 => FipOp::Vlan,
            5 => FipOp::Vn2Vn,
            other => FipOp::Unknown(other),
        }
    }

    /// Read the operation code from an Ethernet payload
    pub fn peek(payload: &[u8]) -> Result<Self, DecodeError> {
        DecodeError::check_len("FIP header", 4, payload)?;
        Ok(Self::from_u16(u16::from_be_bytes([payload[2], payload[3]])))
    }
}

impl fmt::Display for FipOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FipOp::Discovery => f.write_str("Discovery"),
            FipOp::LinkService => f.write_str("Link Services"),
            FipOp::Control => f.write_str("Control"),
            FipOp::Vlan => f.write_str("VLAN"),
            FipOp::Vn2Vn => f.write_str("VN2VN"),
            FipOp::Unknown(op) => write!(f, "Unknown(0x{op:04x})"),
        }
    }
}
