//! Fibre Channel frames (FC-FS)
//!
//! ```text
//! word 0: R_CTL  | D_ID (3 bytes)
//! word 1: CS_CTL | S_ID (3 bytes)
//! word 2: TYPE   | F_CTL (3 bytes)
//! word 3: SEQ_ID | DF_CTL | SEQ_CNT (2 bytes)
//! word 4: OX_ID (2 bytes) | RX_ID (2 bytes)
//! word 5: Parameter (4 bytes)
//! ```
//!
//! SOF and EOF are ordered sets on native FC; FCoE carries them as single
//! bytes in its envelope, so they travel alongside the frame here rather than
//! inside its encoding.

use alloc::vec::Vec;
use core::fmt;

use crate::DecodeError;

pub const FC_HEADER_SIZE: usize = 24;

/// Start-of-frame delimiter, in its FCoE byte encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sof {
    F,
    I2,
    N2,
    I3,
    N3,
    I4,
    N4,
    C4,
}

impl Sof {
    pub const fn to_u8(self) -> u8 {
        match self {
            Sof::F => 0x28,
            Sof::I2 => 0x2D,
            Sof::N2 => 0x35,
            Sof::I3 => 0x2E,
            Sof::N3 => 0x36,
            Sof::I4 => 0x29,
            Sof::N4 => 0x31,
            Sof::C4 => 0x39,
        }
    }

    pub fn from_u8(b: u8) -> Result<Self, DecodeError> {
        Ok(match b {
            0x28 => Sof::F,
            0x2D => Sof::I2,
            0x35 => Sof::N2,
            0x2E => Sof::I3,
            0x36 => Sof::N3,
            0x29 => Sof::I4,
            0x31 => Sof::N4,
            0x39 => Sof::C4,
            other => return Err(DecodeError::BadSof(other)),
        })
    }
}

/// End-of-frame delimiter, in its FCoE byte encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eof {
    N,
    T,
    Ni,
    A,
    Rt,
    Dt,
    Dti,
    Rti,
}

impl Eof {
    pub const fn to_u8(self) -> u8 {
        match self {
            Eof::N => 0x41,
            Eof::T => 0x42,
            Eof::Ni => 0x49,
            Eof::A => 0x50,
            Eof::Rt => 0x44,
            Eof::Dt => 0x46,
            Eof::Dti => 0x4E,
            Eof::Rti => 0x4F,
        }
    }

    pub fn from_u8(b: u8) -> Result<Self, DecodeError> {
        Ok(match b {
            0x41 => Eof::N,
            0x42 => Eof::T,
            0x49 => Eof::Ni,
            0x50 => Eof::A,
            0x44 => Eof::Rt,
            0x46 => Eof::Dt,
            0x4E => Eof::Dti,
            0x4F => Eof::Rti,
            other => return Err(DecodeError::BadEof(other)),
        })
    }
}

/// A 24-bit Fibre Channel address (domain, area, port)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FcAddress(pub [u8; 3]);

impl FcAddress {
    /// Not yet assigned, used as S_ID by an N_Port before login
    pub const UNASSIGNED: FcAddress = FcAddress([0x00, 0x00, 0x00]);
    /// Well-known address of the fabric login server (F_Port)
    pub const FABRIC_LOGIN: FcAddress = FcAddress([0xFF, 0xFF, 0xFE]);
    /// Well-known address of the fabric controller
    pub const FABRIC_CONTROLLER: FcAddress = FcAddress([0xFF, 0xFF, 0xFD]);
    /// Well-known address of the directory (name) server
    pub const NAME_SERVER: FcAddress = FcAddress([0xFF, 0xFF, 0xFC]);

    pub const fn new(domain: u8, area: u8, port: u8) -> Self {
        Self([domain, area, port])
    }

    #[inline]
    pub const fn domain(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub const fn area(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub const fn port(&self) -> u8 {
        self.0[2]
    }

    #[inline]
    pub fn is_unassigned(&self) -> bool {
        *self == Self::UNASSIGNED
    }

    #[inline]
    pub const fn as_u32(&self) -> u32 {
        ((self.0[0] as u32) << 16) | ((self.0[1] as u32) << 8) | (self.0[2] as u32)
    }

    /// Build an address from the low 24 bits of `word`
    #[inline]
    pub const fn from_u32(word: u32) -> Self {
        Self([(word >> 16) as u8, (word >> 8) as u8, word as u8])
    }
}

impl fmt::Display for FcAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

/// The routing control byte
///
/// The upper nibble selects the routing (device data, link services, ...),
/// the lower nibble the information category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RCtl(pub u8);

impl RCtl {
    pub const ROUTING_ELS: u8 = 0x20;
    pub const INFO_UNSOLICITED_CONTROL: u8 = 0x2;

    /// Extended link service, unsolicited control
    pub const ELS_UNSOLICITED_CONTROL: Self =
        Self(Self::ROUTING_ELS | Self::INFO_UNSOLICITED_CONTROL);
}

/// The TYPE byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcType(pub u8);

impl FcType {
    pub const BLS: Self = Self(0x00);
    pub const ELS: Self = Self(0x01);
    pub const FCP: Self = Self(0x08);
    pub const CT: Self = Self(0x20);
}

/// The 24-bit frame control field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FCtl(pub u32);

impl FCtl {
    /// Set when the sender is the exchange responder
    pub const EXCHANGE_CONTEXT: u32 = 1 << 23;
    /// Set when the sender is the sequence recipient
    pub const SEQUENCE_CONTEXT: u32 = 1 << 22;
    pub const FIRST_SEQUENCE: u32 = 1 << 21;
    pub const LAST_SEQUENCE: u32 = 1 << 20;
    pub const END_SEQUENCE: u32 = 1 << 19;
    pub const END_CONNECTION: u32 = 1 << 18;
    pub const SEQUENCE_INITIATIVE: u32 = 1 << 16;

    /// The last frame of a response: sent by the exchange responder, closing
    /// both the sequence and the exchange, handing initiative back
    pub const LAST_RESPONSE: Self = Self(
        Self::EXCHANGE_CONTEXT
            | Self::LAST_SEQUENCE
            | Self::END_SEQUENCE
            | Self::SEQUENCE_INITIATIVE,
    );
}

/// A Fibre Channel frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcFrame {
    pub sof: Sof,
    pub eof: Eof,
    pub r_ctl: RCtl,
    pub fc_type: FcType,
    pub cs_ctl: u8,
    pub source: FcAddress,
    pub destination: FcAddress,
    pub f_ctl: FCtl,
    pub seq_id: u8,
    pub df_ctl: u8,
    pub seq_cnt: u16,
    pub ox_id: u16,
    pub rx_id: u16,
    pub parameter: u32,
    pub payload: Vec<u8>,
}

impl FcFrame {
    /// Exchange ID meaning "not yet assigned"
    pub const UNKNOWN_XID: u16 = 0xFFFF;

    /// Decode a frame carried between `sof` and `eof`
    pub fn from_bytes(sof: Sof, data: &[u8], eof: Eof) -> Result<Self, DecodeError> {
        DecodeError::check_len("FC frame", FC_HEADER_SIZE, data)?;

        let addr = |at: usize| FcAddress([data[at], data[at + 1], data[at + 2]]);
        let be16 = |at: usize| u16::from_be_bytes([data[at], data[at + 1]]);

        Ok(Self {
            sof,
            eof,
            r_ctl: RCtl(data[0]),
            destination: addr(1),
            cs_ctl: data[4],
            source: addr(5),
            fc_type: FcType(data[8]),
            f_ctl: FCtl(u32::from_be_bytes([0, data[9], data[10], data[11]])),
            seq_id: data[12],
            df_ctl: data[13],
            seq_cnt: be16(14),
            ox_id: be16(16),
            rx_id: be16(18),
            parameter: u32::from_be_bytes([data[20], data[21], data[22], data[23]]),
            payload: data[FC_HEADER_SIZE..].to_vec(),
        })
    }

    /// Encode header and payload. SOF/EOF are not part of the encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FC_HEADER_SIZE + self.payload.len());
        out.push(self.r_ctl.0);
        out.extend_from_slice(&self.destination.0);
        out.push(self.cs_ctl);
        out.extend_from_slice(&self.source.0);
        out.push(self.fc_type.0);
        out.extend_from_slice(&self.f_ctl.0.to_be_bytes()[1..]);
        out.push(self.seq_id);
        out.push(self.df_ctl);
        out.extend_from_slice(&self.seq_cnt.to_be_bytes());
        out.extend_from_slice(&self.ox_id.to_be_bytes());
        out.extend_from_slice(&self.rx_id.to_be_bytes());
        out.extend_from_slice(&self.parameter.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}
