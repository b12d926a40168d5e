//! Frame codecs for FCoE
//!
//! Three nested layers are handled here, outermost first:
//!
//! * [`ethernet`]: Ethernet II framing and MAC addresses
//! * [`fcoe`]: the FC-BB-5 FCoE envelope (version, SOF, CRC32, EOF)
//! * [`fc`]: the 24-byte Fibre Channel frame header and its payload
//!
//! On top of FC, [`els`] holds the Extended Link Service payloads needed for
//! fabric login, and [`request`] resolves a decoded FC frame into a tagged
//! [`Request`] once, so consumers never re-inspect raw bytes. [`fip`] only
//! knows enough of FIP to name its operation codes.
//!
//! Every frame type has an infallible `to_bytes()` and a `from_bytes()` that
//! fails with a [`DecodeError`].

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod crc;
pub mod els;
pub mod ethernet;
pub mod fc;
pub mod fcoe;
pub mod fip;
pub mod request;

use core::fmt;

pub use els::{ElsCommand, Flogi, ServiceParameters, Wwn};
pub use ethernet::{EthernetFrame, MacAddr};
pub use fc::{Eof, FcAddress, FcFrame, FcType, Sof};
pub use fcoe::FcoeFrame;
pub use request::{ElsRequest, Request};

/// EtherType of FCoE data frames
pub const FCOE_ETHERTYPE: u16 = 0x8906;

/// EtherType of the FCoE Initialization Protocol
pub const FIP_ETHERTYPE: u16 = 0x8914;

/// The smallest link MTU able to carry a full-sized FC frame in FCoE
pub const MIN_FCOE_MTU: usize = 2158;

/// Receive buffer size, large enough for jumbo frames
pub const MAX_FCOE_MTU: usize = 9216;

/// An error produced while decoding any of the frame layers
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// The buffer ended before the layer's fixed-size part did
    TooShort {
        what: &'static str,
        needed: usize,
        got: usize,
    },
    /// An FCoE envelope with a version other than 0
    UnsupportedVersion(u8),
    /// A start-of-frame code not defined by FC-BB-5
    BadSof(u8),
    /// An end-of-frame code not defined by FC-BB-5
    BadEof(u8),
}

impl DecodeError {
    pub(crate) fn check_len(what: &'static str, needed: usize, data: &[u8]) -> Result<(), Self> {
        if data.len() < needed {
            Err(DecodeError::TooShort {
                what,
                needed,
                got: data.len(),
            })
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::TooShort { what, needed, got } => {
                write!(f, "{what} too short: need {needed} bytes, got {got}")
            }
            DecodeError::UnsupportedVersion(v) => write!(f, "unsupported FCoE version {v}"),
            DecodeError::BadSof(b) => write!(f, "invalid SOF 0x{b:02x}"),
            DecodeError::BadEof(b) => write!(f, "invalid EOF 0x{b:02x}"),
        }
    }
}

impl core::error::Error for DecodeError {}
