//! The FCoE envelope (FC-BB-5)
//!
//! ```text
//! byte  0       version (upper nibble), reserved
//! bytes 1..13   reserved
//! byte  13      SOF
//! bytes 14..    encapsulated FC frame
//! 4 bytes       CRC32 of the FC frame, little endian
//! 1 byte        EOF
//! 3 bytes       reserved
//! ```

use alloc::vec::Vec;

use crate::{
    DecodeError,
    crc::crc32,
    fc::{Eof, FcFrame, Sof},
};

pub const FCOE_HEADER_SIZE: usize = 14;
pub const FCOE_TRAILER_SIZE: usize = 8;

/// An FCoE frame: an FC frame plus its delimiters and checksum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcoeFrame {
    pub version: u8,
    pub sof: Sof,
    pub eof: Eof,
    pub payload: Vec<u8>,
    pub crc32: u32,
}

impl FcoeFrame {
    /// Wrap an FC frame, computing the checksum
    pub fn encapsulate(frame: &FcFrame) -> Self {
        let payload = frame.to_bytes();
        let mut fe = Self {
            version: 0,
            sof: frame.sof,
            eof: frame.eof,
            payload,
            crc32: 0,
        };
        fe.crc32 = fe.checksum();
        fe
    }

    /// The checksum the payload should carry
    pub fn checksum(&self) -> u32 {
        crc32(&self.payload)
    }

    /// Decode the encapsulated FC frame
    pub fn fc_frame(&self) -> Result<FcFrame, DecodeError> {
        FcFrame::from_bytes(self.sof, &self.payload, self.eof)
    }

    /// Decode an envelope. The checksum is taken as-is, not verified.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        DecodeError::check_len("FCoE frame", FCOE_HEADER_SIZE + FCOE_TRAILER_SIZE, data)?;

        let version = data[0] >> 4;
        if version != 0 {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let sof = Sof::from_u8(data[FCOE_HEADER_SIZE - 1])?;

        let trailer = &data[data.len() - FCOE_TRAILER_SIZE..];
        let crc32 = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let eof = Eof::from_u8(trailer[4])?;

        Ok(Self {
            version,
            sof,
            eof,
            payload: data[FCOE_HEADER_SIZE..data.len() - FCOE_TRAILER_SIZE].to_vec(),
            crc32,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(FCOE_HEADER_SIZE + self.payload.len() + FCOE_TRAILER_SIZE);
        out.push(self.version << 4);
        out.extend_from_slice(&[0u8; FCOE_HEADER_SIZE - 2]);
        out.push(self.sof.to_u8());
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.push(self.eof.to_u8());
        out.extend_from_slice(&[0u8; 3]);
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn envelope_layout() {
        let fe = FcoeFrame {
            version: 0,
            sof: Sof::I3,
            eof: Eof::T,
            payload: vec![0xAA; 24],
            crc32: 0,
        };
        let fe = FcoeFrame {
            crc32: fe.checksum(),
            ..fe
        };
        let bytes = fe.to_bytes();
        assert_eq!(bytes.len(), 14 + 24 + 8);
        assert_eq!(bytes[13], 0x2E);
        assert_eq!(&bytes[38..42], &fe.crc32.to_le_bytes());
        assert_eq!(bytes[42], 0x42);
        assert_eq!(FcoeFrame::from_bytes(&bytes).unwrap(), fe);
    }

    #[test]
    fn rejects_other_versions() {
        let mut bytes = vec![0u8; 46];
        bytes[0] = 0x10;
        assert_eq!(
            FcoeFrame::from_bytes(&bytes),
            Err(DecodeError::UnsupportedVersion(1))
        );
    }

    #[test]
    fn checksum_is_not_verified_on_decode() {
        let mut bytes = vec![0u8; 46];
        bytes[13] = Sof::I3.to_u8();
        bytes[38..42].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        bytes[42] = Eof::T.to_u8();
        let fe = FcoeFrame::from_bytes(&bytes).unwrap();
        assert_eq!(fe.crc32, 0xDEAD_BEEF);
        assert_ne!(fe.crc32, fe.checksum());
    }
}
