//! Ethernet II framing

use alloc::vec::Vec;
use core::fmt;

use crate::DecodeError;

/// Destination, source and EtherType
pub const ETHERNET_HEADER_SIZE: usize = 14;

/// Minimum frame size, excluding the FCS the NIC appends
pub const ETHERNET_MIN_SIZE: usize = 60;

/// A 48-bit IEEE MAC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const ZERO: MacAddr = MacAddr([0; 6]);
    pub const BROADCAST: MacAddr = MacAddr([0xFF; 6]);

    /// The "All-FCF-MACs" group address that FIP solicitations are sent to
    pub const ALL_FCF_MACS: MacAddr = MacAddr([0x01, 0x10, 0x18, 0x01, 0x00, 0x02]);

    #[inline]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    #[inline]
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(value: [u8; 6]) -> Self {
        Self(value)
    }
}

/// A decoded Ethernet II frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetFrame {
    pub destination: MacAddr,
    pub source: MacAddr,
    pub ethertype: u16,
    pub payload: Vec<u8>,
}

impl EthernetFrame {
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        DecodeError::check_len("Ethernet frame", ETHERNET_HEADER_SIZE, data)?;

        let mut destination = [0u8; 6];
        let mut source = [0u8; 6];
        destination.copy_from_slice(&data[0..6]);
        source.copy_from_slice(&data[6..12]);

        Ok(Self {
            destination: MacAddr(destination),
            source: MacAddr(source),
            ethertype: u16::from_be_bytes([data[12], data[13]]),
            payload: data[ETHERNET_HEADER_SIZE..].to_vec(),
        })
    }

    /// Encode the frame, zero-padding it up to the Ethernet minimum
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = (ETHERNET_HEADER_SIZE + self.payload.len()).max(ETHERNET_MIN_SIZE);
        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(&self.destination.0);
        out.extend_from_slice(&self.source.0);
        out.extend_from_slice(&self.ethertype.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out.resize(len, 0);
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn runt_is_rejected() {
        let err = EthernetFrame::from_bytes(&[0u8; 13]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TooShort {
                what: "Ethernet frame",
                needed: 14,
                got: 13
            }
        );
    }

    #[test]
    fn short_frames_are_padded() {
        let fr = EthernetFrame {
            destination: MacAddr::BROADCAST,
            source: MacAddr([0x02, 0, 0, 0, 0, 1]),
            ethertype: 0x8914,
            payload: vec![1, 2, 3],
        };
        let bytes = fr.to_bytes();
        assert_eq!(bytes.len(), ETHERNET_MIN_SIZE);
        assert_eq!(&bytes[12..17], &[0x89, 0x14, 1, 2, 3]);
        assert!(bytes[17..].iter().all(|b| *b == 0));
    }

    #[test]
    fn mac_display() {
        assert_eq!(
            alloc::format!("{}", MacAddr::ALL_FCF_MACS),
            "01:10:18:01:00:02"
        );
        assert!(MacAddr::ALL_FCF_MACS.is_multicast());
    }
}
