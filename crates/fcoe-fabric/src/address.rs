//! Fabric Provided MAC Addresses
//!
//! An FPMA is the 3-byte FC-MAP prefix followed by the 3-byte FC address of
//! the port using it. Ports source their frames from the FPMA of the frame's
//! S_ID, and retarget their peer to the FPMA of an assigned D_ID.

use core::fmt;

use fc_wire::{FcAddress, MacAddr};

/// The FC-MAP prefix of a fabric
///
/// Fabrics sharing one L2 segment must use distinct prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FcMap(pub [u8; 3]);

impl FcMap {
    /// The default FC-MAP from FC-BB-5
    pub const DEFAULT: FcMap = FcMap([0x0E, 0xFC, 0x00]);

    /// The MAC address used on the wire by the holder of `addr`
    #[inline]
    pub fn mac_for(&self, addr: FcAddress) -> MacAddr {
        let [a, b, c] = self.0;
        let [d, e, f] = addr.0;
        MacAddr([a, b, c, d, e, f])
    }
}

impl Default for FcMap {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for FcMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}:{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fpma() {
        let mac = FcMap::DEFAULT.mac_for(FcAddress::new(0xEF, 0x01, 0x00));
        assert_eq!(mac, MacAddr([0x0E, 0xFC, 0x00, 0xEF, 0x01, 0x00]));
        assert_eq!(
            FcMap([0x0E, 0xFC, 0x01]).mac_for(FcAddress::new(0xEF, 0x01, 0x00)),
            MacAddr([0x0E, 0xFC, 0x01, 0xEF, 0x01, 0x00])
        );
    }

    #[test]
    fn fabric_login_server_mac() {
        assert_eq!(
            FcMap::DEFAULT.mac_for(FcAddress::FABRIC_LOGIN).to_string(),
            "0e:fc:00:ff:ff:fe"
        );
    }
}
