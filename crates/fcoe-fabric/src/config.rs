//! Fabric configuration

use fc_wire::{FcAddress, Wwn};

use crate::address::FcMap;

/// An inclusive range of FC addresses handed out to logging-in N_Ports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcidPool {
    first: FcAddress,
    last: FcAddress,
}

impl FcidPool {
    /// A pool of `first..=last`. If `first > last` the pool is empty.
    pub const fn new(first: FcAddress, last: FcAddress) -> Self {
        Self { first, last }
    }

    /// All 256 port addresses of one domain and area
    pub const fn area(domain: u8, area: u8) -> Self {
        Self::new(
            FcAddress::new(domain, area, 0x00),
            FcAddress::new(domain, area, 0xFF),
        )
    }

    #[inline]
    pub fn first(&self) -> FcAddress {
        self.first
    }

    #[inline]
    pub fn last(&self) -> FcAddress {
        self.last
    }

    #[inline]
    pub fn contains(&self, addr: FcAddress) -> bool {
        (self.first.as_u32()..=self.last.as_u32()).contains(&addr.as_u32())
    }

    pub fn len(&self) -> usize {
        (self.last.as_u32() + 1).saturating_sub(self.first.as_u32()) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FcidPool {
    fn default() -> Self {
        Self::area(0xEF, 0x01)
    }
}

/// Everything a [`Switch`](crate::Switch) and its ports need to know about
/// the fabric they belong to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricConfig {
    /// Prefix of the MAC addresses derived from FC addresses
    pub fc_map: FcMap,
    /// Addresses assigned by fabric login
    pub fcid_pool: FcidPool,
    /// Port name advertised by the fabric in its login replies
    pub wwpn: Wwn,
    /// Node name advertised by the fabric in its login replies
    pub wwnn: Wwn,
    /// Responder exchange ID used in every reply
    pub reply_rx_id: u16,
    /// Resource allocation timeout, in milliseconds
    pub r_a_tov: u32,
    /// Error detect timeout, in milliseconds
    pub e_d_tov: u32,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            fc_map: FcMap::DEFAULT,
            fcid_pool: FcidPool::default(),
            wwpn: Wwn(0x2001_0efc_0000_0001),
            wwnn: Wwn(0x1000_0efc_0000_0001),
            reply_rx_id: 0x0001,
            r_a_tov: 10_000,
            e_d_tov: 2_000,
        }
    }
}
