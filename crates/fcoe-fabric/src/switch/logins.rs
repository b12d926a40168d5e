//! The fabric login table
//!
//! Every successful FLOGI holds one FC address from the pool until the
//! N_Port logs in again with another port name on the same switch port, or
//! the switch port goes away.

use fc_wire::{FcAddress, Wwn};

use crate::config::FcidPool;

/// One logged-in N_Port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub fcid: FcAddress,
    pub wwpn: Wwn,
    pub wwnn: Wwn,
    /// Index of the switch port the login arrived on
    pub port: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AllocError {
    PoolExhausted,
}

/// Logins, ordered by FC address
#[derive(Debug, Default)]
pub struct LoginTable {
    logins: Vec<Login>,
}

impl LoginTable {
    pub const fn new() -> Self {
        Self { logins: Vec::new() }
    }

    /// Log `wwpn` in through switch port `port`, returning its FC address
    ///
    /// A port name that is already logged in keeps its address. Any other
    /// login previously made through `port` is implicitly logged out.
    pub fn login(
        &mut self,
        pool: &FcidPool,
        port: usize,
        wwpn: Wwn,
        wwnn: Wwn,
    ) -> Result<FcAddress, AllocError> {
        self.logins.retain(|l| l.port != port || l.wwpn == wwpn);

        if let Some(existing) = self.logins.iter_mut().find(|l| l.wwpn == wwpn) {
            existing.port = port;
            existing.wwnn = wwnn;
            return Ok(existing.fcid);
        }

        let fcid = self.lowest_free(pool)?;
        let pos = self.logins.partition_point(|l| l.fcid < fcid);
        self.logins.insert(
            pos,
            Login {
                fcid,
                wwpn,
                wwnn,
                port,
            },
        );
        Ok(fcid)
    }

    /// Find the lowest address of `pool` not held by any login
    fn lowest_free(&self, pool: &FcidPool) -> Result<FcAddress, AllocError> {
        let mut next = pool.first().as_u32();
        for held in self
            .logins
            .iter()
            .map(|l| l.fcid)
            .filter(|a| pool.contains(*a))
            .map(|a| a.as_u32())
        {
            if held > next {
                break;
            }
            next = held + 1;
        }

        if next > pool.last().as_u32() {
            Err(AllocError::PoolExhausted)
        } else {
            Ok(FcAddress::from_u32(next))
        }
    }

    /// Log out every N_Port that logged in through `port`
    pub fn release_port(&mut self, port: usize) -> Vec<Login> {
        let (gone, kept) = self.logins.drain(..).partition(|l| l.port == port);
        self.logins = kept;
        gone
    }

    pub fn get(&self, wwpn: Wwn) -> Option<&Login> {
        self.logins.iter().find(|l| l.wwpn == wwpn)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Login> {
        self.logins.iter()
    }

    pub fn len(&self) -> usize {
        self.logins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const HOST_A: Wwn = Wwn(0x1000_000d_ec30_9880);
    const HOST_B: Wwn = Wwn(0x1000_000d_ec30_9890);
    const HOST_C: Wwn = Wwn(0x1000_000d_ec30_98a0);
    const NODE: Wwn = Wwn(0x2000_000d_ec30_9881);

    fn addr(port: u8) -> FcAddress {
        FcAddress::new(0xEF, 0x01, port)
    }

    #[test]
    fn lowest_free_first() {
        let pool = FcidPool::default();
        let mut table = LoginTable::new();
        assert_eq!(table.login(&pool, 0, HOST_A, NODE), Ok(addr(0x00)));
        assert_eq!(table.login(&pool, 1, HOST_B, NODE), Ok(addr(0x01)));
        assert_eq!(table.login(&pool, 2, HOST_C, NODE), Ok(addr(0x02)));

        // free the middle one, it's handed out next
        let gone = table.release_port(1);
        assert_eq!(gone.len(), 1);
        assert_eq!(gone[0].wwpn, HOST_B);
        assert_eq!(table.login(&pool, 3, Wwn(42), NODE), Ok(addr(0x01)));

        let fcids: Vec<_> = table.iter().map(|l| l.fcid).collect();
        assert_eq!(fcids, vec![addr(0x00), addr(0x01), addr(0x02)]);
    }

    #[test]
    fn relogin_is_stable() {
        let pool = FcidPool::default();
        let mut table = LoginTable::new();
        assert_eq!(table.login(&pool, 0, HOST_A, NODE), Ok(addr(0x00)));
        assert_eq!(table.login(&pool, 0, HOST_A, NODE), Ok(addr(0x00)));
        assert_eq!(table.len(), 1);

        // a new port name on the same switch port replaces the old login
        assert_eq!(table.login(&pool, 0, HOST_B, NODE), Ok(addr(0x00)));
        assert_eq!(table.len(), 1);
        assert!(table.get(HOST_A).is_none());
        assert_eq!(table.get(HOST_B).map(|l| l.port), Some(0));
    }

    #[test]
    fn exhaustion() {
        let pool = FcidPool::new(addr(0x10), addr(0x11));
        let mut table = LoginTable::new();
        assert_eq!(table.login(&pool, 0, HOST_A, NODE), Ok(addr(0x10)));
        assert_eq!(table.login(&pool, 1, HOST_B, NODE), Ok(addr(0x11)));
        assert_eq!(
            table.login(&pool, 2, HOST_C, NODE),
            Err(AllocError::PoolExhausted)
        );
        assert!(table.get(HOST_C).is_none());

        table.release_port(0);
        assert_eq!(table.login(&pool, 2, HOST_C, NODE), Ok(addr(0x10)));

        let empty = FcidPool::new(addr(0x11), addr(0x10));
        assert_eq!(
            LoginTable::new().login(&empty, 0, HOST_A, NODE),
            Err(AllocError::PoolExhausted)
        );
    }
}
