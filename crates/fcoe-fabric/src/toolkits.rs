//! Ready-made switch and port types
//!
//! Both toolkits use a critical-section mutex. Locks are held for table
//! updates only, never across an await.
//!
//! With the `std` implementation of `critical-section` there is a single
//! critical section per process: port state and both switch tables serialize
//! on the same lock, even across switches. None of these locks is taken while
//! another is held, so sharing one costs contention only. Embedders that need independent
//! locks can build `FcoePort` and `Switch` over their own [`ScopedRawMutex`].
//!
//! [`ScopedRawMutex`]: mutex::ScopedRawMutex

#[cfg(target_os = "linux")]
pub mod af_packet {
    use mutex::raw_impls::cs::CriticalSectionRawMutex;
    use tokio::task::JoinHandle;

    use crate::{
        config::FabricConfig,
        port::{FcoePort, PortError, link::af_packet::AfPacketLink},
        switch::{DispatchEnd, PortType, Switch},
    };

    pub type FabricPort = FcoePort<CriticalSectionRawMutex, AfPacketLink>;
    pub type FabricSwitch = Switch<CriticalSectionRawMutex, FabricPort>;

    pub fn new_switch(config: FabricConfig) -> FabricSwitch {
        Switch::new(config)
    }

    /// Open `ifname`, start an FCoE port on it, and add it to `switch`
    ///
    /// Must be called from within a tokio runtime.
    pub fn register_port(
        switch: &FabricSwitch,
        ifname: &str,
        port_type: PortType,
    ) -> Result<JoinHandle<DispatchEnd>, PortError> {
        let link = AfPacketLink::by_name(ifname)?;
        let port = FabricPort::new(link, switch.config().fc_map)?;
        port.start()?;
        Ok(switch.add_port(port, port_type))
    }
}

pub mod mem {
    use mutex::raw_impls::cs::CriticalSectionRawMutex;

    use crate::{
        config::FabricConfig,
        port::{
            FcoePort, PortError,
            link::mem::{MemLink, MemWire},
        },
        switch::Switch,
    };

    pub type MemPort = FcoePort<CriticalSectionRawMutex, MemLink>;
    pub type MemSwitch = Switch<CriticalSectionRawMutex, MemPort>;

    pub fn new_switch(config: FabricConfig) -> MemSwitch {
        Switch::new(config)
    }

    /// A port on a fresh in-memory link. The port is not started.
    pub fn new_port(
        name: &str,
        mtu: usize,
        config: &FabricConfig,
    ) -> Result<(MemPort, MemWire), PortError> {
        let (link, wire) = MemLink::new(name, mtu);
        let port = MemPort::new(link, config.fc_map)?;
        Ok((port, wire))
    }
}
