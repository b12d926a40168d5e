//! An FCoE fabric switch
//!
//! The crate is split in two layers:
//!
//! * [`port`]: an FCoE port terminating one Ethernet [link]. It learns its
//!   peer, decapsulates FCoE into FC frames for the fabric, and encapsulates
//!   the fabric's replies using Fabric Provided MAC Addresses ([`FcMap`]).
//! * [`switch`]: the fabric itself. Every port added to a [`Switch`] gets a
//!   dispatch worker that serves fabric logins (FLOGI) and assigns FC
//!   addresses from the configured pool.
//!
//! Most users will want one of the [`toolkits`], which fix the mutex type and
//! link implementation:
//!
//! ```no_run
//! # #[cfg(target_os = "linux")]
//! # async fn demo() -> Result<(), fcoe_fabric::port::PortError> {
//! use fcoe_fabric::{FabricConfig, switch::PortType, toolkits::af_packet};
//!
//! let switch = af_packet::new_switch(FabricConfig::default());
//! af_packet::register_port(&switch, "ens1", PortType::F)?;
//! # Ok(())
//! # }
//! ```
//!
//! [link]: port::link

pub mod address;
pub mod config;
pub mod port;
pub mod switch;
pub mod toolkits;

pub use address::FcMap;
pub use config::{FabricConfig, FcidPool};
pub use port::{FcoePort, FrameHandler, Lifecycle, PortError, PortFailure};
pub use switch::{DispatchEnd, PortType, Switch, SwitchPort};

pub use fc_wire;
