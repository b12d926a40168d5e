//! Ethernet links
//!
//! A [`Link`] is a named network interface that can open one raw socket per
//! EtherType. Ports open two of them, one for FIP and one for FCoE.
//!
//! Two implementations are provided:
//!
//! * [`af_packet`]: Linux `AF_PACKET` sockets, in promiscuous mode
//! * [`mem`]: an in-memory link, driven by a [`mem::MemWire`]

use core::fmt;
use std::io;

use fc_wire::MacAddr;

#[cfg(target_os = "linux")]
pub mod af_packet;
pub mod mem;

/// A network interface able to carry FCoE
pub trait Link: Send + Sync + 'static {
    type Socket: RawSocket;

    /// The interface name, e.g. `ens1`
    fn name(&self) -> &str;

    /// The interface MTU, in bytes
    fn mtu(&self) -> usize;

    /// Open a socket receiving every frame of `ethertype` seen on the link
    fn open(&self, ethertype: u16) -> Result<Self::Socket, LinkError>;
}

/// A raw Ethernet socket bound to one EtherType
///
/// Both operations take `&self`: a port's receive worker and its senders use
/// the same socket concurrently.
pub trait RawSocket: Send + Sync + 'static {
    /// Wait for the next frame and copy it into `buf`, returning its length
    fn recv(&self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;

    /// Transmit one complete Ethernet frame to `dst`
    fn send(&self, frame: &[u8], dst: MacAddr) -> impl Future<Output = io::Result<()>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum LinkError {
    InterfaceNotFound(String),
    Io(io::ErrorKind),
}

impl From<io::Error> for LinkError {
    fn from(e: io::Error) -> Self {
        LinkError::Io(e.kind())
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::InterfaceNotFound(name) => write!(f, "no such interface: {name}"),
            LinkError::Io(kind) => write!(f, "link I/O error: {kind}"),
        }
    }
}

impl std::error::Error for LinkError {}
