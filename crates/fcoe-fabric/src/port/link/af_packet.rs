//! Linux `AF_PACKET` links
//!
//! Each socket is bound to one interface and one EtherType, and puts the
//! interface in promiscuous mode for as long as it is open: FCoE frames are
//! addressed to FPMAs, not to the interface's own MAC.
//!
//! Opening a socket needs `CAP_NET_RAW`.

use std::{
    ffi::CString,
    fs, io, mem,
    os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
};

use fc_wire::MacAddr;
use log::{debug, trace};
use tokio::io::unix::AsyncFd;

use super::{Link, LinkError, RawSocket};

pub struct AfPacketLink {
    name: String,
    index: u32,
    mtu: usize,
}

pub struct AfPacketSocket {
    fd: AsyncFd<OwnedFd>,
    ifindex: u32,
    ethertype: u16,
}

// ---- impls ----

impl AfPacketLink {
    /// Look up an interface and its MTU
    pub fn by_name(name: &str) -> Result<Self, LinkError> {
        let not_found = || LinkError::InterfaceNotFound(name.to_string());
        let cname = CString::new(name).map_err(|_| not_found())?;
        let index = unsafe { libc::if_nametoindex(cname.as_ptr()) };
        if index == 0 {
            return Err(not_found());
        }

        let mtu = fs::read_to_string(format!("/sys/class/net/{name}/mtu"))?
            .trim()
            .parse()
            .map_err(|_| LinkError::Io(io::ErrorKind::InvalidData))?;

        debug!("Found interface {name} (index {index}, mtu {mtu})");
        Ok(Self {
            name: name.to_string(),
            index,
            mtu,
        })
    }
}

impl Link for AfPacketLink {
    type Socket = AfPacketSocket;

    fn name(&self) -> &str {
        &self.name
    }

    fn mtu(&self) -> usize {
        self.mtu
    }

    /// Must be called from within a tokio runtime
    fn open(&self, ethertype: u16) -> Result<AfPacketSocket, LinkError> {
        let raw = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                libc::c_int::from(ethertype.to_be()),
            )
        };
        if raw < 0 {
            return Err(io::Error::last_os_error().into());
        }
        // SAFETY: `raw` is a freshly opened descriptor nobody else owns
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let addr = sockaddr_ll(self.index, ethertype, None);
        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                (&addr as *const libc::sockaddr_ll).cast(),
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error().into());
        }

        set_promiscuous(fd.as_raw_fd(), self.index)?;

        Ok(AfPacketSocket {
            fd: AsyncFd::new(fd)?,
            ifindex: self.index,
            ethertype,
        })
    }
}

impl RawSocket for AfPacketSocket {
    /// Frames this host transmitted itself are skipped
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.readable().await?;
            let res = guard.try_io(|fd| {
                // SAFETY: sockaddr_ll is plain old data
                let mut from: libc::sockaddr_ll = unsafe { mem::zeroed() };
                let mut len = mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;
                let rc = unsafe {
                    libc::recvfrom(
                        fd.as_raw_fd(),
                        buf.as_mut_ptr().cast(),
                        buf.len(),
                        0,
                        (&mut from as *mut libc::sockaddr_ll).cast(),
                        &mut len,
                    )
                };
                if rc < 0 {
                    Err(io::Error::last_os_error())
                } else if is_outgoing(&from) {
                    Ok(None)
                } else {
                    Ok(Some(rc as usize))
                }
            });
            match res {
                Ok(Ok(Some(n))) => return Ok(n),
                Ok(Ok(None)) => trace!("Skipping outgoing frame on ifindex {}", self.ifindex),
                Ok(Err(e)) => return Err(e),
                Err(_would_block) => continue,
            }
        }
    }

    async fn send(&self, frame: &[u8], dst: MacAddr) -> io::Result<()> {
        let addr = sockaddr_ll(self.ifindex, self.ethertype, Some(dst));
        loop {
            let mut guard = self.fd.writable().await?;
            let res = guard.try_io(|fd| {
                let rc = unsafe {
                    libc::sendto(
                        fd.as_raw_fd(),
                        frame.as_ptr().cast(),
                        frame.len(),
                        0,
                        (&addr as *const libc::sockaddr_ll).cast(),
                        mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
                    )
                };
                if rc < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(())
                }
            });
            match res {
                Ok(res) => return res,
                Err(_would_block) => continue,
            }
        }
    }
}

fn sockaddr_ll(ifindex: u32, ethertype: u16, dst: Option<MacAddr>) -> libc::sockaddr_ll {
    // SAFETY: sockaddr_ll is plain old data
    let mut addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
    addr.sll_family = libc::AF_PACKET as libc::c_ushort;
    addr.sll_protocol = ethertype.to_be();
    addr.sll_ifindex = ifindex as libc::c_int;
    if let Some(dst) = dst {
        addr.sll_halen = 6;
        addr.sll_addr[..6].copy_from_slice(&dst.octets());
    }
    addr
}

fn is_outgoing(from: &libc::sockaddr_ll) -> bool {
    from.sll_pkttype == libc::PACKET_OUTGOING as libc::c_uchar
}

fn set_promiscuous(fd: RawFd, ifindex: u32) -> io::Result<()> {
    // SAFETY: packet_mreq is plain old data
    let mut mreq: libc::packet_mreq = unsafe { mem::zeroed() };
    mreq.mr_ifindex = ifindex as libc::c_int;
    mreq.mr_type = libc::PACKET_MR_PROMISC as libc::c_ushort;
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_PACKET,
            libc::PACKET_ADD_MEMBERSHIP,
            (&mreq as *const libc::packet_mreq).cast(),
            mem::size_of::<libc::packet_mreq>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}
