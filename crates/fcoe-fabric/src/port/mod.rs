//! FCoE ports
//!
//! An [`FcoePort`] terminates one Ethernet link. Once [started], it runs two
//! receive workers, one per socket:
//!
//! * FIP: frames are peer-validated and their operation logged
//! * FCoE: frames are peer-validated, decapsulated, and either handed to the
//!   port's [`FrameHandler`] or queued for [`FcoePort::receive`]
//!
//! The first source MAC seen on either socket becomes the port's **peer**.
//! Frames from any other source are dropped. Sending a frame with an assigned
//! D_ID retargets the peer to that address's FPMA, after the frame itself has
//! gone to the previous peer (or to that FPMA, if there was none).
//!
//! A port goes through the [`Lifecycle`] states `Created -> Started`, and from
//! there to either `Failed` or `Closed`. A transport error on either socket,
//! an undecodable FIP frame, or an undecodable FC frame fails the port and
//! stops both workers.
//!
//! [started]: FcoePort::start

use core::fmt;
use std::{io, sync::Arc};

use fc_wire::{
    DecodeError, Eof, EthernetFrame, FCOE_ETHERTYPE, FIP_ETHERTYPE, FcFrame, FcoeFrame,
    MAX_FCOE_MTU, MIN_FCOE_MTU, MacAddr, Sof, fip::FipOp,
};
use log::{debug, error, info, trace, warn};
use maitake_sync::WaitQueue;
use mutex::{BlockingMutex, ConstInit, ScopedRawMutex};
use tokio::{
    select,
    sync::{Mutex, mpsc, oneshot},
};

use crate::{address::FcMap, switch::SwitchPort};

pub mod link;

use link::{Link, LinkError, RawSocket};

/// Receives every FCoE frame of a port instead of its queue
///
/// The FC frame is passed undecoded, exactly as it was encapsulated.
pub trait FrameHandler: Send + Sync + 'static {
    fn handle(&self, sof: Sof, fc: &[u8], eof: Eof);
}

pub struct FcoePort<R: ScopedRawMutex, L: Link> {
    inner: Arc<PortInner<R, L>>,
}

struct PortInner<R: ScopedRawMutex, L: Link> {
    identity: String,
    link: L,
    fc_map: FcMap,
    state: BlockingMutex<R, PortState<L::Socket>>,
    queue_tx: mpsc::Sender<Handoff>,
    queue_rx: Mutex<mpsc::Receiver<Handoff>>,
    closer: WaitQueue,
}

/// A received frame, and the ack its worker waits on before reading again
type Handoff = (FcFrame, oneshot::Sender<()>);

struct PortState<S> {
    lifecycle: Lifecycle,
    peer: Option<MacAddr>,
    fcoe: Option<Arc<S>>,
    handler: Option<Arc<dyn FrameHandler>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    Created,
    Started,
    Failed(PortFailure),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    Fip,
    Fcoe,
}

/// Why a port stopped on its own
#[derive(Debug, Clone, PartialEq)]
pub enum PortFailure {
    /// A socket read or write failed
    Transport {
        socket: SocketKind,
        kind: io::ErrorKind,
    },
    /// A frame on the FIP socket had no valid Ethernet header
    FipDecode(DecodeError),
    /// An FCoE frame carried an undecodable FC frame
    Protocol(DecodeError),
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PortError {
    InsufficientMtu { mtu: usize },
    AlreadyStarted,
    NotStarted,
    NoPeer,
    Failed(PortFailure),
    Closed,
    Link(LinkError),
}

enum WorkerExit {
    Closed,
    Failed(PortFailure),
}

struct FipWorker<R: ScopedRawMutex, L: Link> {
    port: FcoePort<R, L>,
    skt: Arc<L::Socket>,
}

struct FcoeWorker<R: ScopedRawMutex, L: Link> {
    port: FcoePort<R, L>,
    skt: Arc<L::Socket>,
    handler: Option<Arc<dyn FrameHandler>>,
}

// ---- impl FcoePort ----

impl<R, L> FcoePort<R, L>
where
    R: ScopedRawMutex + ConstInit + Send + Sync + 'static,
    L: Link,
{
    /// Create a port on `link`
    ///
    /// Fails if the link's MTU cannot carry a full FC frame.
    pub fn new(link: L, fc_map: FcMap) -> Result<Self, PortError> {
        let mtu = link.mtu();
        if mtu < MIN_FCOE_MTU {
            error!(
                "MTU of {} too small for FCoE: {mtu} < {MIN_FCOE_MTU}",
                link.name()
            );
            return Err(PortError::InsufficientMtu { mtu });
        }

        // The FCoE worker blocks on each frame's ack, so at most one is queued
        let (queue_tx, queue_rx) = mpsc::channel(1);
        Ok(Self {
            inner: Arc::new(PortInner {
                identity: format!("FCoE/{}", link.name()),
                link,
                fc_map,
                state: BlockingMutex::new(PortState {
                    lifecycle: Lifecycle::Created,
                    peer: None,
                    fcoe: None,
                    handler: None,
                }),
                queue_tx,
                queue_rx: Mutex::new(queue_rx),
                closer: WaitQueue::new(),
            }),
        })
    }

    /// Route inbound FCoE frames to `handler` instead of the receive queue
    ///
    /// Only possible before the port is started.
    pub fn set_handler(&self, handler: impl FrameHandler) -> Result<(), PortError> {
        self.inner.state.with_lock(|st| match st.lifecycle {
            Lifecycle::Created => {
                st.handler = Some(Arc::new(handler));
                Ok(())
            }
            _ => Err(PortError::AlreadyStarted),
        })
    }

    /// Open both sockets and spawn the receive workers
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), PortError> {
        self.inner.state.with_lock(|st| match &st.lifecycle {
            Lifecycle::Created => {
                st.lifecycle = Lifecycle::Started;
                Ok(())
            }
            Lifecycle::Started => Err(PortError::AlreadyStarted),
            Lifecycle::Failed(f) => Err(PortError::Failed(f.clone())),
            Lifecycle::Closed => Err(PortError::Closed),
        })?;

        let sockets = self
            .inner
            .link
            .open(FIP_ETHERTYPE)
            .and_then(|fip| Ok((fip, self.inner.link.open(FCOE_ETHERTYPE)?)));
        let (fip, fcoe) = match sockets {
            Ok((fip, fcoe)) => (Arc::new(fip), Arc::new(fcoe)),
            Err(e) => {
                error!("[{}] Failed to open sockets: {e}", self.identity());
                self.inner.state.with_lock(|st| {
                    if st.lifecycle == Lifecycle::Started {
                        st.lifecycle = Lifecycle::Created;
                    }
                });
                return Err(PortError::Link(e));
            }
        };

        let handler = self.inner.state.with_lock(|st| {
            st.fcoe = Some(fcoe.clone());
            st.handler.clone()
        });

        let fip_worker = FipWorker {
            port: self.clone(),
            skt: fip,
        };
        let fcoe_worker = FcoeWorker {
            port: self.clone(),
            skt: fcoe,
            handler,
        };
        tokio::task::spawn(fip_worker.run());
        tokio::task::spawn(fcoe_worker.run());

        info!("[{}] Started", self.identity());
        Ok(())
    }

    /// Encapsulate `frame` and transmit it to the current peer
    ///
    /// The source MAC is the FPMA of the frame's S_ID. If the frame's D_ID
    /// is assigned, the peer becomes the FPMA of the D_ID for every later
    /// frame, and for the validation of inbound frames. With no peer learned
    /// yet, such a frame goes straight to that FPMA. An unassigned D_ID with
    /// no peer fails with [`PortError::NoPeer`].
    pub async fn send(&self, frame: &FcFrame) -> Result<(), PortError> {
        let fc_map = self.inner.fc_map;
        let (skt, dst) = self.inner.state.with_lock(|st| {
            match &st.lifecycle {
                Lifecycle::Started => {}
                Lifecycle::Created => return Err(PortError::NotStarted),
                Lifecycle::Failed(f) => return Err(PortError::Failed(f.clone())),
                Lifecycle::Closed => return Err(PortError::Closed),
            }
            let skt = st.fcoe.clone().ok_or(PortError::NotStarted)?;
            let next = (!frame.destination.is_unassigned())
                .then(|| fc_map.mac_for(frame.destination));
            let dst = st.peer.or(next).ok_or(PortError::NoPeer)?;
            if let Some(next) = next {
                match st.peer {
                    None => info!("[{}] Learned peer {next} from D_ID", self.identity()),
                    Some(prev) if prev != next => {
                        info!("[{}] Retargeting peer {prev} -> {next}", self.identity())
                    }
                    Some(_) => {}
                }
                st.peer = Some(next);
            }
            Ok((skt, dst))
        })?;

        let eth = EthernetFrame {
            destination: dst,
            source: fc_map.mac_for(frame.source),
            ethertype: FCOE_ETHERTYPE,
            payload: FcoeFrame::encapsulate(frame).to_bytes(),
        };
        trace!(
            "[{}] Sending {} -> {} ox_id:{:04x}",
            self.identity(),
            frame.source,
            frame.destination,
            frame.ox_id
        );

        if let Err(e) = skt.send(&eth.to_bytes(), dst).await {
            error!("[{}] Failed to send: {e}", self.identity());
            self.fail(PortFailure::Transport {
                socket: SocketKind::Fcoe,
                kind: e.kind(),
            });
            return Err(PortError::Link(e.into()));
        }
        Ok(())
    }

    /// Wait for the next FC frame received on the port
    ///
    /// Frames already queued are delivered before a failure is reported.
    pub async fn receive(&self) -> Result<FcFrame, PortError> {
        let mut rx = self.inner.queue_rx.lock().await;
        select! {
            biased;
            fr = rx.recv() => {
                let (frame, ack) = fr.ok_or(PortError::Closed)?;
                let _ = ack.send(());
                Ok(frame)
            }
            _c = self.inner.closer.wait() => Err(self.terminal_error()),
        }
    }

    /// Stop both workers
    ///
    /// Pending and future receives fail with [`PortError::Closed`]. Closing a
    /// failed port keeps its failure.
    pub fn close(&self) {
        let closed = self.inner.state.with_lock(|st| match st.lifecycle {
            Lifecycle::Created | Lifecycle::Started => {
                st.lifecycle = Lifecycle::Closed;
                st.fcoe = None;
                true
            }
            Lifecycle::Failed(_) | Lifecycle::Closed => false,
        });
        self.inner.closer.close();
        if closed {
            info!("[{}] Closed", self.identity());
        }
    }

    /// `FCoE/<interface>`
    pub fn identity(&self) -> &str {
        &self.inner.identity
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.state.with_lock(|st| st.lifecycle.clone())
    }

    pub fn peer(&self) -> Option<MacAddr> {
        self.inner.state.with_lock(|st| st.peer)
    }

    pub fn fc_map(&self) -> FcMap {
        self.inner.fc_map
    }

    /// Accept frames from `observed` only if it is, or becomes, the peer
    fn validate_peer(&self, observed: MacAddr) -> bool {
        self.inner.state.with_lock(|st| match st.peer {
            None => {
                info!("[{}] Learned peer {observed}", self.identity());
                st.peer = Some(observed);
                true
            }
            Some(peer) if peer == observed => true,
            Some(peer) => {
                warn!(
                    "[{}] Ignoring frame from {observed}, peer is {peer}",
                    self.identity()
                );
                false
            }
        })
    }

    fn fail(&self, failure: PortFailure) {
        let failed = self.inner.state.with_lock(|st| {
            if st.lifecycle == Lifecycle::Started {
                st.lifecycle = Lifecycle::Failed(failure.clone());
                st.fcoe = None;
                true
            } else {
                false
            }
        });
        self.inner.closer.close();
        if failed {
            error!("[{}] Port failed: {failure}", self.identity());
        }
    }

    fn terminal_error(&self) -> PortError {
        self.inner.state.with_lock(|st| match &st.lifecycle {
            Lifecycle::Failed(f) => PortError::Failed(f.clone()),
            _ => PortError::Closed,
        })
    }

    /// Read one frame from `skt`, unless the port is stopped first
    async fn read(
        &self,
        socket: SocketKind,
        skt: &L::Socket,
        buf: &mut [u8],
    ) -> Result<usize, WorkerExit> {
        let rd = skt.recv(buf);
        let close = self.inner.closer.wait();

        select! {
            r = rd => r.map_err(|e| {
                warn!("[{}] {socket} recv failed: {e}", self.identity());
                WorkerExit::Failed(PortFailure::Transport { socket, kind: e.kind() })
            }),
            _c = close => Err(WorkerExit::Closed),
        }
    }
}

impl<R: ScopedRawMutex, L: Link> Clone for FcoePort<R, L> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R, L> SwitchPort for FcoePort<R, L>
where
    R: ScopedRawMutex + ConstInit + Send + Sync + 'static,
    L: Link,
{
    fn identity(&self) -> &str {
        FcoePort::identity(self)
    }

    fn send(&self, frame: &FcFrame) -> impl Future<Output = Result<(), PortError>> + Send {
        FcoePort::send(self, frame)
    }

    fn receive(&self) -> impl Future<Output = Result<FcFrame, PortError>> + Send {
        FcoePort::receive(self)
    }
}

// ---- impl workers ----

impl WorkerExit {
    fn report<R, L>(self, port: &FcoePort<R, L>, socket: SocketKind)
    where
        R: ScopedRawMutex + ConstInit + Send + Sync + 'static,
        L: Link,
    {
        match self {
            WorkerExit::Closed => debug!("[{}] {socket} worker stopped", port.identity()),
            WorkerExit::Failed(f) => port.fail(f),
        }
    }
}

impl<R, L> FipWorker<R, L>
where
    R: ScopedRawMutex + ConstInit + Send + Sync + 'static,
    L: Link,
{
    async fn run(self) {
        let exit = self.run_inner().await;
        exit.report(&self.port, SocketKind::Fip);
    }

    async fn run_inner(&self) -> WorkerExit {
        let mut raw_buf = vec![0u8; MAX_FCOE_MTU];

        loop {
            let ct = match self.port.read(SocketKind::Fip, &self.skt, &mut raw_buf).await {
                Ok(ct) => ct,
                Err(exit) => return exit,
            };

            let frame = match EthernetFrame::from_bytes(&raw_buf[..ct]) {
                Ok(frame) => frame,
                Err(e) => {
                    error!("[{}] Bad FIP frame: {e}", self.port.identity());
                    return WorkerExit::Failed(PortFailure::FipDecode(e));
                }
            };
            if !self.port.validate_peer(frame.source) {
                continue;
            }

            debug!(
                "[{}] FIP [{} -> {}]",
                self.port.identity(),
                frame.source,
                frame.destination
            );
            if frame.destination == MacAddr::ALL_FCF_MACS {
                match FipOp::peek(&frame.payload) {
                    Ok(op) => info!("[{}] FIP Type: {op}", self.port.identity()),
                    Err(e) => warn!("[{}] Ignoring FIP frame: {e}", self.port.identity()),
                }
            }
        }
    }
}

impl<R, L> FcoeWorker<R, L>
where
    R: ScopedRawMutex + ConstInit + Send + Sync + 'static,
    L: Link,
{
    async fn run(self) {
        let exit = self.run_inner().await;
        exit.report(&self.port, SocketKind::Fcoe);
    }

    async fn run_inner(&self) -> WorkerExit {
        let mut raw_buf = vec![0u8; MAX_FCOE_MTU];

        loop {
            let ct = match self.port.read(SocketKind::Fcoe, &self.skt, &mut raw_buf).await {
                Ok(ct) => ct,
                Err(exit) => return exit,
            };

            let eth = match EthernetFrame::from_bytes(&raw_buf[..ct]) {
                Ok(eth) => eth,
                Err(e) => {
                    warn!("[{}] Dropping frame: {e}", self.port.identity());
                    continue;
                }
            };
            if eth.ethertype != FCOE_ETHERTYPE {
                trace!(
                    "[{}] Dropping ethertype {:04x}",
                    self.port.identity(),
                    eth.ethertype
                );
                continue;
            }
            if !self.port.validate_peer(eth.source) {
                continue;
            }

            let fcoe = match FcoeFrame::from_bytes(&eth.payload) {
                Ok(fcoe) => fcoe,
                Err(e) => {
                    warn!("[{}] Dropping FCoE frame: {e}", self.port.identity());
                    continue;
                }
            };
            if let Some(handler) = self.handler.as_ref() {
                handler.handle(fcoe.sof, &fcoe.payload, fcoe.eof);
                continue;
            }

            let frame = match fcoe.fc_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    error!("[{}] Bad FC frame: {e}", self.port.identity());
                    return WorkerExit::Failed(PortFailure::Protocol(e));
                }
            };
            trace!(
                "[{}] Received {} -> {} ox_id:{:04x}",
                self.port.identity(),
                frame.source,
                frame.destination,
                frame.ox_id
            );

            let (ack_tx, ack_rx) = oneshot::channel();
            let push = self.port.inner.queue_tx.send((frame, ack_tx));
            select! {
                r = push => if r.is_err() {
                    return WorkerExit::Closed;
                },
                _c = self.port.inner.closer.wait() => return WorkerExit::Closed,
            }
            // Hold the next read until `receive` takes the frame. A dropped
            // ack counts as taken.
            select! {
                _r = ack_rx => {}
                _c = self.port.inner.closer.wait() => return WorkerExit::Closed,
            }
        }
    }
}

// ---- impl errors ----

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketKind::Fip => f.write_str("FIP"),
            SocketKind::Fcoe => f.write_str("FCoE"),
        }
    }
}

impl fmt::Display for PortFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortFailure::Transport { socket, kind } => write!(f, "{socket} socket error: {kind}"),
            PortFailure::FipDecode(e) => write!(f, "bad FIP frame: {e}"),
            PortFailure::Protocol(e) => write!(f, "bad FC frame: {e}"),
        }
    }
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortError::InsufficientMtu { mtu } => {
                write!(f, "MTU {mtu} is below the FCoE minimum of {MIN_FCOE_MTU}")
            }
            PortError::AlreadyStarted => f.write_str("port already started"),
            PortError::NotStarted => f.write_str("port not started"),
            PortError::NoPeer => f.write_str("no peer learned yet"),
            PortError::Failed(failure) => write!(f, "port failed: {failure}"),
            PortError::Closed => f.write_str("port closed"),
            PortError::Link(e) => write!(f, "{e}"),
        }
    }
}

impl From<LinkError> for PortError {
    fn from(e: LinkError) -> Self {
        PortError::Link(e)
    }
}

impl std::error::Error for PortError {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::port::link::mem::MemLink;
    use mutex::raw_impls::cs::CriticalSectionRawMutex;

    type TestPort = FcoePort<CriticalSectionRawMutex, MemLink>;

    #[test]
    fn mtu_check() {
        let (link, _wire) = MemLink::new("mem0", 1500);
        assert_eq!(
            TestPort::new(link, FcMap::DEFAULT).err(),
            Some(PortError::InsufficientMtu { mtu: 1500 })
        );

        let (link, _wire) = MemLink::new("mem0", MIN_FCOE_MTU);
        let port = TestPort::new(link, FcMap::DEFAULT).unwrap();
        assert_eq!(port.identity(), "FCoE/mem0");
        assert_eq!(port.lifecycle(), Lifecycle::Created);
    }

    #[test]
    fn peer_learning() {
        let (link, _wire) = MemLink::new("mem0", 9000);
        let port = TestPort::new(link, FcMap::DEFAULT).unwrap();
        let a = MacAddr([0, 0x0d, 0xec, 0x30, 0x98, 0x80]);
        let b = MacAddr([0, 0x0d, 0xec, 0x30, 0x98, 0x81]);

        assert_eq!(port.peer(), None);
        assert!(port.validate_peer(a));
        assert!(port.validate_peer(a));
        assert!(!port.validate_peer(b));
        assert_eq!(port.peer(), Some(a));
    }

    #[tokio::test]
    async fn lifecycle_errors() {
        let (link, _wire) = MemLink::new("mem0", 9000);
        let port = TestPort::new(link, FcMap::DEFAULT).unwrap();
        let frame = FcFrame {
            sof: Sof::I3,
            eof: Eof::T,
            r_ctl: fc_wire::fc::RCtl::ELS_UNSOLICITED_CONTROL,
            fc_type: fc_wire::FcType::ELS,
            cs_ctl: 0,
            source: fc_wire::FcAddress::FABRIC_LOGIN,
            destination: fc_wire::FcAddress::UNASSIGNED,
            f_ctl: fc_wire::fc::FCtl::LAST_RESPONSE,
            seq_id: 0,
            df_ctl: 0,
            seq_cnt: 0,
            ox_id: 1,
            rx_id: 1,
            parameter: 0,
            payload: vec![],
        };

        assert_eq!(port.send(&frame).await, Err(PortError::NotStarted));
        port.start().unwrap();
        assert_eq!(port.start(), Err(PortError::AlreadyStarted));
        assert_eq!(port.send(&frame).await, Err(PortError::NoPeer));
        assert_eq!(port.peer(), None);

        port.close();
        assert_eq!(port.lifecycle(), Lifecycle::Closed);
        assert_eq!(port.receive().await, Err(PortError::Closed));
        assert_eq!(port.send(&frame).await, Err(PortError::Closed));
        assert_eq!(port.start(), Err(PortError::Closed));
    }
}
