//! An in-memory link
//!
//! [`MemLink::new`] returns the link and the [`MemWire`] at its other end.
//! The wire injects inbound frames (or socket errors) per EtherType and
//! observes every frame the link transmits.

use std::{collections::HashMap, io};

use fc_wire::{FCOE_ETHERTYPE, FIP_ETHERTYPE, MacAddr};
use mutex::{BlockingMutex, raw_impls::cs::CriticalSectionRawMutex};
use tokio::sync::{
    Mutex,
    mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
};

use super::{Link, LinkError, RawSocket};

type Inbound = io::Result<Vec<u8>>;

/// A frame transmitted by one of the link's sockets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub ethertype: u16,
    pub dst: MacAddr,
    pub bytes: Vec<u8>,
}

pub struct MemLink {
    name: String,
    mtu: usize,
    inbound: BlockingMutex<CriticalSectionRawMutex, HashMap<u16, UnboundedReceiver<Inbound>>>,
    sent: UnboundedSender<SentFrame>,
}

pub struct MemWire {
    inbound: HashMap<u16, UnboundedSender<Inbound>>,
    sent: UnboundedReceiver<SentFrame>,
}

pub struct MemSocket {
    ethertype: u16,
    rx: Mutex<UnboundedReceiver<Inbound>>,
    sent: UnboundedSender<SentFrame>,
}

// ---- impls ----

impl MemLink {
    /// A link carrying FIP and FCoE
    pub fn new(name: &str, mtu: usize) -> (MemLink, MemWire) {
        let (sent_tx, sent_rx) = unbounded_channel();
        let mut rxs = HashMap::new();
        let mut txs = HashMap::new();
        for ethertype in [FIP_ETHERTYPE, FCOE_ETHERTYPE] {
            let (tx, rx) = unbounded_channel();
            rxs.insert(ethertype, rx);
            txs.insert(ethertype, tx);
        }

        let link = MemLink {
            name: name.to_string(),
            mtu,
            inbound: BlockingMutex::new(rxs),
            sent: sent_tx,
        };
        let wire = MemWire {
            inbound: txs,
            sent: sent_rx,
        };
        (link, wire)
    }
}

impl Link for MemLink {
    type Socket = MemSocket;

    fn name(&self) -> &str {
        &self.name
    }

    fn mtu(&self) -> usize {
        self.mtu
    }

    /// Each EtherType can be opened once
    fn open(&self, ethertype: u16) -> Result<MemSocket, LinkError> {
        let rx = self
            .inbound
            .with_lock(|inbound| inbound.remove(&ethertype))
            .ok_or(LinkError::Io(io::ErrorKind::AddrInUse))?;
        Ok(MemSocket {
            ethertype,
            rx: Mutex::new(rx),
            sent: self.sent.clone(),
        })
    }
}

impl RawSocket for MemSocket {
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(Ok(frame)) => {
                let ct = frame.len().min(buf.len());
                buf[..ct].copy_from_slice(&frame[..ct]);
                Ok(ct)
            }
            Some(Err(e)) => Err(e),
            None => Err(io::ErrorKind::BrokenPipe.into()),
        }
    }

    async fn send(&self, frame: &[u8], dst: MacAddr) -> io::Result<()> {
        self.sent
            .send(SentFrame {
                ethertype: self.ethertype,
                dst,
                bytes: frame.to_vec(),
            })
            .map_err(|_| io::ErrorKind::BrokenPipe.into())
    }
}

impl MemWire {
    /// Deliver a raw Ethernet frame to the socket of `ethertype`
    ///
    /// Returns false if the link has no such socket, or it was dropped.
    pub fn inject(&self, ethertype: u16, frame: Vec<u8>) -> bool {
        self.push(ethertype, Ok(frame))
    }

    /// Make the next receive on the socket of `ethertype` fail
    pub fn inject_error(&self, ethertype: u16, kind: io::ErrorKind) -> bool {
        self.push(ethertype, Err(kind.into()))
    }

    fn push(&self, ethertype: u16, item: Inbound) -> bool {
        self.inbound
            .get(&ethertype)
            .is_some_and(|tx| tx.send(item).is_ok())
    }

    /// Wait for the next transmitted frame
    pub async fn next_sent(&mut self) -> Option<SentFrame> {
        self.sent.recv().await
    }

    /// The next transmitted frame, if one is already waiting
    pub fn try_next_sent(&mut self) -> Option<SentFrame> {
        self.sent.try_recv().ok()
    }
}
