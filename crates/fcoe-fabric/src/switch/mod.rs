//! The fabric switch
//!
//! A [`Switch`] owns a set of ports, each tagged with its [`PortType`]. Every
//! port added gets its own dispatch worker, which pulls FC frames from the
//! port and serves the fabric services implemented here:
//!
//! * FLOGI: assigns an FC address from the pool and replies with an ACC, or
//!   an LS_RJT once the pool is exhausted
//! * everything else is logged and dropped
//!
//! A dispatch worker ends when its port fails or closes, when a reply cannot
//! be sent, or when an ELS frame cannot be decoded. Its logins are released,
//! and the reason is returned through the worker's [`JoinHandle`].

use core::fmt;
use std::sync::Arc;

use fc_wire::{DecodeError, ElsRequest, FcFrame, Flogi, Request, Wwn, els::LsRjt};
use log::{debug, error, info, warn};
use mutex::{BlockingMutex, ConstInit, ScopedRawMutex};
use tokio::task::JoinHandle;

use crate::{config::FabricConfig, port::PortError};

pub mod logins;
pub mod reply;

use logins::{AllocError, Login, LoginTable};

/// What a switch needs from a port
pub trait SwitchPort: Clone + Send + Sync + 'static {
    /// A name for logs, e.g. `FCoE/ens1`
    fn identity(&self) -> &str;

    fn send(&self, frame: &FcFrame) -> impl Future<Output = Result<(), PortError>> + Send;

    fn receive(&self) -> impl Future<Output = Result<FcFrame, PortError>> + Send;
}

/// The role of a switch port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortType {
    /// Fabric port, facing an N_Port
    F,
    /// Expansion port, facing another switch
    E,
    /// Node port
    N,
}

/// Why a dispatch worker stopped
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEnd {
    /// Receiving from the port failed
    PortFailed(PortError),
    /// An ELS frame could not be decoded
    Protocol(DecodeError),
    /// A reply could not be sent
    Send(PortError),
}

pub struct Switch<R: ScopedRawMutex, P: SwitchPort> {
    inner: Arc<SwitchInner<R, P>>,
}

struct SwitchInner<R: ScopedRawMutex, P: SwitchPort> {
    config: FabricConfig,
    ports: BlockingMutex<R, Vec<PortEntry<P>>>,
    logins: BlockingMutex<R, LoginTable>,
}

struct PortEntry<P> {
    port: P,
    port_type: PortType,
}

struct DispatchWorker<R: ScopedRawMutex, P: SwitchPort> {
    switch: Arc<SwitchInner<R, P>>,
    port: P,
    port_type: PortType,
    index: usize,
}

// ---- impls ----

impl<R, P> Switch<R, P>
where
    R: ScopedRawMutex + ConstInit + Send + Sync + 'static,
    P: SwitchPort,
{
    pub fn new(config: FabricConfig) -> Self {
        Self {
            inner: Arc::new(SwitchInner {
                config,
                ports: BlockingMutex::new(Vec::new()),
                logins: BlockingMutex::new(LoginTable::new()),
            }),
        }
    }

    pub fn config(&self) -> &FabricConfig {
        &self.inner.config
    }

    /// Attach `port` and spawn its dispatch worker
    ///
    /// Must be called from within a tokio runtime.
    pub fn add_port(&self, port: P, port_type: PortType) -> JoinHandle<DispatchEnd> {
        let index = self.inner.ports.with_lock(|ports| {
            ports.push(PortEntry {
                port: port.clone(),
                port_type,
            });
            ports.len() - 1
        });
        info!("Added port {} as {port_type}", port.identity());

        let worker = DispatchWorker {
            switch: self.inner.clone(),
            port,
            port_type,
            index,
        };
        tokio::task::spawn(worker.run())
    }

    /// Identity and type of every port, in the order they were added
    pub fn ports(&self) -> Vec<(String, PortType)> {
        self.inner.ports.with_lock(|ports| {
            ports
                .iter()
                .map(|e| (e.port.identity().to_string(), e.port_type))
                .collect()
        })
    }

    /// Every current fabric login, ordered by FC address
    pub fn logins(&self) -> Vec<Login> {
        self.inner
            .logins
            .with_lock(|logins| logins.iter().cloned().collect())
    }

    pub fn login(&self, wwpn: Wwn) -> Option<Login> {
        self.inner
            .logins
            .with_lock(|logins| logins.get(wwpn).cloned())
    }
}

impl<R: ScopedRawMutex, P: SwitchPort> Clone for Switch<R, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R, P> DispatchWorker<R, P>
where
    R: ScopedRawMutex + ConstInit + Send + Sync + 'static,
    P: SwitchPort,
{
    async fn run(self) -> DispatchEnd {
        let end = self.run_inner().await;
        warn!("[{}] Dispatch stopped: {end}", self.port.identity());

        let released = self
            .switch
            .logins
            .with_lock(|logins| logins.release_port(self.index));
        for login in released {
            info!(
                "[{}] Logged out {} ({})",
                self.port.identity(),
                login.wwpn,
                login.fcid
            );
        }
        end
    }

    async fn run_inner(&self) -> DispatchEnd {
        loop {
            let frame = match self.port.receive().await {
                Ok(frame) => frame,
                Err(e) => return DispatchEnd::PortFailed(e),
            };

            match Request::classify(&frame) {
                Ok(Request::Els(ElsRequest::Flogi(flogi))) => {
                    if let Err(e) = self.handle_flogi(&frame, &flogi).await {
                        error!("[{}] Failed to reply to FLOGI: {e}", self.port.identity());
                        return DispatchEnd::Send(e);
                    }
                }
                Ok(Request::Els(ElsRequest::Other { command })) => {
                    info!(
                        "[{}] Unknown ELS command: {command}",
                        self.port.identity()
                    );
                }
                Ok(Request::Unknown { fc_type }) => {
                    info!(
                        "[{}] Unknown FC frame type: 0x{:02x}",
                        self.port.identity(),
                        fc_type.0
                    );
                }
                Err(e) => {
                    error!("[{}] Bad ELS frame: {e}", self.port.identity());
                    return DispatchEnd::Protocol(e);
                }
            }
        }
    }

    async fn handle_flogi(&self, request: &FcFrame, flogi: &Flogi) -> Result<(), PortError> {
        let config = &self.switch.config;
        info!(
            "[{}] FLOGI [{} -> {}] on {}",
            self.port.identity(),
            flogi.wwpn,
            flogi.wwnn,
            self.port_type
        );

        let assigned = self.switch.logins.with_lock(|logins| {
            logins.login(&config.fcid_pool, self.index, flogi.wwpn, flogi.wwnn)
        });
        let rep = match assigned {
            Ok(fcid) => {
                info!(
                    "[{}] Assigned {} to {}",
                    self.port.identity(),
                    fcid,
                    flogi.wwpn
                );
                reply::flogi_acc(request, config, fcid)
            }
            Err(AllocError::PoolExhausted) => {
                warn!(
                    "[{}] No free address for {}, rejecting",
                    self.port.identity(),
                    flogi.wwpn
                );
                let reason = LsRjt {
                    reason: LsRjt::REASON_UNABLE_TO_PERFORM,
                    explanation: LsRjt::EXPLAIN_INSUFFICIENT_RESOURCES,
                };
                reply::ls_rjt(request, config, reason)
            }
        };

        debug!(
            "[{}] Replying {} -> {}",
            self.port.identity(),
            rep.source,
            rep.destination
        );
        self.port.send(&rep).await
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortType::F => f.write_str("F_Port"),
            PortType::E => f.write_str("E_Port"),
            PortType::N => f.write_str("N_Port"),
        }
    }
}

impl fmt::Display for DispatchEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchEnd::PortFailed(e) => write!(f, "port stopped: {e}"),
            DispatchEnd::Protocol(e) => write!(f, "protocol error: {e}"),
            DispatchEnd::Send(e) => write!(f, "send failed: {e}"),
        }
    }
}
