#![warn(clippy::pedantic)]
// Sometimes a redundant else is clearer
#![allow(clippy::redundant_else)]
// Don't care enough to fix
#![allow(clippy::match_same_arms)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::similar_names)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::wildcard_imports)]

//! A minimal multicast DNS / DNS-SD responder (RFC 6762 and RFC 6763).
//!
//! A [`Responder`] owns one multicast UDP socket on port 5353 and one
//! background engine task. Callers set a hostname once, register any
//! number of service instances, and the engine takes care of
//! announcing them, answering queries (with known-answer suppression
//! and additional-section closure), and sending goodbyes on removal
//! or shutdown.
//!
//! This crate does not parse command-line flags, enumerate network
//! interfaces, or handle process signals — a caller picks the bind
//! address and wires those up itself (see `SPEC_FULL.md` §1).

pub mod config;
pub mod error;
mod engine;
pub mod service;
pub mod store;

use std::net::{Ipv4Addr, Ipv6Addr};

use dns_types::protocol::types::DomainName;
use tokio::sync::{mpsc, oneshot};

pub use config::ResponderConfig;
pub use error::{
    EngineGone, HostnameAlreadySet, InvalidName, NoHostname, RegisterError, SetHostnameError,
    SocketSetupError,
};
pub use service::ServiceHandle;

use engine::Command;

/// A running responder. Dropping this without calling [`Responder::stop`]
/// still lets the engine shut itself down cleanly (it notices the
/// command channel closing and sends the same final goodbye), but
/// `stop` is how a caller waits for that goodbye to actually go out.
pub struct Responder {
    tx: mpsc::Sender<Command>,
    join_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Responder {
    /// Bring up the responder: bind and join the multicast socket on
    /// `host_addr`, and spawn the engine task. `verbose` enables extra
    /// debug-level logging of dropped/malformed packets (see §7).
    ///
    /// Returns `Err` only on socket setup failure; per §4.5 this is
    /// the one hard failure surfaced to the caller.
    pub async fn start(host_addr: Ipv4Addr, verbose: bool) -> Result<Self, SocketSetupError> {
        Self::start_with_config(host_addr, verbose, ResponderConfig::default()).await
    }

    /// Like [`Responder::start`], but with an explicit [`ResponderConfig`]
    /// instead of the built-in defaults.
    pub async fn start_with_config(
        host_addr: Ipv4Addr,
        verbose: bool,
        config: ResponderConfig,
    ) -> Result<Self, SocketSetupError> {
        let (tx, join_handle) = engine::spawn(host_addr, verbose, config)?;
        Ok(Responder {
            tx,
            join_handle: Some(join_handle),
        })
    }

    /// Set the responder's hostname and IPv4 address, publishing an A
    /// record (TTL 120s) plus a companion NSEC. May be called at most
    /// once per responder lifetime; a second call is rejected rather
    /// than silently overwriting the first (see the hostname-reset
    /// open question in `DESIGN.md`).
    pub async fn set_hostname(
        &self,
        name: DomainName,
        address: Ipv4Addr,
    ) -> Result<(), SetHostnameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::SetHostnameV4 {
                name,
                address,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineGone)?;
        reply_rx.await.map_err(|_| EngineGone)??;
        Ok(())
    }

    /// Like [`Responder::set_hostname`], but for an IPv6 address
    /// (publishes an AAAA record instead of an A record).
    pub async fn set_hostname_v6(
        &self,
        name: DomainName,
        address: Ipv6Addr,
    ) -> Result<(), SetHostnameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::SetHostnameV6 {
                name,
                address,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineGone)?;
        reply_rx.await.map_err(|_| EngineGone)??;
        Ok(())
    }

    /// Register one service instance, publishing its SRV, optional
    /// TXT, type-PTR, and the `_services._dns-sd._udp.local` meta-PTR,
    /// and queueing an announcement. `hostname` overrides the
    /// responder's own hostname as the SRV target; if `None`, the
    /// responder must already have one set via [`Responder::set_hostname`]
    /// or [`Responder::set_hostname_v6`].
    pub async fn register_service(
        &self,
        instance: impl Into<Vec<u8>>,
        service_type: DomainName,
        port: u16,
        hostname: Option<DomainName>,
        txt: Vec<Vec<u8>>,
    ) -> Result<ServiceHandle, RegisterError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::RegisterService {
                instance: instance.into(),
                ty: service_type,
                port,
                hostname,
                txt,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineGone)?;
        reply_rx.await.map_err(|_| EngineGone)?
    }

    /// Withdraw a previously registered service. The engine sends the
    /// goodbye (the type-PTR at `ttl=0`) on its next loop iteration;
    /// this call itself returns as soon as the store has been
    /// updated, not once the packet is actually on the wire (see §5's
    /// note on cross-thread ordering).
    pub async fn remove_service(&self, handle: ServiceHandle) -> Result<(), EngineGone> {
        self.tx
            .send(Command::RemoveService { handle })
            .await
            .map_err(|_| EngineGone)
    }

    /// Idempotent shutdown: request the final multicast goodbye for
    /// every still-published service, wait for the engine to send it
    /// and close its socket, then consume this handle. A second call
    /// (or a call after the engine already exited on its own) returns
    /// `Ok(())` rather than an error — shutting down an
    /// already-stopped responder isn't a caller bug.
    pub async fn stop(mut self) -> Result<(), EngineGone> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(Command::Stop { reply: reply_tx }).await.is_ok() {
            let _ = reply_rx.await;
        }
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.await;
        }
        Ok(())
    }
}
