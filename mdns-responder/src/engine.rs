//! The responder engine: socket setup, the receive/reply loop, the
//! announcement and withdrawal schedulers, and the record-store
//! mutations that back the public registration API.
//!
//! Per the actor decision in `DESIGN.md`, there is no mutex here: a
//! single task owns a [`ResponderState`] outright and processes
//! [`Command`]s sent over an `mpsc` channel interleaved with incoming
//! UDP datagrams, exactly the shape `listen_udp_task` in this
//! lineage's own binary uses for a `tokio::select!` over a socket and
//! a channel.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use rand::Rng;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use dns_types::protocol::deserialise::ConsumableBuffer;
use dns_types::protocol::types::{
    DomainName, Message, NsecTypeBitmap, QueryType, RecordClass, RecordType, RecordTypeWithData,
    ResourceRecord,
};

use crate::config::ResponderConfig;
use crate::error::{HostnameAlreadySet, InvalidName, NoHostname, RegisterError, SocketSetupError};
use crate::service::ServiceHandle;
use crate::store::RecordStore;

pub const MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);
pub const MDNS_PORT: u16 = 5353;

const MAX_DATAGRAM: usize = 65536;

/// All of the responder's mutable state. Owned exclusively by the
/// engine task; see `DESIGN.md` for why this replaces the spec's
/// `data_lock`-guarded globals with single-ownership instead.
pub struct ResponderState {
    pub store: RecordStore,
    pub announce: VecDeque<DomainName>,
    pub services: Vec<DomainName>,
    pub leave: VecDeque<ResourceRecord>,
    pub hostname: Option<DomainName>,
    pub config: ResponderConfig,
    pub verbose: bool,
}

impl ResponderState {
    fn new(config: ResponderConfig, verbose: bool) -> Self {
        ResponderState {
            store: RecordStore::new(),
            announce: VecDeque::new(),
            services: Vec::new(),
            leave: VecDeque::new(),
            hostname: None,
            config,
            verbose,
        }
    }
}

/// Requests sent from `Responder` handles to the engine task. Generalises
/// the spec's single wakeup byte into a proper work queue (see the
/// "shared mutable state across threads" design note).
pub(crate) enum Command {
    SetHostnameV4 {
        name: DomainName,
        address: Ipv4Addr,
        reply: oneshot::Sender<Result<(), HostnameAlreadySet>>,
    },
    SetHostnameV6 {
        name: DomainName,
        address: Ipv6Addr,
        reply: oneshot::Sender<Result<(), HostnameAlreadySet>>,
    },
    RegisterService {
        instance: Vec<u8>,
        ty: DomainName,
        port: u16,
        hostname: Option<DomainName>,
        txt: Vec<Vec<u8>>,
        reply: oneshot::Sender<Result<ServiceHandle, RegisterError>>,
    },
    RemoveService {
        handle: ServiceHandle,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Returns the fixed DNS-SD type-enumeration name,
/// `_services._dns-sd._udp.local.` (RFC 6763 section 9).
pub fn services_meta_name() -> DomainName {
    DomainName::from_dotted_string("_services._dns-sd._udp.local.")
        .expect("constant name is well-formed")
}

/// Bring up the IPv4 multicast UDP socket per §4.5: `SO_REUSEADDR`
/// (+`SO_REUSEPORT` where supported), bound to `0.0.0.0:5353`,
/// `IP_MULTICAST_IF`/`IP_MULTICAST_TTL`/`IP_ADD_MEMBERSHIP` on the
/// chosen interface, with loopback delivery enabled.
pub(crate) fn bind_multicast_socket(host_addr: Ipv4Addr) -> Result<Socket, SocketSetupError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| SocketSetupError::SetSockOpt("socket", e))?;

    socket
        .set_reuse_address(true)
        .map_err(|e| SocketSetupError::SetSockOpt("SO_REUSEADDR", e))?;
    #[cfg(unix)]
    socket
        .set_reuse_port(true)
        .map_err(|e| SocketSetupError::SetSockOpt("SO_REUSEPORT", e))?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, MDNS_PORT);
    socket
        .bind(&SockAddr::from(bind_addr))
        .map_err(SocketSetupError::Bind)?;

    socket
        .set_multicast_if_v4(&host_addr)
        .map_err(|e| SocketSetupError::SetSockOpt("IP_MULTICAST_IF", e))?;
    socket
        .set_multicast_ttl_v4(255)
        .map_err(|e| SocketSetupError::SetSockOpt("IP_MULTICAST_TTL", e))?;
    socket
        .join_multicast_v4(&MULTICAST_GROUP, &host_addr)
        .map_err(SocketSetupError::JoinMulticast)?;
    socket
        .set_multicast_loop_v4(true)
        .map_err(|e| SocketSetupError::SetSockOpt("IP_MULTICAST_LOOP", e))?;
    socket
        .set_nonblocking(true)
        .map_err(|e| SocketSetupError::SetSockOpt("O_NONBLOCK", e))?;

    Ok(socket)
}

/// Spawn the engine task. Returns the command sender and join handle
/// a `Responder` wraps up into its public handle.
pub(crate) fn spawn(
    host_addr: Ipv4Addr,
    verbose: bool,
    config: ResponderConfig,
) -> Result<(mpsc::Sender<Command>, tokio::task::JoinHandle<()>), SocketSetupError> {
    let std_socket = bind_multicast_socket(host_addr)?;
    let std_socket: std::net::UdpSocket = std_socket.into();
    let socket = UdpSocket::from_std(std_socket).map_err(|e| SocketSetupError::SetSockOpt("non-blocking conversion", e))?;

    let (tx, rx) = mpsc::channel(config.command_channel_capacity);
    let state = ResponderState::new(config, verbose);

    let handle = tokio::spawn(
        run(socket, rx, state).instrument(tracing::error_span!("mdns_engine", %host_addr)),
    );

    Ok((tx, handle))
}

/// The engine's main loop: `tokio::select!` over the multicast socket
/// and the command channel, draining the announce and withdrawal
/// queues after every wakeup, exactly as §4.5 describes.
async fn run(socket: UdpSocket, mut rx: mpsc::Receiver<Command>, mut state: ResponderState) {
    tracing::info!("responder engine started");
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                match cmd {
                    Some(Command::Stop { reply }) => {
                        send_shutdown_goodbye(&socket, &state).await;
                        tracing::info!("responder engine stopped");
                        let _ = reply.send(());
                        return;
                    }
                    Some(other) => apply_command(&mut state, other),
                    None => {
                        // every `Responder` handle (and its sender) was
                        // dropped without an explicit stop(); shut down
                        // the same way stop() would.
                        send_shutdown_goodbye(&socket, &state).await;
                        tracing::info!("responder engine stopped (all handles dropped)");
                        return;
                    }
                }
            }
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((n, peer)) => handle_datagram(&socket, &state, &buf[..n], peer).await,
                    Err(error) => {
                        tracing::error!(?error, "recvfrom failed");
                    }
                }
            }
        }

        drain_announce(&socket, &mut state).await;
        drain_leave(&socket, &mut state).await;
    }
}

fn apply_command(state: &mut ResponderState, cmd: Command) {
    match cmd {
        Command::SetHostnameV4 { name, address, reply } => {
            let result = set_hostname_v4(state, name, address);
            let _ = reply.send(result);
        }
        Command::SetHostnameV6 { name, address, reply } => {
            let result = set_hostname_v6(state, name, address);
            let _ = reply.send(result);
        }
        Command::RegisterService { instance, ty, port, hostname, txt, reply } => {
            let result = register_service(state, &instance, ty, port, hostname, txt);
            let _ = reply.send(result);
        }
        Command::RemoveService { handle } => remove_service(state, handle),
        Command::Stop { .. } => unreachable!("Stop is handled directly in run()"),
    }
}

fn set_hostname_v4(
    state: &mut ResponderState,
    name: DomainName,
    address: Ipv4Addr,
) -> Result<(), HostnameAlreadySet> {
    if state.hostname.is_some() {
        return Err(HostnameAlreadySet);
    }
    let ttl = state.config.hostname_ttl;
    state.store.add(ResourceRecord {
        name: name.clone(),
        rtype_with_data: RecordTypeWithData::A { address },
        rclass: RecordClass::IN,
        cache_flush: true,
        ttl,
    });
    state.store.add(ResourceRecord {
        name: name.clone(),
        rtype_with_data: RecordTypeWithData::NSEC {
            next_domain: name.clone(),
            types: NsecTypeBitmap::new().with(RecordType::A),
        },
        rclass: RecordClass::IN,
        cache_flush: true,
        ttl,
    });
    state.hostname = Some(name);
    tracing::info!("hostname set (A)");
    Ok(())
}

fn set_hostname_v6(
    state: &mut ResponderState,
    name: DomainName,
    address: Ipv6Addr,
) -> Result<(), HostnameAlreadySet> {
    if state.hostname.is_some() {
        return Err(HostnameAlreadySet);
    }
    let ttl = state.config.hostname_ttl;
    state.store.add(ResourceRecord {
        name: name.clone(),
        rtype_with_data: RecordTypeWithData::AAAA { address },
        rclass: RecordClass::IN,
        cache_flush: true,
        ttl,
    });
    state.store.add(ResourceRecord {
        name: name.clone(),
        rtype_with_data: RecordTypeWithData::NSEC {
            next_domain: name.clone(),
            types: NsecTypeBitmap::new().with(RecordType::AAAA),
        },
        rclass: RecordClass::IN,
        cache_flush: true,
        ttl,
    });
    state.hostname = Some(name);
    tracing::info!("hostname set (AAAA)");
    Ok(())
}

fn register_service(
    state: &mut ResponderState,
    instance: &[u8],
    ty: DomainName,
    port: u16,
    hostname: Option<DomainName>,
    txt: Vec<Vec<u8>>,
) -> Result<ServiceHandle, RegisterError> {
    let target = match hostname {
        Some(h) => h,
        None => state.hostname.clone().ok_or(NoHostname)?,
    };
    let instance_name = ty.prepend_label(instance).ok_or(InvalidName)?;

    let ttl = state.config.default_ttl;
    let has_txt = !txt.is_empty();

    if has_txt {
        state.store.add(ResourceRecord {
            name: instance_name.clone(),
            rtype_with_data: RecordTypeWithData::TXT { strings: txt },
            rclass: RecordClass::IN,
            cache_flush: true,
            ttl,
        });
    }

    state.store.add(ResourceRecord {
        name: instance_name.clone(),
        rtype_with_data: RecordTypeWithData::SRV {
            priority: 0,
            weight: 0,
            port,
            target,
        },
        rclass: RecordClass::IN,
        cache_flush: true,
        ttl,
    });

    state.store.add(ResourceRecord {
        name: ty.clone(),
        rtype_with_data: RecordTypeWithData::PTR {
            ptrdname: instance_name.clone(),
        },
        rclass: RecordClass::IN,
        cache_flush: false,
        ttl,
    });

    state.store.add(ResourceRecord {
        name: services_meta_name(),
        rtype_with_data: RecordTypeWithData::PTR {
            ptrdname: ty.clone(),
        },
        rclass: RecordClass::IN,
        cache_flush: false,
        ttl,
    });

    state.announce.push_back(ty.clone());
    state.services.push(ty.clone());

    tracing::info!(ty = %ty.to_dotted_string(), instance = %instance_name.to_dotted_string(), "service registered");

    Ok(ServiceHandle {
        type_name: ty,
        instance_name,
        has_txt,
    })
}

fn remove_service(state: &mut ResponderState, handle: ServiceHandle) {
    let ServiceHandle {
        type_name,
        instance_name,
        has_txt,
    } = handle;

    state.store.remove_where(&instance_name, |e| {
        matches!(e.rtype_with_data, RecordTypeWithData::SRV { .. })
    });
    if has_txt {
        state.store.remove_where(&instance_name, |e| {
            matches!(e.rtype_with_data, RecordTypeWithData::TXT { .. })
        });
    }

    let removed_ptr = state.store.remove_where(&type_name, |e| {
        matches!(&e.rtype_with_data, RecordTypeWithData::PTR { ptrdname } if *ptrdname == instance_name)
    });
    state.store.remove_ptr_referencing(&type_name);

    state.announce.retain(|n| n != &type_name);
    state.services.retain(|n| n != &type_name);

    if let Some(mut ptr) = removed_ptr {
        ptr.ttl = 0;
        state.leave.push_back(ptr);
    }

    state.store.clean();

    tracing::info!(ty = %type_name.to_dotted_string(), "service removed");
}

/// Per §4.5's additional-section synthesis: expand one answer record
/// into the records it implies (PTR → its target's records; SRV →
/// its target's records plus TXT at its own name; A/AAAA → the
/// same-name NSEC).
fn expand_one(store: &RecordStore, record: &ResourceRecord, out: &mut Vec<ResourceRecord>) {
    match &record.rtype_with_data {
        RecordTypeWithData::PTR { ptrdname } => {
            out.extend(store.answers_for(ptrdname, &QueryType::Wildcard));
        }
        RecordTypeWithData::SRV { target, .. } => {
            out.extend(store.answers_for(target, &QueryType::Wildcard));
            out.extend(store.answers_for(&record.name, &QueryType::Record(RecordType::TXT)));
        }
        RecordTypeWithData::A { .. } | RecordTypeWithData::AAAA { .. } => {
            out.extend(store.answers_for(&record.name, &QueryType::Record(RecordType::NSEC)));
        }
        _ => {}
    }
}

/// Additional-section closure: expand every answer once, then expand
/// the result once more (to cover PTR→SRV→A chains), de-duplicating
/// against the answers already present and against itself.
fn additional_for(store: &RecordStore, answers: &[ResourceRecord]) -> Vec<ResourceRecord> {
    let mut first_pass = Vec::new();
    for a in answers {
        expand_one(store, a, &mut first_pass);
    }
    let mut second_pass = Vec::new();
    for a in &first_pass {
        expand_one(store, a, &mut second_pass);
    }
    first_pass.extend(second_pass);

    let mut additional: Vec<ResourceRecord> = Vec::new();
    for candidate in first_pass {
        let already_an_answer = answers.iter().any(|a| a.entry_eq(&candidate));
        let already_additional = additional.iter().any(|a| a.entry_eq(&candidate));
        if !already_an_answer && !already_additional {
            additional.push(candidate);
        }
    }
    additional
}

/// Build the reply to a standard query, or `None` if nothing survives
/// known-answer suppression (in which case no packet is sent at all).
///
/// Pure and socket-free so it can be unit tested directly, per the
/// test-tooling note in `DESIGN.md`.
fn build_query_reply(state: &ResponderState, query: &Message) -> Option<(Message, bool)> {
    let mut answers: Vec<ResourceRecord> = Vec::new();
    let mut unicast = false;

    for question in &query.questions {
        answers.extend(state.store.answers_for(&question.name, &question.qtype));
        if question.unicast_response {
            unicast = true;
        }
    }

    // known-answer suppression (§4.5): drop any answer the peer
    // already holds with at least half its TTL remaining.
    answers.retain(|a| {
        !query
            .answers
            .iter()
            .any(|known| known.entry_eq(a) && u64::from(known.ttl) >= u64::from(a.ttl) / 2)
    });

    if answers.is_empty() {
        return None;
    }

    let additional = additional_for(&state.store, &answers);

    let mut reply = Message::response(query.header.id);
    reply.answers = answers;
    reply.additional = additional;
    Some((reply, unicast))
}

/// Build the announcement packet for one registered service: the
/// type-PTR plus the `_services._dns-sd._udp.local` meta-PTR, with
/// additional-section closure applied.
fn build_announce_message(state: &ResponderState, type_name: &DomainName) -> Option<Message> {
    let mut answers = state
        .store
        .answers_for(type_name, &QueryType::Record(RecordType::PTR));
    if answers.is_empty() {
        return None;
    }

    let meta = state
        .store
        .answers_for(&services_meta_name(), &QueryType::Record(RecordType::PTR))
        .into_iter()
        .find(|r| matches!(&r.rtype_with_data, RecordTypeWithData::PTR { ptrdname } if ptrdname == type_name));
    answers.extend(meta);

    let additional = additional_for(&state.store, &answers);

    let mut message = Message::response(0);
    message.answers = answers;
    message.additional = additional;
    Some(message)
}

/// Build the single-entry goodbye packet for one withdrawn PTR
/// (`ttl` is assumed to already be zeroed by the caller).
fn build_goodbye_message(ptr: ResourceRecord) -> Message {
    let mut message = Message::response(0);
    message.answers = vec![ptr];
    message
}

/// Build the final shutdown packet listing every still-published
/// service's type-PTR with `ttl=0` (§4.5 "Shutdown").
fn build_shutdown_message(state: &ResponderState) -> Option<Message> {
    let mut answers = Vec::new();
    for type_name in &state.services {
        for mut ptr in state
            .store
            .answers_for(type_name, &QueryType::Record(RecordType::PTR))
        {
            ptr.ttl = 0;
            answers.push(ptr);
        }
    }
    if answers.is_empty() {
        return None;
    }
    let mut message = Message::response(0);
    message.answers = answers;
    Some(message)
}

async fn handle_datagram(socket: &UdpSocket, state: &ResponderState, bytes: &[u8], peer: SocketAddr) {
    let mut buffer = ConsumableBuffer::new(bytes);
    let query = match Message::deserialise(&mut buffer) {
        Ok(m) => m,
        Err(error) => {
            if state.verbose {
                tracing::warn!(?peer, ?error, "dropping malformed packet");
            }
            return;
        }
    };

    if query.header.is_response || !query.header.opcode.is_standard() {
        // not a standard query: a response, or an opcode we don't
        // speak. RFC 6762 section 18.3 says to ignore both.
        return;
    }

    let Some((reply, unicast)) = build_query_reply(state, &query) else {
        return;
    };

    if unicast {
        send_unicast(&reply, peer).await;
    } else {
        send_multicast(socket, &reply).await;
    }
}

async fn drain_announce(socket: &UdpSocket, state: &mut ResponderState) {
    while let Some(type_name) = state.announce.pop_front() {
        if !state.services.contains(&type_name) {
            // removed before its turn to announce came up.
            continue;
        }
        jitter_delay(state.config.announce_jitter_min_ms, state.config.announce_jitter_max_ms).await;
        if let Some(message) = build_announce_message(state, &type_name) {
            tracing::debug!(ty = %type_name.to_dotted_string(), "sending announcement");
            send_multicast(socket, &message).await;
        }
    }
}

async fn drain_leave(socket: &UdpSocket, state: &mut ResponderState) {
    while let Some(ptr) = state.leave.pop_front() {
        tracing::debug!(name = %ptr.name.to_dotted_string(), "sending goodbye");
        let message = build_goodbye_message(ptr);
        send_multicast(socket, &message).await;
    }
}

async fn send_shutdown_goodbye(socket: &UdpSocket, state: &ResponderState) {
    if let Some(message) = build_shutdown_message(state) {
        send_multicast(socket, &message).await;
    }
}

async fn jitter_delay(min_ms: u64, max_ms: u64) {
    if max_ms == 0 {
        return;
    }
    let delay = if min_ms >= max_ms {
        min_ms
    } else {
        rand::thread_rng().gen_range(min_ms..=max_ms)
    };
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

async fn send_multicast(socket: &UdpSocket, message: &Message) {
    let octets = message.serialise();
    let dest = SocketAddr::from((MULTICAST_GROUP, MDNS_PORT));
    if let Err(error) = socket.send_to(&octets, dest).await {
        tracing::error!(?error, "multicast send failed");
    }
}

async fn send_unicast(message: &Message, peer: SocketAddr) {
    let octets = message.serialise();
    match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await {
        Ok(socket) => {
            if let Err(error) = socket.send_to(&octets, peer).await {
                tracing::error!(?peer, ?error, "unicast send failed");
            }
        }
        Err(error) => {
            tracing::error!(?peer, ?error, "could not open ephemeral unicast socket");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns_types::protocol::types::test_util::*;
    use dns_types::protocol::types::{QueryClass, Question};
    use std::net::Ipv4Addr;

    fn fresh_state() -> ResponderState {
        ResponderState::new(ResponderConfig::default(), true)
    }

    fn register(state: &mut ResponderState, instance: &str, ty: &str, port: u16, host: &str) -> ServiceHandle {
        register_service(
            state,
            instance.as_bytes(),
            domain(ty),
            port,
            Some(domain(host)),
            vec![b"path=/ipp/print".to_vec()],
        )
        .unwrap()
    }

    fn query_for(name: &str, qtype: RecordType, unicast: bool) -> Message {
        let mut message = Message::response(99);
        message.header.is_response = false;
        message.questions.push(Question {
            name: domain(name),
            qtype: QueryType::Record(qtype),
            qclass: QueryClass::Record(RecordClass::IN),
            unicast_response: unicast,
        });
        message
    }

    #[test]
    fn register_service_populates_the_expected_records() {
        let mut state = fresh_state();
        state.store.add(a_record("host.local.", Ipv4Addr::new(192, 0, 2, 5), 120));
        state.hostname = Some(domain("host.local."));

        register(&mut state, "printer", "_ipp._tcp.local.", 631, "host.local.");

        assert_eq!(state.services, vec![domain("_ipp._tcp.local.")]);
        assert_eq!(state.announce.len(), 1);

        let ptr = state.store.get(&domain("_ipp._tcp.local.")).unwrap();
        assert_eq!(ptr.entries.len(), 1);

        let meta = state.store.get(&services_meta_name()).unwrap();
        assert!(meta.entries.iter().any(|e| matches!(
            &e.rtype_with_data,
            RecordTypeWithData::PTR { ptrdname } if *ptrdname == domain("_ipp._tcp.local.")
        )));
    }

    #[test]
    fn register_without_hostname_fails() {
        let mut state = fresh_state();
        let result = register_service(
            &mut state,
            b"printer",
            domain("_ipp._tcp.local."),
            631,
            None,
            vec![],
        );
        assert_eq!(result, Err(RegisterError::NoHostname(NoHostname)));
    }

    // S1
    #[test]
    fn announce_message_contains_full_chain() {
        let mut state = fresh_state();
        state.store.add(a_record("host.local.", Ipv4Addr::new(192, 0, 2, 5), 120));
        state.hostname = Some(domain("host.local."));
        register(&mut state, "printer", "_ipp._tcp.local.", 631, "host.local.");

        let message = build_announce_message(&state, &domain("_ipp._tcp.local.")).unwrap();

        let has_type_ptr = message.answers.iter().any(|r| {
            matches!(&r.rtype_with_data, RecordTypeWithData::PTR { ptrdname } if *ptrdname == domain("printer._ipp._tcp.local."))
        });
        let has_meta_ptr = message.answers.iter().any(|r| {
            matches!(&r.rtype_with_data, RecordTypeWithData::PTR { ptrdname } if *ptrdname == domain("_ipp._tcp.local."))
        });
        assert!(has_type_ptr);
        assert!(has_meta_ptr);

        let all = message.answers.iter().chain(message.additional.iter());
        assert!(all.clone().any(|r| matches!(r.rtype_with_data, RecordTypeWithData::SRV { port: 631, .. })));
        assert!(all
            .clone()
            .any(|r| matches!(&r.rtype_with_data, RecordTypeWithData::TXT { strings } if strings == &vec![b"path=/ipp/print".to_vec()])));
        assert!(all.any(|r| matches!(r.rtype_with_data, RecordTypeWithData::A { address } if address == Ipv4Addr::new(192, 0, 2, 5))));
    }

    // S2
    #[test]
    fn unicast_question_is_honoured() {
        let mut state = fresh_state();
        state.store.add(a_record("host.local.", Ipv4Addr::new(192, 0, 2, 5), 120));
        state.hostname = Some(domain("host.local."));
        register(&mut state, "printer", "_ipp._tcp.local.", 631, "host.local.");

        let query = query_for("_ipp._tcp.local.", RecordType::PTR, true);
        let (reply, unicast) = build_query_reply(&state, &query).unwrap();

        assert!(unicast);
        assert!(reply.header.is_authoritative);
        assert!(!reply.answers.is_empty());
    }

    // S3
    #[test]
    fn known_answer_suppression_empties_the_reply() {
        let mut state = fresh_state();
        state.store.add(a_record("host.local.", Ipv4Addr::new(192, 0, 2, 5), 120));
        state.hostname = Some(domain("host.local."));
        register(&mut state, "printer", "_ipp._tcp.local.", 631, "host.local.");

        let mut query = query_for("_ipp._tcp.local.", RecordType::PTR, false);
        query.answers.push(ptr_record(
            "_ipp._tcp.local.",
            "printer._ipp._tcp.local.",
            4500,
        ));

        assert!(build_query_reply(&state, &query).is_none());
    }

    #[test]
    fn known_answer_with_stale_ttl_is_not_suppressed() {
        let mut state = fresh_state();
        state.store.add(a_record("host.local.", Ipv4Addr::new(192, 0, 2, 5), 120));
        state.hostname = Some(domain("host.local."));
        register(&mut state, "printer", "_ipp._tcp.local.", 631, "host.local.");

        let mut query = query_for("_ipp._tcp.local.", RecordType::PTR, false);
        // peer's cached TTL has dropped below half of ours: don't suppress.
        query.answers.push(ptr_record(
            "_ipp._tcp.local.",
            "printer._ipp._tcp.local.",
            100,
        ));

        assert!(build_query_reply(&state, &query).is_some());
    }

    // S4 / P6
    #[test]
    fn remove_service_queues_exactly_one_goodbye() {
        let mut state = fresh_state();
        state.store.add(a_record("host.local.", Ipv4Addr::new(192, 0, 2, 5), 120));
        state.hostname = Some(domain("host.local."));
        let handle = register(&mut state, "printer", "_ipp._tcp.local.", 631, "host.local.");

        remove_service(&mut state, handle);

        assert_eq!(state.leave.len(), 1);
        assert_eq!(state.leave[0].ttl, 0);
        assert!(state.store.get(&domain("_ipp._tcp.local.")).is_none());
        assert!(state.services.is_empty());
    }

    // P7
    #[test]
    fn services_meta_ptr_is_removed_with_its_type() {
        let mut state = fresh_state();
        state.store.add(a_record("host.local.", Ipv4Addr::new(192, 0, 2, 5), 120));
        state.hostname = Some(domain("host.local."));
        let handle = register(&mut state, "printer", "_ipp._tcp.local.", 631, "host.local.");

        remove_service(&mut state, handle);

        assert!(state.store.get(&services_meta_name()).is_none());
    }

    // S6
    #[test]
    fn shutdown_message_lists_every_service() {
        let mut state = fresh_state();
        state.store.add(a_record("host.local.", Ipv4Addr::new(192, 0, 2, 5), 120));
        state.hostname = Some(domain("host.local."));
        register(&mut state, "printer", "_ipp._tcp.local.", 631, "host.local.");
        register(&mut state, "scanner", "_scan._tcp.local.", 9100, "host.local.");

        let message = build_shutdown_message(&state).unwrap();
        assert_eq!(message.answers.len(), 2);
        assert!(message.answers.iter().all(|r| r.ttl == 0));
    }

    #[test]
    fn hostname_can_only_be_set_once() {
        let mut state = fresh_state();
        assert!(set_hostname_v4(&mut state, domain("host.local."), Ipv4Addr::new(1, 2, 3, 4)).is_ok());
        assert_eq!(
            set_hostname_v4(&mut state, domain("other.local."), Ipv4Addr::new(5, 6, 7, 8)),
            Err(HostnameAlreadySet)
        );
    }

    // exercises the announce-jitter delay deterministically, per the
    // test-tooling note in DESIGN.md, without an actual wall-clock wait.
    #[tokio::test(start_paused = true)]
    async fn jitter_delay_waits_within_its_bounds() {
        let start = tokio::time::Instant::now();
        jitter_delay(50, 100).await;
        assert!(tokio::time::Instant::now() - start >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn jitter_delay_is_a_no_op_when_window_is_zero() {
        let start = tokio::time::Instant::now();
        jitter_delay(0, 0).await;
        assert_eq!(tokio::time::Instant::now(), start);
    }
}
