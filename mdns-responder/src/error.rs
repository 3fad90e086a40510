//! Error types for the responder. No third-party derive-macro error
//! crate is used anywhere in this lineage; every fallible surface gets
//! a small hand-written enum with `Display` and `std::error::Error`.

use std::fmt;
use std::io;

/// `start()` failed to bring up the multicast socket. Fatal: the
/// caller gets this back instead of a `Responder`.
#[derive(Debug)]
pub enum SocketSetupError {
    Bind(io::Error),
    SetSockOpt(&'static str, io::Error),
    JoinMulticast(io::Error),
}

impl fmt::Display for SocketSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketSetupError::Bind(_) => write!(f, "failed to bind multicast socket"),
            SocketSetupError::SetSockOpt(name, _) => {
                write!(f, "failed to set socket option {name}")
            }
            SocketSetupError::JoinMulticast(_) => {
                write!(f, "failed to join multicast group 224.0.0.251")
            }
        }
    }
}

impl std::error::Error for SocketSetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SocketSetupError::Bind(e)
            | SocketSetupError::SetSockOpt(_, e)
            | SocketSetupError::JoinMulticast(e) => Some(e),
        }
    }
}

/// `set_hostname`/`set_hostname_v6` was called a second time.
///
/// The source asserts this can't happen; this responder turns the
/// assertion into a returned error instead of a panic (see the
/// hostname-reset decision in `DESIGN.md`).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct HostnameAlreadySet;

impl fmt::Display for HostnameAlreadySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hostname has already been set for this responder")
    }
}

impl std::error::Error for HostnameAlreadySet {}

/// `register_service` was called without a hostname parameter on a
/// responder that has no hostname of its own set yet either.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct NoHostname;

impl fmt::Display for NoHostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "register_service requires an explicit hostname or a responder hostname to be set"
        )
    }
}

impl std::error::Error for NoHostname {}

/// The engine task has already shut down or been dropped; a
/// `Responder` handle's command could not be delivered.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EngineGone;

impl fmt::Display for EngineGone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "responder engine task is no longer running")
    }
}

impl std::error::Error for EngineGone {}

/// An instance or type name supplied to `register_service` doesn't
/// fit the wire format: empty, a label over 63 octets, a joined name
/// over 255 octets, or non-ASCII. This responder does not re-validate
/// UTF-8 content beyond that (see §6 of the design).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct InvalidName;

impl fmt::Display for InvalidName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service instance or type name is not a valid domain name")
    }
}

impl std::error::Error for InvalidName {}

/// Failure registering a service: either a precondition was
/// violated by the caller, or the engine was already gone.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RegisterError {
    NoHostname(NoHostname),
    InvalidName(InvalidName),
    EngineGone(EngineGone),
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::NoHostname(e) => e.fmt(f),
            RegisterError::InvalidName(e) => e.fmt(f),
            RegisterError::EngineGone(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for RegisterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegisterError::NoHostname(e) => Some(e),
            RegisterError::InvalidName(e) => Some(e),
            RegisterError::EngineGone(e) => Some(e),
        }
    }
}

impl From<NoHostname> for RegisterError {
    fn from(e: NoHostname) -> Self {
        RegisterError::NoHostname(e)
    }
}

impl From<InvalidName> for RegisterError {
    fn from(e: InvalidName) -> Self {
        RegisterError::InvalidName(e)
    }
}

impl From<EngineGone> for RegisterError {
    fn from(e: EngineGone) -> Self {
        RegisterError::EngineGone(e)
    }
}

/// Failure setting the responder's hostname: either it was already
/// set once before, or the engine was already gone.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SetHostnameError {
    AlreadySet(HostnameAlreadySet),
    EngineGone(EngineGone),
}

impl fmt::Display for SetHostnameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetHostnameError::AlreadySet(e) => e.fmt(f),
            SetHostnameError::EngineGone(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for SetHostnameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetHostnameError::AlreadySet(e) => Some(e),
            SetHostnameError::EngineGone(e) => Some(e),
        }
    }
}

impl From<HostnameAlreadySet> for SetHostnameError {
    fn from(e: HostnameAlreadySet) -> Self {
        SetHostnameError::AlreadySet(e)
    }
}

impl From<EngineGone> for SetHostnameError {
    fn from(e: EngineGone) -> Self {
        SetHostnameError::EngineGone(e)
    }
}
