//! The handle returned by `register_service`, used to drive removal.

use dns_types::protocol::types::DomainName;

/// Identifies one registered service instance.
///
/// Holds just enough to find the instance's own records again later:
/// the type name (owner of its PTR, alongside any other instances of
/// the same type) and the instance name (owner of its SRV and, if
/// any, TXT record). The `_services._dns-sd._udp.local` meta-PTR
/// isn't tracked here — the store is scanned for it by the type name
/// at removal time, matching the source's `entry_remove` pattern
/// rather than carrying a second handle field for it.
///
/// `remove_service` consumes this by value; a dropped handle that was
/// never passed to `remove_service` simply leaves its entries
/// published until the responder itself shuts down (see the
/// service-handle-lifetime decision in `DESIGN.md`).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ServiceHandle {
    pub(crate) type_name: DomainName,
    pub(crate) instance_name: DomainName,
    pub(crate) has_txt: bool,
}
