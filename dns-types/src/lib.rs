#![warn(clippy::pedantic)]
// Sometimes a redundant else is clearer
#![allow(clippy::redundant_else)]
// Don't care enough to fix
#![allow(clippy::match_same_arms)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::wildcard_imports)]

//! DNS wire format types for multicast DNS / DNS-SD.
//!
//! This crate covers just the record types needed to publish and
//! answer queries for service instances: `A`, `AAAA`, `PTR`, `SRV`,
//! `TXT`, and `NSEC`.  It does not attempt the full RFC 1035 zoo
//! (`CNAME`, `MX`, `SOA`, ...); unsupported types decode as
//! `RecordTypeWithData::Unknown` and re-encode byte-for-byte.

pub mod protocol;
