use std::collections::BTreeSet;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Basic DNS message format, used for both queries and responses.
///
/// ```text
///     +---------------------+
///     |        Header       |
///     +---------------------+
///     |       Question      | the question being asked (or answered)
///     +---------------------+
///     |        Answer       | RRs answering the question
///     +---------------------+
///     |      Authority      | RRs pointing toward an authority (unused here)
///     +---------------------+
///     |      Additional     | RRs holding additional information
///     +---------------------+
/// ```
///
/// See section 4.1 of RFC 1035. The `authority` section is carried
/// for wire-format fidelity but this responder never populates it: it
/// answers authoritatively for its own records without a concept of
/// delegation.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl Message {
    /// An empty, authoritative response shell with a given id, ready
    /// to have answers pushed onto it.
    pub fn response(id: u16) -> Self {
        Self {
            header: Header {
                id,
                is_response: true,
                opcode: Opcode::Standard,
                is_authoritative: true,
                is_truncated: false,
                recursion_desired: false,
                recursion_available: false,
                rcode: Rcode::NoError,
            },
            questions: Vec::new(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    pub fn total_answers(&self) -> usize {
        self.answers.len()
    }
}

/// Common header type for all messages.
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      ID                       |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    QDCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ANCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    NSCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ARCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// See section 4.1.1 of RFC 1035. This responder only ever emits
/// `opcode = Standard`, `rcode = NoError`; other values are decoded
/// faithfully so a caller can tell a non-standard-query packet apart
/// from a standard one (and drop it, per RFC 6762 section 18).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub struct Header {
    /// A 16 bit identifier assigned by the program that generates any
    /// kind of query. Copied verbatim into the response.
    pub id: u16,

    /// Query (false) or response (true).
    pub is_response: bool,

    /// Kind of query. mDNS only ever uses `Standard`.
    pub opcode: Opcode,

    /// Set on authoritative responses; this responder sets it on
    /// every outgoing answer, since it never forwards or caches.
    pub is_authoritative: bool,

    /// Message was truncated. Not produced by this responder; it
    /// never emits a packet that exceeds a single UDP datagram's
    /// worth of records the way a TCP-backed server might need to.
    pub is_truncated: bool,

    /// Recursion desired. Not meaningful for mDNS; preserved on
    /// decode, never set on encode.
    pub recursion_desired: bool,

    /// Recursion available. Not meaningful for mDNS.
    pub recursion_available: bool,

    /// Response code.
    pub rcode: Rcode,
}

/// A `Header` as it appears on the wire, with the four section
/// counts. Kept separate from `Header` so the in-memory type can
/// never disagree with `Vec::len()` of its own sections.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub struct WireHeader {
    pub header: Header,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

/// A single entry in the question section.
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     /                     QNAME                     /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     QTYPE                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     QCLASS                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// The top bit of QCLASS is not part of QCLASS at all under mDNS
/// (RFC 6762 section 5.4): it is the "unicast response requested"
/// bit, so it is split out here as `unicast_response` rather than
/// folded into `qclass`.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub struct Question {
    pub name: DomainName,
    pub qtype: QueryType,
    pub qclass: QueryClass,
    pub unicast_response: bool,
}

impl Question {
    pub fn is_unknown(&self) -> bool {
        self.qtype.is_unknown() || self.qclass.is_unknown()
    }
}

/// The answer, authority, and additional sections are all the same
/// format: a variable number of resource records.
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     /                      NAME                     /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      TYPE                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     CLASS                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      TTL                      |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                   RDLENGTH                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--|
///     /                     RDATA                     /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// As with `Question`, the top bit of the wire CLASS field is split
/// out: on outgoing answers it is the cache-flush bit (RFC 6762
/// section 10.2), so it's `cache_flush` here rather than folded into
/// `rclass`.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub struct ResourceRecord {
    pub name: DomainName,
    pub rtype_with_data: RecordTypeWithData,
    pub rclass: RecordClass,
    pub cache_flush: bool,
    pub ttl: u32,
}

impl ResourceRecord {
    pub fn is_unknown(&self) -> bool {
        self.rtype_with_data.is_unknown() || self.rclass.is_unknown()
    }

    pub fn matches(&self, question: &Question) -> bool {
        self.rtype_with_data.matches(&question.qtype) && self.rclass.matches(&question.qclass)
    }

    /// Equality used by the record store and the known-answer
    /// suppression algorithm: names compare case-insensitively,
    /// classes ignore `cache_flush`, and TTL is not part of identity
    /// at all (the same logical record re-announced with a different
    /// TTL is still "the same entry").
    pub fn entry_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.rtype_with_data == other.rtype_with_data
            && self.rclass == other.rclass
    }
}

/// A record type with its associated, deserialised, data.
///
/// Only the six record types this responder needs to speak are given
/// real variants; everything else decodes to `Unknown` and
/// re-encodes its raw octets unchanged, so a packet containing a
/// foreign record type still round-trips.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RecordTypeWithData {
    /// A 32-bit IPv4 host address.
    A { address: Ipv4Addr },

    /// A 128-bit IPv6 host address.
    AAAA { address: Ipv6Addr },

    /// A pointer to another name; used for DNS-SD service type and
    /// meta-service enumeration.
    PTR { ptrdname: DomainName },

    /// ```text
    ///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    ///     |                   PRIORITY                    |
    ///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    ///     |                    WEIGHT                     |
    ///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    ///     |                     PORT                      |
    ///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    ///     /                    TARGET                     /
    ///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    /// ```
    ///
    /// See RFC 2782.
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: DomainName,
    },

    /// Free-form key\[=value\] strings; each list element is one
    /// length-prefixed string on the wire, and the list is
    /// order-significant for equality (see DESIGN.md).
    TXT { strings: Vec<Vec<u8>> },

    /// Denial-of-existence / type-enumeration record (RFC 4034
    /// section 4, used here purely as a positive assertion of "these
    /// types exist at this name" the way RFC 6762 section 6.1
    /// describes, not for DNSSEC).
    NSEC {
        next_domain: DomainName,
        types: NsecTypeBitmap,
    },

    /// Any other record type: the raw rdata octets, preserved as-is.
    Unknown { tag: u16, octets: Vec<u8> },
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for RecordTypeWithData {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let rtype_with_data = match u.arbitrary::<RecordType>()? {
            RecordType::A => RecordTypeWithData::A {
                address: u.arbitrary()?,
            },
            RecordType::AAAA => RecordTypeWithData::AAAA {
                address: u.arbitrary()?,
            },
            RecordType::PTR => RecordTypeWithData::PTR {
                ptrdname: u.arbitrary()?,
            },
            RecordType::SRV => RecordTypeWithData::SRV {
                priority: u.arbitrary()?,
                weight: u.arbitrary()?,
                port: u.arbitrary()?,
                target: u.arbitrary()?,
            },
            RecordType::TXT => {
                let n = u.int_in_range(0..=4)?;
                let mut strings = Vec::with_capacity(n);
                for _ in 0..n {
                    let len = u.int_in_range(0..=63)?;
                    strings.push(Vec::from(u.bytes(len)?));
                }
                RecordTypeWithData::TXT { strings }
            }
            RecordType::NSEC => RecordTypeWithData::NSEC {
                next_domain: u.arbitrary()?,
                types: u.arbitrary()?,
            },
            RecordType::Unknown(tag) => {
                let len = u.int_in_range(0..=128)?;
                RecordTypeWithData::Unknown {
                    tag,
                    octets: Vec::from(u.bytes(len)?),
                }
            }
        };
        Ok(rtype_with_data)
    }
}

impl RecordTypeWithData {
    pub fn is_unknown(&self) -> bool {
        matches!(self, RecordTypeWithData::Unknown { .. })
    }

    pub fn rtype(&self) -> RecordType {
        match self {
            RecordTypeWithData::A { .. } => RecordType::A,
            RecordTypeWithData::AAAA { .. } => RecordType::AAAA,
            RecordTypeWithData::PTR { .. } => RecordType::PTR,
            RecordTypeWithData::SRV { .. } => RecordType::SRV,
            RecordTypeWithData::TXT { .. } => RecordType::TXT,
            RecordTypeWithData::NSEC { .. } => RecordType::NSEC,
            RecordTypeWithData::Unknown { tag, .. } => RecordType::Unknown(*tag),
        }
    }

    pub fn matches(&self, qtype: &QueryType) -> bool {
        match qtype {
            QueryType::Wildcard => !matches!(self, RecordTypeWithData::NSEC { .. }),
            QueryType::Record(rtype) => self.rtype() == *rtype,
        }
    }
}

/// The RFC 4034 section 4.1.2 windowed type bitmap: the set of
/// record types that exist at a name, used by NSEC to assert (for
/// example) "only an AAAA record exists here, don't bother asking
/// for A".
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct NsecTypeBitmap {
    types: BTreeSet<u16>,
}

impl NsecTypeBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rtype: RecordType) -> Self {
        self.insert(rtype);
        self
    }

    pub fn insert(&mut self, rtype: RecordType) {
        self.types.insert(rtype.into());
    }

    pub fn contains(&self, rtype: RecordType) -> bool {
        self.types.contains(&u16::from(rtype))
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.types.iter().copied()
    }

    /// Group the set members into `(window, bitmap)` pairs ready for
    /// wire encoding: one window per distinct high byte of the type
    /// value, bits numbered most-significant-first within each byte.
    pub fn windows(&self) -> Vec<(u8, Vec<u8>)> {
        let mut by_window: std::collections::BTreeMap<u8, Vec<u8>> =
            std::collections::BTreeMap::new();
        for &t in &self.types {
            let window = (t / 256) as u8;
            let bit = (t % 256) as u8;
            let byte_idx = usize::from(bit / 8);
            let bitmap = by_window.entry(window).or_default();
            if bitmap.len() <= byte_idx {
                bitmap.resize(byte_idx + 1, 0);
            }
            bitmap[byte_idx] |= 0x80 >> (bit % 8);
        }
        by_window.into_iter().collect()
    }

    /// Inverse of `windows`: reconstruct the type set from wire
    /// windows.
    pub fn from_windows(windows: &[(u8, Vec<u8>)]) -> Self {
        let mut types = BTreeSet::new();
        for (window, bitmap) in windows {
            for (byte_idx, byte) in bitmap.iter().enumerate() {
                for bit in 0..8u16 {
                    if byte & (0x80 >> bit) != 0 {
                        let t = u16::from(*window) * 256 + (byte_idx as u16) * 8 + bit;
                        types.insert(t);
                    }
                }
            }
        }
        Self { types }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for NsecTypeBitmap {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let n = u.int_in_range(0..=4)?;
        let mut bitmap = NsecTypeBitmap::new();
        for _ in 0..n {
            bitmap.insert(u.arbitrary::<RecordType>()?);
        }
        Ok(bitmap)
    }
}

/// What sort of query this is. mDNS only ever sends and expects
/// `Standard`; anything else is dropped (RFC 6762 section 18.3).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub enum Opcode {
    Standard,
    Inverse,
    Status,
    Reserved(OpcodeReserved),
}

/// A struct with a private constructor, to ensure invalid `Opcode`s
/// cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub struct OpcodeReserved(u8);

impl Opcode {
    pub fn is_standard(&self) -> bool {
        matches!(self, Opcode::Standard)
    }
}

impl From<u8> for Opcode {
    fn from(octet: u8) -> Self {
        match octet & 0b0000_1111 {
            0 => Opcode::Standard,
            1 => Opcode::Inverse,
            2 => Opcode::Status,
            other => Opcode::Reserved(OpcodeReserved(other)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        match value {
            Opcode::Standard => 0,
            Opcode::Inverse => 1,
            Opcode::Status => 2,
            Opcode::Reserved(OpcodeReserved(octet)) => octet,
        }
    }
}

/// What sort of response this is. This responder only ever emits
/// `NoError`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub enum Rcode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Reserved(RcodeReserved),
}

/// A struct with a private constructor, to ensure invalid `Rcode`s
/// cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub struct RcodeReserved(u8);

impl From<u8> for Rcode {
    fn from(octet: u8) -> Self {
        match octet & 0b0000_1111 {
            0 => Rcode::NoError,
            1 => Rcode::FormatError,
            2 => Rcode::ServerFailure,
            3 => Rcode::NameError,
            4 => Rcode::NotImplemented,
            5 => Rcode::Refused,
            other => Rcode::Reserved(RcodeReserved(other)),
        }
    }
}

impl From<Rcode> for u8 {
    fn from(value: Rcode) -> Self {
        match value {
            Rcode::NoError => 0,
            Rcode::FormatError => 1,
            Rcode::ServerFailure => 2,
            Rcode::NameError => 3,
            Rcode::NotImplemented => 4,
            Rcode::Refused => 5,
            Rcode::Reserved(RcodeReserved(octet)) => octet,
        }
    }
}

/// A domain name is a sequence of labels, where each label is a
/// length octet followed by that number of octets, terminated by a
/// zero-length label. Since this crate doesn't need to inspect
/// names beyond comparing and joining them, they're kept in this
/// opaque, already-lowercased form.
///
/// A label must be 63 octets or shorter. A name must be 255 octets
/// or shorter in total, including both length and label octets.
/// Both bounds are enforced by every constructor, so a `DomainName`
/// value is always wire-valid; `serialise` never has an encode-time
/// "name too long" failure to report.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DomainName {
    pub octets: Vec<u8>,
    pub labels: Vec<Vec<u8>>,
}

impl DomainName {
    pub fn root() -> Self {
        DomainName {
            octets: vec![0],
            labels: vec![vec![]],
        }
    }

    pub fn is_root(&self) -> bool {
        self.labels.len() == 1
    }

    pub fn is_subdomain_of(&self, other: &DomainName) -> bool {
        self.labels.ends_with(&other.labels)
    }

    /// Build the name `label.origin` (e.g. an SRV target or service
    /// instance name under a type), joining one extra label onto an
    /// existing name without re-parsing either side.
    pub fn prepend_label(&self, label: &[u8]) -> Option<Self> {
        if label.is_empty() || label.len() > 63 {
            return None;
        }
        if !label.is_ascii() {
            return None;
        }
        let lower: Vec<u8> = label.iter().map(u8::to_ascii_lowercase).collect();
        let mut labels = Vec::with_capacity(self.labels.len() + 1);
        labels.push(lower);
        labels.extend(self.labels.iter().cloned());
        let mut octets = Vec::with_capacity(self.octets.len() + 1 + label.len());
        octets.push(u8::try_from(label.len()).ok()?);
        octets.extend_from_slice(&labels[0]);
        octets.extend_from_slice(&self.octets);
        if octets.len() > 255 {
            return None;
        }
        Some(Self { octets, labels })
    }

    pub fn to_dotted_string(&self) -> String {
        if self.is_root() {
            return ".".to_string();
        }

        let mut out = String::with_capacity(self.octets.len());
        let mut first = true;
        for label in &self.labels {
            if first {
                first = false;
            } else {
                out.push('.');
            }
            for octet in label {
                out.push(*octet as char);
            }
        }

        out
    }

    pub fn from_dotted_string(s: &str) -> Option<Self> {
        if s == "." {
            return Some(Self::root());
        }

        let chunks = s.split('.').collect::<Vec<_>>();
        let mut labels = Vec::with_capacity(chunks.len());

        for (i, label) in chunks.iter().enumerate() {
            if label.is_empty() && i != chunks.len() - 1 {
                return None;
            }

            labels.push(label.as_bytes().into());
        }

        Self::from_labels(labels)
    }

    pub fn from_labels(mixed_case_labels: Vec<Vec<u8>>) -> Option<Self> {
        if mixed_case_labels.is_empty() {
            return None;
        }

        let mut labels = Vec::<Vec<u8>>::with_capacity(mixed_case_labels.len());
        let mut octets = Vec::<u8>::with_capacity(255);
        let mut blank_label = false;

        for mc_label in &mixed_case_labels {
            if blank_label {
                return None;
            }

            blank_label = mc_label.is_empty();

            match mc_label.len().try_into() {
                Ok(n) if n <= 63 => {
                    octets.push(n);
                    let mut label = Vec::<u8>::with_capacity(mc_label.len());
                    for octet in mc_label {
                        if !octet.is_ascii() {
                            return None;
                        }

                        let octet = octet.to_ascii_lowercase();
                        label.push(octet);
                        octets.push(octet);
                    }
                    labels.push(label);
                }
                _ => return None,
            }
        }

        if blank_label && octets.len() <= 255 {
            Some(Self { octets, labels })
        } else {
            None
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for DomainName {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let n = u.int_in_range(1..=5)?;
        let mut labels = Vec::with_capacity(n + 1);
        for _ in 0..n {
            let len = u.int_in_range(1..=15)?;
            let mut label = Vec::from(u.bytes(len)?);
            for b in &mut label {
                *b = b"abcdefghijklmnopqrstuvwxyz0123456789-"[(*b as usize) % 38];
            }
            labels.push(label);
        }
        labels.push(Vec::new());
        Ok(Self::from_labels(labels).unwrap())
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainName")
            .field("to_dotted_string()", &self.to_dotted_string())
            .finish()
    }
}

/// The type being asked for in a question: either a concrete record
/// type, or the wildcard `ANY` (QTYPE 255).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub enum QueryType {
    Record(RecordType),
    Wildcard,
}

impl QueryType {
    pub fn is_unknown(&self) -> bool {
        matches!(self, QueryType::Record(RecordType::Unknown(_)))
    }
}

impl From<u16> for QueryType {
    fn from(value: u16) -> Self {
        if value == 255 {
            QueryType::Wildcard
        } else {
            QueryType::Record(RecordType::from(value))
        }
    }
}

impl From<QueryType> for u16 {
    fn from(value: QueryType) -> Self {
        match value {
            QueryType::Wildcard => 255,
            QueryType::Record(rtype) => rtype.into(),
        }
    }
}

/// The class being asked for in a question, with the mDNS
/// unicast-response bit already split off by the caller (see
/// `Question::unicast_response`).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub enum QueryClass {
    Record(RecordClass),
    Wildcard,
}

impl QueryClass {
    pub fn is_unknown(&self) -> bool {
        matches!(self, QueryClass::Record(RecordClass::Unknown(_)))
    }

    pub fn matches(&self, rclass: &RecordClass) -> bool {
        match self {
            QueryClass::Wildcard => true,
            QueryClass::Record(c) => c == rclass,
        }
    }
}

impl From<u16> for QueryClass {
    fn from(value: u16) -> Self {
        if value == 255 {
            QueryClass::Wildcard
        } else {
            QueryClass::Record(RecordClass::from(value))
        }
    }
}

impl From<QueryClass> for u16 {
    fn from(value: QueryClass) -> Self {
        match value {
            QueryClass::Wildcard => 255,
            QueryClass::Record(rclass) => rclass.into(),
        }
    }
}

/// The class of a record. Always `IN` in practice for mDNS, but
/// decoded faithfully.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub enum RecordClass {
    IN,
    Unknown(u16),
}

impl RecordClass {
    pub fn is_unknown(&self) -> bool {
        matches!(self, RecordClass::Unknown(_))
    }

    pub fn matches(&self, qclass: &QueryClass) -> bool {
        qclass.matches(self)
    }
}

impl From<u16> for RecordClass {
    fn from(value: u16) -> Self {
        // the wire value has already had its top bit (unicast /
        // cache-flush) stripped by the caller before reaching here.
        match value & 0x7FFF {
            1 => RecordClass::IN,
            other => RecordClass::Unknown(other),
        }
    }
}

impl From<RecordClass> for u16 {
    fn from(value: RecordClass) -> Self {
        match value {
            RecordClass::IN => 1,
            RecordClass::Unknown(other) => other,
        }
    }
}

/// The type of a record, restricted to what this responder speaks
/// plus a catch-all for anything else seen on the wire.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub enum RecordType {
    A,
    PTR,
    TXT,
    AAAA,
    SRV,
    NSEC,
    Unknown(u16),
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::PTR => write!(f, "PTR"),
            RecordType::TXT => write!(f, "TXT"),
            RecordType::AAAA => write!(f, "AAAA"),
            RecordType::SRV => write!(f, "SRV"),
            RecordType::NSEC => write!(f, "NSEC"),
            RecordType::Unknown(tag) => write!(f, "TYPE{tag}"),
        }
    }
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            12 => RecordType::PTR,
            16 => RecordType::TXT,
            28 => RecordType::AAAA,
            33 => RecordType::SRV,
            47 => RecordType::NSEC,
            other => RecordType::Unknown(other),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::A => 1,
            RecordType::PTR => 12,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::SRV => 33,
            RecordType::NSEC => 47,
            RecordType::Unknown(other) => other,
        }
    }
}

#[cfg(any(feature = "test-util", test))]
pub mod test_util {
    use super::*;

    pub fn domain(name: &str) -> DomainName {
        DomainName::from_dotted_string(name).unwrap()
    }

    pub fn a_record(name: &str, address: Ipv4Addr, ttl: u32) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::A { address },
            rclass: RecordClass::IN,
            cache_flush: true,
            ttl,
        }
    }

    pub fn aaaa_record(name: &str, address: Ipv6Addr, ttl: u32) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::AAAA { address },
            rclass: RecordClass::IN,
            cache_flush: true,
            ttl,
        }
    }

    pub fn ptr_record(name: &str, target: &str, ttl: u32) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::PTR {
                ptrdname: domain(target),
            },
            rclass: RecordClass::IN,
            cache_flush: false,
            ttl,
        }
    }

    pub fn srv_record(
        name: &str,
        priority: u16,
        weight: u16,
        port: u16,
        target: &str,
        ttl: u32,
    ) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::SRV {
                priority,
                weight,
                port,
                target: domain(target),
            },
            rclass: RecordClass::IN,
            cache_flush: true,
            ttl,
        }
    }

    pub fn txt_record(name: &str, strings: &[&[u8]], ttl: u32) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::TXT {
                strings: strings.iter().map(|s| s.to_vec()).collect(),
            },
            rclass: RecordClass::IN,
            cache_flush: true,
            ttl,
        }
    }

    pub fn nsec_record(name: &str, types: &[RecordType], ttl: u32) -> ResourceRecord {
        let mut bitmap = NsecTypeBitmap::new();
        for t in types {
            bitmap.insert(*t);
        }
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::NSEC {
                next_domain: domain(name),
                types: bitmap,
            },
            rclass: RecordClass::IN,
            cache_flush: true,
            ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;

    #[test]
    fn domain_root_conversions() {
        assert_eq!(DomainName::root().to_dotted_string(), ".");
        assert_eq!(DomainName::from_dotted_string("."), Some(DomainName::root()));
    }

    #[test]
    fn domain_case_insensitive_equality() {
        assert_eq!(domain("Foo.Local."), domain("foo.local."));
    }

    #[test]
    fn domain_is_subdomain_of() {
        assert!(domain("printer._ipp._tcp.local.").is_subdomain_of(&domain("_ipp._tcp.local.")));
        assert!(!domain("_ipp._tcp.local.").is_subdomain_of(&domain("printer._ipp._tcp.local.")));
    }

    #[test]
    fn domain_prepend_label() {
        let joined = domain("_ipp._tcp.local.")
            .prepend_label(b"printer")
            .unwrap();
        assert_eq!(joined, domain("printer._ipp._tcp.local."));
    }

    #[test]
    fn domain_rejects_oversized_label() {
        let label = vec![b'x'; 64];
        assert_eq!(DomainName::from_labels(vec![label, vec![]]), None);
    }

    #[test]
    fn record_type_roundtrips() {
        for t in [
            RecordType::A,
            RecordType::PTR,
            RecordType::TXT,
            RecordType::AAAA,
            RecordType::SRV,
            RecordType::NSEC,
            RecordType::Unknown(999),
        ] {
            let n: u16 = t.into();
            assert_eq!(RecordType::from(n), t);
        }
    }

    #[test]
    fn nsec_bitmap_windows_roundtrip() {
        let bitmap = NsecTypeBitmap::new()
            .with(RecordType::A)
            .with(RecordType::AAAA);
        let windows = bitmap.windows();
        assert_eq!(NsecTypeBitmap::from_windows(&windows), bitmap);
    }

    #[test]
    fn entry_eq_ignores_ttl_and_cache_flush() {
        let a1 = a_record("host.local.", Ipv4Addr::new(1, 2, 3, 4), 120);
        let mut a2 = a_record("host.local.", Ipv4Addr::new(1, 2, 3, 4), 4500);
        a2.cache_flush = false;
        assert!(a1.entry_eq(&a2));
    }

    #[test]
    fn record_type_with_data_matches_wildcard_excludes_nsec() {
        let nsec = nsec_record("host.local.", &[RecordType::A], 120);
        assert!(!nsec.rtype_with_data.matches(&QueryType::Wildcard));
        assert!(nsec
            .rtype_with_data
            .matches(&QueryType::Record(RecordType::NSEC)));
    }
}
