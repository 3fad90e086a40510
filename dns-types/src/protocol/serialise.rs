//! Serialisation of DNS messages to the wire format.  See the `types`
//! module for details of the format.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::protocol::types::*;

/// An in-progress wire-format buffer, tracking the name-compression
/// table alongside the raw octets.
///
/// RFC 1035 section 4.1.4 lets any domain name (or name suffix) be
/// replaced with a pointer to an earlier occurrence of the same
/// labels, provided the earlier occurrence starts at an offset that
/// fits in 14 bits. This matters a lot more here than it would for a
/// one-record-at-a-time responder: a DNS-SD announcement packs the
/// same `<instance>.<type>.local.` suffix into several records in one
/// packet, so skipping compression would make multi-record
/// announcements balloon well past what's comfortable in one
/// datagram.
pub struct WritableBuffer {
    octets: Vec<u8>,
    name_compression: HashMap<Vec<Vec<u8>>, u16>,
}

impl Default for WritableBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl WritableBuffer {
    pub fn new() -> Self {
        WritableBuffer {
            octets: Vec::new(),
            name_compression: HashMap::new(),
        }
    }

    pub fn into_octets(self) -> Vec<u8> {
        self.octets
    }

    pub fn len(&self) -> usize {
        self.octets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.octets.is_empty()
    }

    pub fn write_u8(&mut self, octet: u8) {
        self.octets.push(octet);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.octets.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.octets.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_octets(&mut self, octets: &[u8]) {
        self.octets.extend_from_slice(octets);
    }

    /// Write a `DomainName`, compressing as much of its label
    /// sequence as possible against names already written to this
    /// buffer.
    ///
    /// The offset table is keyed on the *remaining* label suffix at
    /// each position, so `printer._ipp._tcp.local.` followed later by
    /// `_ipp._tcp.local.` compresses the second name down to a single
    /// two-byte pointer, even though the two names only share a
    /// suffix, not their whole spelling.
    pub fn write_domain_name(&mut self, name: &DomainName) {
        let mut labels = &name.labels[..];

        loop {
            if labels.len() == 1 {
                // just the root label left: terminate without
                // recording a compression entry for it, matching
                // RFC 1035's implicit root.
                self.write_u8(0);
                return;
            }

            if let Some(&offset) = self.name_compression.get(labels) {
                self.write_u16(0b1100_0000_0000_0000 | offset);
                return;
            }

            if let Ok(offset) = u16::try_from(self.octets.len()) {
                if offset <= 0x3FFF {
                    self.name_compression.insert(labels.to_vec(), offset);
                }
            }

            let label = &labels[0];
            self.write_u8(label.len() as u8);
            self.write_octets(label);
            labels = &labels[1..];
        }
    }

    /// Write a domain name without consulting or updating the
    /// compression table, as RFC 4034 section 6.2 requires for names
    /// appearing in NSEC rdata (and as RFC 2782's interoperable usage
    /// suggests for SRV targets).
    pub fn write_domain_name_uncompressed(&mut self, name: &DomainName) {
        for label in &name.labels {
            self.write_u8(label.len() as u8);
            self.write_octets(label);
        }
    }
}

impl Message {
    pub fn serialise(&self) -> Vec<u8> {
        let mut buffer = WritableBuffer::new();

        let header = WireHeader {
            header: self.header,
            qdcount: self.questions.len() as u16,
            ancount: self.answers.len() as u16,
            nscount: self.authority.len() as u16,
            arcount: self.additional.len() as u16,
        };
        header.serialise(&mut buffer);

        for question in &self.questions {
            question.serialise(&mut buffer);
        }
        for rr in &self.answers {
            rr.serialise(&mut buffer);
        }
        for rr in &self.authority {
            rr.serialise(&mut buffer);
        }
        for rr in &self.additional {
            rr.serialise(&mut buffer);
        }

        buffer.into_octets()
    }
}

impl WireHeader {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        buffer.write_u16(self.header.id);

        let mut flags: u16 = 0;
        if self.header.is_response {
            flags |= 0b1000_0000_0000_0000;
        }
        flags |= u16::from(u8::from(self.header.opcode)) << 11;
        if self.header.is_authoritative {
            flags |= 0b0000_0100_0000_0000;
        }
        if self.header.is_truncated {
            flags |= 0b0000_0010_0000_0000;
        }
        if self.header.recursion_desired {
            flags |= 0b0000_0001_0000_0000;
        }
        if self.header.recursion_available {
            flags |= 0b0000_0000_1000_0000;
        }
        flags |= u16::from(u8::from(self.header.rcode));
        buffer.write_u16(flags);

        buffer.write_u16(self.qdcount);
        buffer.write_u16(self.ancount);
        buffer.write_u16(self.nscount);
        buffer.write_u16(self.arcount);
    }
}

impl Question {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        buffer.write_domain_name(&self.name);
        buffer.write_u16(self.qtype.into());

        let mut qclass: u16 = self.qclass.into();
        if self.unicast_response {
            qclass |= 0b1000_0000_0000_0000;
        }
        buffer.write_u16(qclass);
    }
}

impl ResourceRecord {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        buffer.write_domain_name(&self.name);
        buffer.write_u16(self.rtype_with_data.rtype().into());

        let mut rclass: u16 = self.rclass.into();
        if self.cache_flush {
            rclass |= 0b1000_0000_0000_0000;
        }
        buffer.write_u16(rclass);

        buffer.write_u32(self.ttl);

        // rdlength is filled in after the rdata is written, since its
        // length isn't known up front when a name inside the rdata
        // gets compressed.
        let rdlength_index = buffer.len();
        buffer.write_u16(0);
        let rdata_start = buffer.len();

        self.rtype_with_data.serialise(buffer);

        let rdlength = (buffer.len() - rdata_start) as u16;
        buffer.octets[rdlength_index..rdlength_index + 2].copy_from_slice(&rdlength.to_be_bytes());
    }
}

impl RecordTypeWithData {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        match self {
            RecordTypeWithData::A { address } => {
                buffer.write_octets(&address.octets());
            }
            RecordTypeWithData::AAAA { address } => {
                buffer.write_octets(&address.octets());
            }
            RecordTypeWithData::PTR { ptrdname } => {
                buffer.write_domain_name(ptrdname);
            }
            RecordTypeWithData::SRV {
                priority,
                weight,
                port,
                target,
            } => {
                buffer.write_u16(*priority);
                buffer.write_u16(*weight);
                buffer.write_u16(*port);
                buffer.write_domain_name_uncompressed(target);
            }
            RecordTypeWithData::TXT { strings } => {
                if strings.is_empty() {
                    // a TXT record with no strings still carries a
                    // single empty string (RFC 6763 section 6.1).
                    buffer.write_u8(0);
                } else {
                    for s in strings {
                        buffer.write_u8(s.len() as u8);
                        buffer.write_octets(s);
                    }
                }
            }
            RecordTypeWithData::NSEC { next_domain, types } => {
                buffer.write_domain_name_uncompressed(next_domain);
                for (window, bitmap) in types.windows() {
                    buffer.write_u8(window);
                    buffer.write_u8(bitmap.len() as u8);
                    buffer.write_octets(&bitmap);
                }
            }
            RecordTypeWithData::Unknown { octets, .. } => {
                buffer.write_octets(octets);
            }
        }
    }
}

trait Octets {
    fn octets(&self) -> Vec<u8>;
}

impl Octets for Ipv4Addr {
    fn octets(&self) -> Vec<u8> {
        Ipv4Addr::octets(self).to_vec()
    }
}

impl Octets for Ipv6Addr {
    fn octets(&self) -> Vec<u8> {
        Ipv6Addr::octets(self).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::super::deserialise::ConsumableBuffer;
    use super::super::types::test_util::*;
    use super::*;

    #[test]
    fn compresses_repeated_suffix() {
        let mut buffer = WritableBuffer::new();
        let a = DomainName::from_dotted_string("printer._ipp._tcp.local.").unwrap();
        let b = DomainName::from_dotted_string("_ipp._tcp.local.").unwrap();

        buffer.write_domain_name(&a);
        let before_b = buffer.len();
        buffer.write_domain_name(&b);

        // a pointer is always exactly two octets
        assert_eq!(buffer.len() - before_b, 2);
    }

    #[test]
    fn message_roundtrips_through_deserialise() {
        let mut message = Message::response(42);
        message
            .answers
            .push(a_record("host.local.", Ipv4Addr::new(10, 0, 0, 1), 120));
        message.answers.push(ptr_record(
            "_ipp._tcp.local.",
            "printer._ipp._tcp.local.",
            4500,
        ));

        let octets = message.serialise();
        let mut buf = ConsumableBuffer::new(&octets);
        let decoded = Message::deserialise(&mut buf).unwrap();

        assert_eq!(decoded.answers.len(), 2);
        assert_eq!(decoded.answers[0].name, message.answers[0].name);
    }

    #[test]
    fn nsec_name_is_not_compressed() {
        let mut buffer = WritableBuffer::new();
        let name = DomainName::from_dotted_string("host.local.").unwrap();
        buffer.write_domain_name(&name);
        let before = buffer.len();
        buffer.write_domain_name_uncompressed(&name);
        // fully spelled out again, not a two-byte pointer
        assert!(buffer.len() - before > 2);
    }
}
