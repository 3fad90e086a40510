//! Deserialisation of DNS messages from the network.  See the `types`
//! module for details of the format.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::protocol::types::*;

/// A name is allowed to jump backwards via a compression pointer an
/// unbounded number of times in principle; in practice a packet with
/// more than this many pointer hops (or labels) in one name is either
/// malicious or malformed, and this bound stops decode from spinning
/// forever on it.
const MAX_NAME_HOPS: usize = 128;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// Ran off the end of the buffer before finishing a value.
    Truncated,
    /// The buffer's contents don't parse as a valid value at all
    /// (out-of-range enum tag where none is permitted, bad length
    /// prefix, and so on).
    Malformed,
    /// A domain name's compression pointers formed a cycle, or simply
    /// took more than `MAX_NAME_HOPS` hops to resolve.
    NameLoop,
    /// A decoded name exceeded the 255-octet wire limit.
    NameTooLong,
    /// A compression pointer pointed forwards (or at itself), which
    /// RFC 1035 section 4.1.4 never produces and this decoder
    /// therefore treats as corrupt rather than silently allowing.
    ForwardPointer,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated => write!(f, "unexpected end of buffer"),
            Error::Malformed => write!(f, "malformed value"),
            Error::NameLoop => write!(f, "domain name compression pointer loop"),
            Error::NameTooLong => write!(f, "domain name exceeds 255 octets"),
            Error::ForwardPointer => write!(f, "domain name compression pointer points forward"),
        }
    }
}

impl std::error::Error for Error {}

/// A cursor over a wire-format buffer, with the absolute position
/// tracked so that `DomainName` decoding can both follow compression
/// pointers (which seek backwards) and validate that they only ever
/// point at strictly earlier offsets.
#[derive(Clone)]
pub struct ConsumableBuffer<'a> {
    octets: &'a [u8],
    position: usize,
}

impl<'a> ConsumableBuffer<'a> {
    pub fn new(octets: &'a [u8]) -> Self {
        ConsumableBuffer {
            octets,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.position + n > self.octets.len() {
            return Err(Error::Truncated);
        }
        let slice = &self.octets[self.position..self.position + n];
        self.position += n;
        Ok(slice)
    }

    pub fn take_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn take_u16(&mut self) -> Result<u16, Error> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn take_u32(&mut self) -> Result<u32, Error> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn take_octets(&mut self, n: usize) -> Result<Vec<u8>, Error> {
        Ok(self.take(n)?.to_vec())
    }

    /// Make a cursor over the same underlying buffer, seeked to an
    /// absolute offset (used to follow a compression pointer without
    /// disturbing the caller's own position).
    fn seek(&self, offset: usize) -> Self {
        ConsumableBuffer {
            octets: self.octets,
            position: offset,
        }
    }
}

impl Message {
    pub fn deserialise(buffer: &mut ConsumableBuffer<'_>) -> Result<Self, Error> {
        let wire_header = WireHeader::deserialise(buffer)?;

        let mut questions = Vec::with_capacity(usize::from(wire_header.qdcount));
        for _ in 0..wire_header.qdcount {
            questions.push(Question::deserialise(buffer)?);
        }

        let mut answers = Vec::with_capacity(usize::from(wire_header.ancount));
        for _ in 0..wire_header.ancount {
            answers.push(ResourceRecord::deserialise(buffer)?);
        }

        let mut authority = Vec::with_capacity(usize::from(wire_header.nscount));
        for _ in 0..wire_header.nscount {
            authority.push(ResourceRecord::deserialise(buffer)?);
        }

        let mut additional = Vec::with_capacity(usize::from(wire_header.arcount));
        for _ in 0..wire_header.arcount {
            additional.push(ResourceRecord::deserialise(buffer)?);
        }

        Ok(Message {
            header: wire_header.header,
            questions,
            answers,
            authority,
            additional,
        })
    }
}

impl WireHeader {
    fn deserialise(buffer: &mut ConsumableBuffer<'_>) -> Result<Self, Error> {
        let id = buffer.take_u16()?;
        let flags = buffer.take_u16()?;

        let header = Header {
            id,
            is_response: flags & 0b1000_0000_0000_0000 != 0,
            opcode: Opcode::from(((flags >> 11) & 0b1111) as u8),
            is_authoritative: flags & 0b0000_0100_0000_0000 != 0,
            is_truncated: flags & 0b0000_0010_0000_0000 != 0,
            recursion_desired: flags & 0b0000_0001_0000_0000 != 0,
            recursion_available: flags & 0b0000_0000_1000_0000 != 0,
            rcode: Rcode::from((flags & 0b1111) as u8),
        };

        Ok(WireHeader {
            header,
            qdcount: buffer.take_u16()?,
            ancount: buffer.take_u16()?,
            nscount: buffer.take_u16()?,
            arcount: buffer.take_u16()?,
        })
    }
}

impl Question {
    fn deserialise(buffer: &mut ConsumableBuffer<'_>) -> Result<Self, Error> {
        let name = DomainName::deserialise(buffer)?;
        let qtype = QueryType::from(buffer.take_u16()?);
        let raw_qclass = buffer.take_u16()?;

        Ok(Question {
            name,
            qtype,
            qclass: QueryClass::from(raw_qclass & 0x7FFF),
            unicast_response: raw_qclass & 0b1000_0000_0000_0000 != 0,
        })
    }
}

impl ResourceRecord {
    fn deserialise(buffer: &mut ConsumableBuffer<'_>) -> Result<Self, Error> {
        let name = DomainName::deserialise(buffer)?;
        let rtype = RecordType::from(buffer.take_u16()?);
        let raw_rclass = buffer.take_u16()?;
        let ttl = buffer.take_u32()?;
        let rdlength = buffer.take_u16()?;

        let rdata_start = buffer.position();
        let rdata_end = rdata_start + usize::from(rdlength);
        let rtype_with_data = RecordTypeWithData::deserialise(rtype, buffer, rdata_end)?;
        // rdata parsers that contain names may have followed
        // compression pointers backwards; resync to just past this
        // record's rdata regardless of where the name decode left
        // the cursor.
        *buffer = buffer.seek(rdata_end);

        Ok(ResourceRecord {
            name,
            rtype_with_data,
            rclass: RecordClass::from(raw_rclass & 0x7FFF),
            cache_flush: raw_rclass & 0b1000_0000_0000_0000 != 0,
            ttl,
        })
    }
}

impl RecordTypeWithData {
    fn deserialise(
        rtype: RecordType,
        buffer: &mut ConsumableBuffer<'_>,
        rdata_end: usize,
    ) -> Result<Self, Error> {
        match rtype {
            RecordType::A => {
                let octets = buffer.take_octets(4)?;
                Ok(RecordTypeWithData::A {
                    address: Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]),
                })
            }
            RecordType::AAAA => {
                let octets = buffer.take_octets(16)?;
                let mut arr = [0u8; 16];
                arr.copy_from_slice(&octets);
                Ok(RecordTypeWithData::AAAA {
                    address: Ipv6Addr::from(arr),
                })
            }
            RecordType::PTR => Ok(RecordTypeWithData::PTR {
                ptrdname: DomainName::deserialise(buffer)?,
            }),
            RecordType::SRV => {
                let priority = buffer.take_u16()?;
                let weight = buffer.take_u16()?;
                let port = buffer.take_u16()?;
                let target = DomainName::deserialise(buffer)?;
                Ok(RecordTypeWithData::SRV {
                    priority,
                    weight,
                    port,
                    target,
                })
            }
            RecordType::TXT => {
                let mut strings = Vec::new();
                while buffer.position() < rdata_end {
                    let len = buffer.take_u8()?;
                    strings.push(buffer.take_octets(usize::from(len))?);
                }
                Ok(RecordTypeWithData::TXT { strings })
            }
            RecordType::NSEC => {
                let next_domain = DomainName::deserialise(buffer)?;
                let mut windows = Vec::new();
                while buffer.position() < rdata_end {
                    let window = buffer.take_u8()?;
                    let len = usize::from(buffer.take_u8()?);
                    let bitmap = buffer.take_octets(len)?;
                    windows.push((window, bitmap));
                }
                Ok(RecordTypeWithData::NSEC {
                    next_domain,
                    types: NsecTypeBitmap::from_windows(&windows),
                })
            }
            RecordType::Unknown(tag) => {
                if rdata_end < buffer.position() {
                    return Err(Error::Malformed);
                }
                let len = rdata_end - buffer.position();
                Ok(RecordTypeWithData::Unknown {
                    tag,
                    octets: buffer.take_octets(len)?,
                })
            }
        }
    }
}

impl DomainName {
    pub fn deserialise(buffer: &mut ConsumableBuffer<'_>) -> Result<Self, Error> {
        let mut labels = Vec::new();
        let mut octets = Vec::new();
        let mut cursor = buffer.clone();
        let mut hops = 0;
        // a pointer must always point strictly before the name that
        // contains it, so every hop's target is bounded below this.
        let mut lowest_pointer_seen = buffer.position();
        let mut final_position = None;

        loop {
            hops += 1;
            if hops > MAX_NAME_HOPS {
                return Err(Error::NameLoop);
            }

            let len = cursor.take_u8()?;

            if len == 0 {
                labels.push(Vec::new());
                octets.push(0);
                if final_position.is_none() {
                    final_position = Some(cursor.position());
                }
                break;
            } else if len & 0b1100_0000 == 0b1100_0000 {
                let lo = cursor.take_u8()?;
                let pointer = (usize::from(len & 0b0011_1111) << 8) | usize::from(lo);

                if final_position.is_none() {
                    final_position = Some(cursor.position());
                }

                if pointer >= lowest_pointer_seen || pointer >= cursor.octets.len() {
                    return Err(Error::ForwardPointer);
                }
                lowest_pointer_seen = pointer;

                cursor = cursor.seek(pointer);
            } else if len & 0b1100_0000 != 0 {
                return Err(Error::Malformed);
            } else {
                let label_octets = cursor.take_octets(usize::from(len))?;
                let mut label = Vec::with_capacity(label_octets.len());
                for b in label_octets {
                    label.push(b.to_ascii_lowercase());
                }

                octets.push(len);
                octets.extend_from_slice(&label);
                labels.push(label);

                if octets.len() > 255 {
                    return Err(Error::NameTooLong);
                }
            }
        }

        buffer.position = final_position.expect("loop only exits after setting this");

        Ok(DomainName { octets, labels })
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::test_util::*;
    use super::*;

    #[test]
    fn simple_name_roundtrips() {
        let name = domain("host.local.");
        let mut w = crate::protocol::serialise::WritableBuffer::new();
        w.write_domain_name(&name);
        let octets = w.into_octets();
        let mut buf = ConsumableBuffer::new(&octets);
        let decoded = DomainName::deserialise(&mut buf).unwrap();
        assert_eq!(decoded, name);
    }

    #[test]
    fn compressed_name_decodes_to_same_value() {
        let a = domain("printer._ipp._tcp.local.");
        let b = domain("_ipp._tcp.local.");

        let mut w = crate::protocol::serialise::WritableBuffer::new();
        w.write_domain_name(&a);
        w.write_domain_name(&b);
        let octets = w.into_octets();

        let mut buf = ConsumableBuffer::new(&octets);
        let decoded_a = DomainName::deserialise(&mut buf).unwrap();
        let decoded_b = DomainName::deserialise(&mut buf).unwrap();

        assert_eq!(decoded_a, a);
        assert_eq!(decoded_b, b);
    }

    #[test]
    fn self_pointing_name_is_rejected() {
        // a pointer at offset 0 pointing at offset 0
        let octets = vec![0b1100_0000, 0b0000_0000];
        let mut buf = ConsumableBuffer::new(&octets);
        assert_eq!(DomainName::deserialise(&mut buf), Err(Error::ForwardPointer));
    }

    #[test]
    fn forward_pointer_is_rejected() {
        // two labels, where the first points forward to the second
        let mut octets = vec![0b1100_0000, 0b0000_0010, 0, 0];
        octets[3] = 0;
        let mut buf = ConsumableBuffer::new(&octets);
        assert_eq!(DomainName::deserialise(&mut buf), Err(Error::ForwardPointer));
    }

    #[test]
    fn name_decode_lowercases_labels() {
        let octets = [4, b'H', b'O', b'S', b'T', 5, b'L', b'o', b'c', b'a', b'l', 0];
        let mut buf = ConsumableBuffer::new(&octets);
        let decoded = DomainName::deserialise(&mut buf).unwrap();
        assert_eq!(decoded, domain("host.local."));
    }

    #[test]
    fn message_with_no_records_roundtrips() {
        let message = Message::response(7);
        let octets = message.serialise();
        let mut buf = ConsumableBuffer::new(&octets);
        let decoded = Message::deserialise(&mut buf).unwrap();
        assert_eq!(decoded.header.id, 7);
        assert!(decoded.answers.is_empty());
    }

    #[test]
    fn srv_record_roundtrips() {
        let mut message = Message::response(1);
        message
            .answers
            .push(srv_record("printer._ipp._tcp.local.", 0, 0, 631, "host.local.", 120));

        let octets = message.serialise();
        let mut buf = ConsumableBuffer::new(&octets);
        let decoded = Message::deserialise(&mut buf).unwrap();

        assert_eq!(decoded.answers[0].rtype_with_data, message.answers[0].rtype_with_data);
    }

    #[test]
    fn nsec_record_roundtrips() {
        let mut message = Message::response(1);
        message
            .answers
            .push(nsec_record("host.local.", &[RecordType::A], 120));

        let octets = message.serialise();
        let mut buf = ConsumableBuffer::new(&octets);
        let decoded = Message::deserialise(&mut buf).unwrap();

        assert_eq!(decoded.answers[0].rtype_with_data, message.answers[0].rtype_with_data);
    }
}
