use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::net::Ipv4Addr;

use dns_types::protocol::deserialise::ConsumableBuffer;
use dns_types::protocol::types::*;

#[allow(non_snake_case)]
fn bench__question(c: &mut Criterion) {
    let mut message = Message::response(1234);
    message.header.is_response = false;
    message.questions.push(Question {
        name: domain("www.example.com."),
        qtype: QueryType::Record(RecordType::A),
        qclass: QueryClass::Record(RecordClass::IN),
        unicast_response: false,
    });

    c.bench_function("serialise/question", |b| {
        b.iter_batched(
            || message.clone(),
            |message| message.serialise(),
            BatchSize::SmallInput,
        )
    });

    let serialised = message.serialise();
    c.bench_function("deserialise/question", |b| {
        b.iter(|| Message::deserialise(&mut ConsumableBuffer::new(black_box(&serialised))))
    });
}

#[allow(non_snake_case)]
fn bench__answer__small(c: &mut Criterion) {
    let mut message = Message::response(1234);
    message
        .answers
        .push(a_record("www.example.com.", Ipv4Addr::new(1, 1, 1, 1), 300));

    c.bench_function("serialise/answer/small", |b| {
        b.iter_batched(
            || message.clone(),
            |message| message.serialise(),
            BatchSize::SmallInput,
        )
    });

    let serialised = message.serialise();
    c.bench_function("deserialise/answer/small", |b| {
        b.iter(|| Message::deserialise(&mut ConsumableBuffer::new(black_box(&serialised))))
    });
}

#[allow(non_snake_case)]
fn bench__answer__big(c: &mut Criterion) {
    let mut message = Message::response(1234);

    let count = 128;

    for i in 0..count {
        message.answers.push(ptr_record(
            "_http._tcp.local.",
            &format!("instance-{i:?}._http._tcp.local."),
            300,
        ));
    }
    for i in 0..count {
        message.authority.push(srv_record(
            &format!("instance-{i:?}._http._tcp.local."),
            0,
            0,
            8080,
            &format!("host-{i:?}.local."),
            300,
        ));
    }
    for i in 0..count {
        message.additional.push(a_record(
            &format!("host-{i:?}.local."),
            Ipv4Addr::new(1, 1, 1, 1),
            300,
        ));
    }

    c.bench_function("serialise/answer/big", |b| {
        b.iter_batched(
            || message.clone(),
            |message| message.serialise(),
            BatchSize::SmallInput,
        )
    });

    let serialised = message.serialise();
    c.bench_function("deserialise/answer/big", |b| {
        b.iter(|| Message::deserialise(&mut ConsumableBuffer::new(black_box(&serialised))))
    });
}

// TODO: reduce duplication with protocol::types::test_util
fn domain(name: &str) -> DomainName {
    DomainName::from_dotted_string(name).unwrap()
}

fn a_record(name: &str, address: Ipv4Addr, ttl: u32) -> ResourceRecord {
    ResourceRecord {
        name: domain(name),
        rtype_with_data: RecordTypeWithData::A { address },
        rclass: RecordClass::IN,
        cache_flush: true,
        ttl,
    }
}

fn ptr_record(name: &str, target: &str, ttl: u32) -> ResourceRecord {
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

fn srv_record(
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

criterion_group!(
    benches,
    bench__question,
    bench__answer__small,
    bench__answer__big,
);
criterion_main!(benches);
