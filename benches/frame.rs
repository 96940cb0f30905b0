use std::{convert::TryFrom, io::Cursor};

use bytes::{Buf, Bytes, BytesMut};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use pprof::criterion::{Output, PProfProfiler};
use rand::{distributions::Alphanumeric, prelude::*};
use redlist::{
    net::{cmd::ListCommand, Frame},
    CommandName,
};

const ITER: usize = 10000;

const MAX_VALUES: usize = 8;
const VALUE_SIZE: usize = 64;

fn rand_bulk(rng: &mut StdRng) -> Frame {
    let len = rng.gen_range(1..VALUE_SIZE);
    Frame::BulkString(rng.sample_iter(Alphanumeric).take(len).collect())
}

/// A random push request, as a client would send it
fn rand_request(rng: &mut StdRng) -> Frame {
    let command = [CommandName::LPush, CommandName::RPush, CommandName::LPushX]
        .choose(rng)
        .copied()
        .unwrap_or(CommandName::RPush);
    let mut items = vec![Frame::BulkString(Bytes::from_static(command.as_str().as_bytes()))];
    items.push(rand_bulk(rng));
    for _ in 0..rng.gen_range(1..=MAX_VALUES) {
        items.push(rand_bulk(rng));
    }
    Frame::Array(items)
}

fn encoded_requests() -> Bytes {
    let mut rng = StdRng::from_seed([0u8; 32]);
    let mut buf = BytesMut::new();
    for _ in 0..ITER {
        rand_request(&mut rng).encode(&mut buf);
    }
    buf.freeze()
}

pub fn bench_parse(c: &mut Criterion) {
    let encoded = encoded_requests();

    let mut g = c.benchmark_group("parse_requests");
    g.throughput(Throughput::Bytes(encoded.len() as u64));

    g.bench_with_input("frame", &encoded, |b, s| {
        b.iter_batched(
            || s.clone(),
            |mut s| {
                while s.has_remaining() {
                    let mut buf = Cursor::new(&s[..]);
                    Frame::check(&mut buf).unwrap();
                    let len = buf.position() as usize;
                    buf.set_position(0);
                    Frame::parse(&mut buf).unwrap();
                    s.advance(len);
                }
            },
            BatchSize::SmallInput,
        );
    });

    g.bench_with_input("command", &encoded, |b, s| {
        b.iter_batched(
            || s.clone(),
            |mut s| {
                while s.has_remaining() {
                    let mut buf = Cursor::new(&s[..]);
                    let frame = Frame::parse(&mut buf).unwrap();
                    let len = buf.position() as usize;
                    ListCommand::try_from(frame).unwrap();
                    s.advance(len);
                }
            },
            BatchSize::SmallInput,
        );
    });
    g.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(500, Output::Flamegraph(None)));
    targets = bench_parse
);
criterion_main!(benches);
