//! Protocol encoding/decoding benchmarks.

use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use socketmap_protocol::frame::Frame;
use socketmap_protocol::{Decoder, Encoder, Reply, Request, MAX_FRAME_SIZE};

fn bench_frame_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");

    for size in [16, 256, 4096, 60000] {
        let frame = Frame::new(Bytes::from("x".repeat(size)));

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| black_box(frame.encode().unwrap()));
        });
    }

    group.finish();
}

fn bench_frame_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");

    for size in [16, 256, 4096, 60000] {
        let encoded = Frame::new(Bytes::from("x".repeat(size))).encode().unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| {
                let mut buf = encoded.clone();
                black_box(Frame::decode(&mut buf, MAX_FRAME_SIZE).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_frame_decode_byte_at_a_time(c: &mut Criterion) {
    let encoded = Frame::new(Bytes::from("aliases bob@example.com"))
        .encode()
        .unwrap();

    c.bench_function("frame_decode_byte_at_a_time", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(encoded.len());
            for byte in encoded.iter() {
                buf.extend_from_slice(&[*byte]);
                if let Some(frame) = Frame::decode(&mut buf, MAX_FRAME_SIZE).unwrap() {
                    return black_box(frame);
                }
            }
            unreachable!("frame never completed")
        });
    });
}

fn bench_request_roundtrip(c: &mut Criterion) {
    let request = Request::new("virtual", "postmaster@example.com");

    c.bench_function("request_encode", |b| {
        b.iter(|| black_box(Encoder::encode_request(&request).unwrap()));
    });

    let encoded = Encoder::encode_request(&request).unwrap();
    c.bench_function("request_decode", |b| {
        b.iter(|| {
            let mut decoder = Decoder::new();
            decoder.extend(&encoded);
            let frame = decoder.decode_frame().unwrap().unwrap();
            black_box(Request::parse(&frame.payload).unwrap())
        });
    });
}

fn bench_reply_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("reply_decode");

    for size in [16, 1024, 32768] {
        let reply = Reply::ok("v".repeat(size));
        let encoded = Encoder::encode_reply(&reply).unwrap();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| {
                let mut decoder = Decoder::new();
                decoder.extend(encoded);
                black_box(decoder.decode_reply().unwrap())
            });
        });
    }

    group.finish();

    let reply = Reply::not_found();
    c.bench_function("reply_encode_notfound", |b| {
        b.iter(|| black_box(Encoder::encode_reply(&reply).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_frame_encode,
    bench_frame_decode,
    bench_frame_decode_byte_at_a_time,
    bench_request_roundtrip,
    bench_reply_roundtrip,
);

criterion_main!(benches);
