//! Varint and changeset codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use objsync_bench::{deep_path_changeset, random_changeset, random_varints};
use objsync_codec::{decode_int, encode_int};
use objsync_protocol::{
    encode_changeset, parse_changeset, parse_changeset_stream, Changeset, ChangesetEncoder,
    ChunkedInputStream, ParserConfig,
};
use objsync_testkit::every_instruction_changeset;

/// Benchmark varint encoding and decoding.
fn bench_varint(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint");
    let values = random_varints(1000);
    group.throughput(Throughput::Elements(values.len() as u64));

    group.bench_function("encode", |b| {
        let mut buf = Vec::with_capacity(values.len() * 10);
        b.iter(|| {
            buf.clear();
            for &v in &values {
                encode_int(&mut buf, black_box(v));
            }
            black_box(buf.len());
        });
    });

    group.bench_function("decode", |b| {
        let mut buf = Vec::new();
        for &v in &values {
            encode_int(&mut buf, v);
        }
        b.iter(|| {
            let mut source = black_box(buf.as_slice());
            while !source.is_empty() {
                black_box(decode_int::<i64, _>(&mut source).unwrap());
            }
        });
    });

    group.finish();
}

/// Benchmark changeset encoding with varying object counts.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    group.bench_function("every_instruction", |b| {
        let cs = every_instruction_changeset();
        b.iter(|| black_box(encode_changeset(black_box(&cs)).unwrap()));
    });

    for objects in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*objects as u64 * 4));
        group.bench_with_input(BenchmarkId::new("objects", objects), objects, |b, &n| {
            let cs = random_changeset(n, 16);
            b.iter(|| black_box(encode_changeset(black_box(&cs)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark parsing of whole buffers.
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for objects in [10, 100, 1000].iter() {
        let bytes = encode_changeset(&random_changeset(*objects, 16)).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("objects", objects), &bytes, |b, bytes| {
            b.iter(|| black_box(parse_changeset(black_box(bytes)).unwrap()));
        });
    }

    let bytes = encode_changeset(&deep_path_changeset(200, 8, 32)).unwrap();
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("deep_paths", |b| {
        b.iter(|| black_box(parse_changeset(black_box(&bytes)).unwrap()));
    });

    group.finish();
}

/// Benchmark streaming parse as block size shrinks.
fn bench_stream_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_parse");
    let bytes = encode_changeset(&random_changeset(500, 32)).unwrap();
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    for block_size in [16, 256, 4096].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            block_size,
            |b, &block_size| {
                let config = ParserConfig::default();
                b.iter(|| {
                    let mut input = ChunkedInputStream::split(&bytes, block_size);
                    let mut out = Changeset::new();
                    parse_changeset_stream(&mut input, &config, &mut out).unwrap();
                    black_box(out);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark encoder reuse across changesets.
fn bench_encoder_reuse(c: &mut Criterion) {
    c.bench_function("encoder_reuse_100", |b| {
        let changesets: Vec<_> = (0..100).map(|_| random_changeset(4, 8)).collect();

        b.iter(|| {
            let mut encoder = ChangesetEncoder::new();
            for cs in &changesets {
                encoder.encode(black_box(cs)).unwrap();
            }
            black_box(encoder.into_bytes());
        });
    });
}

criterion_group!(
    benches,
    bench_varint,
    bench_encode,
    bench_parse,
    bench_stream_parse,
    bench_encoder_reuse,
);

criterion_main!(benches);
