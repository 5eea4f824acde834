// BLS benchmarks for Tally.
//
// Covers key generation, hash-to-curve, single signing and verification,
// and aggregate verification at the batch sizes `post()` sees in practice.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tally_protocol::config::BLS_DOMAIN;
use tally_protocol::crypto::{hash_to_point, verify_multiple, verify_single, SecretKey, Signature};
use tally_protocol::wire::encode_receipt;

fn bench_keygen(c: &mut Criterion) {
    c.bench_function("bls/keygen", |b| {
        b.iter(|| SecretKey::generate().public_key());
    });
}

fn bench_hash_to_point(c: &mut Criterion) {
    let message = encode_receipt(1, 2, 50, 3_600, 1);
    c.bench_function("bls/hash_to_point", |b| {
        b.iter(|| hash_to_point(BLS_DOMAIN, &message).unwrap());
    });
}

fn bench_sign(c: &mut Criterion) {
    let sk = SecretKey::from_seed(b"bench");
    let message = encode_receipt(1, 2, 50, 3_600, 1);
    c.bench_function("bls/sign", |b| {
        b.iter(|| sk.sign(BLS_DOMAIN, &message).unwrap());
    });
}

fn bench_verify_single(c: &mut Criterion) {
    let sk = SecretKey::from_seed(b"bench");
    let pk = sk.public_key();
    let point = hash_to_point(BLS_DOMAIN, b"withdraw 100").unwrap();
    let sig = sk.sign_point(&point);

    c.bench_function("bls/verify_single", |b| {
        b.iter(|| verify_single(&sig, &pk, &point).unwrap());
    });
}

fn bench_verify_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("bls/verify_aggregate");

    for size in [1usize, 10, 50, 100] {
        let mut keys = Vec::with_capacity(size);
        let mut points = Vec::with_capacity(size);
        let mut sigs = Vec::with_capacity(size);
        for i in 0..size {
            let sk = SecretKey::from_seed(format!("payee-{i}").as_bytes());
            let point =
                hash_to_point(BLS_DOMAIN, &encode_receipt(1, i as u64 + 2, 50, 3_600, 1)).unwrap();
            sigs.push(sk.sign_point(&point));
            keys.push(sk.public_key());
            points.push(point);
        }
        let aggregate = Signature::aggregate(&sigs);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| verify_multiple(&aggregate, &keys, &points).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_keygen,
    bench_hash_to_point,
    bench_sign,
    bench_verify_single,
    bench_verify_aggregate,
);
criterion_main!(benches);
