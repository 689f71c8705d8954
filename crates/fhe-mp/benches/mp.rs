use criterion::{criterion_group, criterion_main, Criterion};
use fhe_mp::bfv::{
    Encoding, Plaintext, RlweParameters, RlweParametersBuilder, SecretDistribution, SecretKey,
};
use fhe_mp::mp::{aggregate_keygen, follower_partial, fuse, lead_partial, RotationKeyMap};
use fhe_traits::{FheEncoder, FheEncrypter};
use rand::rng;
use std::sync::Arc;

fn parameters() -> Arc<RlweParameters> {
    RlweParametersBuilder::new()
        .set_degree(2048)
        .set_plaintext_modulus(65537)
        .set_moduli_sizes(&[55, 55, 55])
        .set_batch_size(128)
        .set_secret_distribution(SecretDistribution::Ternary)
        .build_arc()
        .unwrap()
}

fn mp_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("mp");
    group.sample_size(10);

    let par = parameters();
    let mut rng = rng();

    let shares: Vec<SecretKey> = (0..4)
        .map(|_| SecretKey::random(&par, &mut rng).unwrap())
        .collect();

    group.bench_function("aggregate_keygen/n=4", |b| {
        b.iter(|| aggregate_keygen(&par, &shares, &mut rng).unwrap());
    });

    let indices: Vec<usize> = (0..8).map(|i| 2 * i + 1).collect();
    group.bench_function("rotation_keys/n=8", |b| {
        b.iter(|| RotationKeyMap::generate(&shares[0], &indices, &mut rng).unwrap());
    });

    let kp = aggregate_keygen(&par, &shares, &mut rng).unwrap();
    let pt = Plaintext::try_encode(&[1u64, 2, 3], Encoding::Simd, &par).unwrap();
    let ct = kp.public.try_encrypt(&pt, &mut rng).unwrap();

    group.bench_function("lead_partial", |b| {
        b.iter(|| lead_partial(&ct, &shares[0], &mut rng).unwrap());
    });

    group.bench_function("follower_partial", |b| {
        b.iter(|| follower_partial(&ct, &shares[1], &mut rng).unwrap());
    });

    let partials: Vec<_> = std::iter::once(lead_partial(&ct, &shares[0], &mut rng).unwrap())
        .chain(
            shares[1..]
                .iter()
                .map(|share| follower_partial(&ct, share, &mut rng).unwrap()),
        )
        .collect();

    group.bench_function("fuse/n=4", |b| {
        b.iter(|| fuse(partials.clone()).unwrap());
    });

    group.finish();
}

criterion_group!(mp, mp_benchmarks);
criterion_main!(mp);
