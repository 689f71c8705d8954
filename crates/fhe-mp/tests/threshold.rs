//! Multi-party walkthroughs: joint key generation, rotation, and
//! relinearization under the joint secret, all decrypted by threshold
//! fusion.

use fhe_mp::bfv::{
    Encoding, Multiplicator, Plaintext, RlweParameters, RlweParametersBuilder, SecretDistribution,
    SecretKey,
};
use fhe_mp::mp::{
    add_eval_keys, add_eval_mult_keys, aggregate_keygen, extend_keygen, follower_partial, fuse,
    lead_partial, linear_key_share, linear_key_share_from, mult_eval_key, CommonRandomPoly,
    RotationKeyMap,
};
use fhe_traits::{FheDecoder, FheEncoder, FheEncrypter};
use rand::{rng, Rng};
use std::error::Error;
use std::sync::Arc;

const BATCH: usize = 128;

fn test_parameters() -> Arc<RlweParameters> {
    RlweParametersBuilder::new()
        .set_degree(1024)
        .set_plaintext_modulus(65537)
        .set_moduli_sizes(&[55, 55])
        .set_batch_size(BATCH)
        .set_secret_distribution(SecretDistribution::Ternary)
        .set_smudging_deviation(1 << 30)
        .build_arc()
        .unwrap()
}

#[test]
fn two_party_keygen_encrypt_threshold_decrypt() -> Result<(), Box<dyn Error>> {
    let par = test_parameters();
    let mut rng = rng();

    let s1 = SecretKey::random(&par, &mut rng)?;
    let s2 = SecretKey::random(&par, &mut rng)?;
    let kp = aggregate_keygen(&par, &[s1.clone(), s2.clone()], &mut rng)?;

    let mut v = vec![0u64; BATCH];
    v[..3].copy_from_slice(&[1, 2, 3]);
    let pt = Plaintext::try_encode(&v, Encoding::Simd, &par)?;
    let ct = kp.public.try_encrypt(&pt, &mut rng)?;

    let partials = vec![
        lead_partial(&ct, &s1, &mut rng)?,
        follower_partial(&ct, &s2, &mut rng)?,
    ];
    let decrypted = fuse(partials)?;
    assert_eq!(Vec::<u64>::try_decode(&decrypted, Encoding::Simd)?, v);
    Ok(())
}

#[test]
fn three_party_chained_extend() -> Result<(), Box<dyn Error>> {
    let par = test_parameters();
    let mut rng = rng();

    // Party 1 seeds the chain from an arbitrary a; parties 2 and 3 fold
    // their contributions into the running key.
    let crp = CommonRandomPoly::new(&par, &mut rng)?;
    let kp1 = extend_keygen(&crp.to_public_seed(), true, &mut rng)?;
    let kp2 = extend_keygen(&kp1.public, false, &mut rng)?;
    let kp3 = extend_keygen(&kp2.public, false, &mut rng)?;

    let v = vec![7u64; BATCH];
    let pt = Plaintext::try_encode(&v, Encoding::Simd, &par)?;
    let ct = kp3.public.try_encrypt(&pt, &mut rng)?;

    let partials = vec![
        lead_partial(&ct, &kp1.secret, &mut rng)?,
        follower_partial(&ct, &kp2.secret, &mut rng)?,
        follower_partial(&ct, &kp3.secret, &mut rng)?,
    ];
    let decrypted = fuse(partials)?;
    assert_eq!(Vec::<u64>::try_decode(&decrypted, Encoding::Simd)?, v);
    Ok(())
}

#[test]
fn two_party_rotation() -> Result<(), Box<dyn Error>> {
    let par = test_parameters();
    let mut rng = rng();

    let s1 = SecretKey::random(&par, &mut rng)?;
    let s2 = SecretKey::random(&par, &mut rng)?;
    let kp = aggregate_keygen(&par, &[s1.clone(), s2.clone()], &mut rng)?;

    let v: Vec<u64> = (0..BATCH as u64).collect();
    let pt = Plaintext::try_encode(&v, Encoding::Simd, &par)?;
    let ct = kp.public.try_encrypt(&pt, &mut rng)?;

    let shifts = [1i64, -1, 8];
    let m1 = RotationKeyMap::generate_for_shifts(&s1, &shifts, &mut rng)?;
    let m2 = m1.extend_for_shifts(&s2, &shifts, &mut rng)?;
    let map = m1.add(&m2)?;

    // Slot j of the result holds slot j - 1 of the input.
    let rotated = map.rotate_by(&ct, 1)?;
    let partials = vec![
        lead_partial(&rotated, &s1, &mut rng)?,
        follower_partial(&rotated, &s2, &mut rng)?,
    ];
    let out = Vec::<u64>::try_decode(&fuse(partials)?, Encoding::Simd)?;

    let mut expected = vec![127u64];
    expected.extend(0..127);
    assert_eq!(out, expected);

    // And the opposite direction.
    let rotated = map.rotate_by(&ct, -1)?;
    let partials = vec![
        lead_partial(&rotated, &s1, &mut rng)?,
        follower_partial(&rotated, &s2, &mut rng)?,
    ];
    let out = Vec::<u64>::try_decode(&fuse(partials)?, Encoding::Simd)?;

    let mut expected: Vec<u64> = (1..128).collect();
    expected.push(0);
    assert_eq!(out, expected);
    Ok(())
}

#[test]
fn two_party_inner_sum() -> Result<(), Box<dyn Error>> {
    let par = test_parameters();
    let mut rng = rng();

    let s1 = SecretKey::random(&par, &mut rng)?;
    let s2 = SecretKey::random(&par, &mut rng)?;
    let kp = aggregate_keygen(&par, &[s1.clone(), s2.clone()], &mut rng)?;

    let v: Vec<u64> = (0..BATCH as u64).collect();
    let expected = v.iter().sum::<u64>() % 65537;
    let pt = Plaintext::try_encode(&v, Encoding::Simd, &par)?;
    let ct = kp.public.try_encrypt(&pt, &mut rng)?;

    let m1 = RotationKeyMap::generate_for_sum(&s1, &mut rng)?;
    let m2 = m1.extend_for_sum(&s2, &mut rng)?;
    let map = m1.add(&m2)?;
    assert_eq!(map.len(), BATCH.ilog2() as usize);

    let summed = map.inner_sum(&ct)?;
    let partials = vec![
        lead_partial(&summed, &s1, &mut rng)?,
        follower_partial(&summed, &s2, &mut rng)?,
    ];
    let out = Vec::<u64>::try_decode(&fuse(partials)?, Encoding::Simd)?;
    assert!(out.iter().all(|slot| *slot == expected));
    Ok(())
}

#[test]
fn two_party_relinearized_multiplication() -> Result<(), Box<dyn Error>> {
    let par = test_parameters();
    let mut rng = rng();

    let s1 = SecretKey::random(&par, &mut rng)?;
    let s2 = SecretKey::random(&par, &mut rng)?;
    let kp = aggregate_keygen(&par, &[s1.clone(), s2.clone()], &mut rng)?;

    // Round 1: a common linear evaluation key for the joint secret.
    let ek1 = linear_key_share(&s1, &mut rng)?;
    let ek2 = linear_key_share_from(&s2, &ek1, &mut rng)?;
    let ek = add_eval_keys(&ek1, &ek2)?;

    // Round 2: each party rerandomizes it by its share; the sum is the
    // relinearization key for the joint secret.
    let rk1 = mult_eval_key(&s1, &ek, &mut rng)?;
    let rk2 = mult_eval_key(&s2, &ek, &mut rng)?;
    let rk = add_eval_mult_keys(&rk1, &rk2)?;

    let v1: Vec<u64> = (0..BATCH).map(|_| rng.random_range(0..65537)).collect();
    let v2: Vec<u64> = (0..BATCH).map(|_| rng.random_range(0..65537)).collect();
    let expected: Vec<u64> = v1
        .iter()
        .zip(v2.iter())
        .map(|(a, b)| a * b % 65537)
        .collect();

    let ct1 = kp.public.try_encrypt(&Plaintext::try_encode(&v1, Encoding::Simd, &par)?, &mut rng)?;
    let ct2 = kp.public.try_encrypt(&Plaintext::try_encode(&v2, Encoding::Simd, &par)?, &mut rng)?;

    let mut multiplicator = Multiplicator::new(&par);
    multiplicator.enable_relinearization(rk)?;
    let product = multiplicator.multiply(&ct1, &ct2)?;
    assert_eq!(product.len(), 2);

    let partials = vec![
        lead_partial(&product, &s1, &mut rng)?,
        follower_partial(&product, &s2, &mut rng)?,
    ];
    let out = Vec::<u64>::try_decode(&fuse(partials)?, Encoding::Simd)?;
    assert_eq!(out, expected);
    Ok(())
}

#[test]
fn asymmetric_maps_intersect() -> Result<(), Box<dyn Error>> {
    let par = test_parameters();
    let mut rng = rng();

    let s1 = SecretKey::random(&par, &mut rng)?;
    let s2 = SecretKey::random(&par, &mut rng)?;

    let m1 = RotationKeyMap::generate(&s1, &[1, 3, 5, 7], &mut rng)?;
    let m2 = RotationKeyMap::generate(&s2, &[3, 5, 9], &mut rng)?;
    let sum = m1.add(&m2)?;
    assert_eq!(sum.indices().collect::<Vec<_>>(), vec![3, 5]);
    Ok(())
}

#[test]
fn smudged_partials_pass_uniformity() -> Result<(), Box<dyn Error>> {
    use rand::SeedableRng;
    let par = test_parameters();
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(11);

    let share = SecretKey::random(&par, &mut rng)?;
    let kp = aggregate_keygen(&par, std::slice::from_ref(&share), &mut rng)?;
    let pt = Plaintext::try_encode(&[1u64, 2, 3], Encoding::Simd, &par)?;
    let ct = kp.public.try_encrypt(&pt, &mut rng)?;

    const RUNS: usize = 10_000;
    const BUCKETS: usize = 64;
    let mut lead_histogram = [0usize; BUCKETS];
    let mut follower_histogram = [0usize; BUCKETS];
    for _ in 0..RUNS {
        let lead = lead_partial(&ct, &share, &mut rng)?;
        let follower = follower_partial(&ct, &share, &mut rng)?;
        // Bucket by low-order residue classes of the first coefficient.
        let c1 = lead.b().coefficients()[(0, 0)];
        let c2 = follower.b().coefficients()[(0, 0)];
        lead_histogram[(c1 % BUCKETS as u64) as usize] += 1;
        follower_histogram[(c2 % BUCKETS as u64) as usize] += 1;
    }

    let expected = RUNS as f64 / BUCKETS as f64;
    for histogram in [lead_histogram, follower_histogram] {
        let chi2: f64 = histogram
            .iter()
            .map(|observed| {
                let delta = *observed as f64 - expected;
                delta * delta / expected
            })
            .sum();
        // 63 degrees of freedom.
        assert!(chi2 < 120.0, "χ² = {chi2}");
    }
    Ok(())
}
