//! Samplers for secret-share distributions and smudging noise.

use rand::{CryptoRng, Rng, RngCore};
use std::f64::consts::PI;

/// Sample a vector with coefficients drawn uniformly from {-1, 0, 1}.
pub(crate) fn sample_ternary_vec<R: RngCore + CryptoRng>(size: usize, rng: &mut R) -> Vec<i64> {
    (0..size).map(|_| rng.random_range(-1i64..=1)).collect()
}

/// Sample a ternary vector with exactly `weight` non-zero coefficients.
pub(crate) fn sample_sparse_ternary_vec<R: RngCore + CryptoRng>(
    size: usize,
    weight: usize,
    rng: &mut R,
) -> Vec<i64> {
    let mut coefficients = vec![0i64; size];
    let weight = weight.min(size);
    let mut placed = 0;
    while placed < weight {
        let position = rng.random_range(0..size);
        if coefficients[position] == 0 {
            coefficients[position] = if rng.random_bool(0.5) { 1 } else { -1 };
            placed += 1;
        }
    }
    coefficients
}

/// Sample a vector from a centered normal of the given standard deviation,
/// rounded to integers.
///
/// The deviation may be far larger than what centered-binomial samplers
/// support; this is the noise-flooding sampler used by partial decryption.
/// Deviations up to ~2^40 stay well within both the f64 mantissa and i64.
pub(crate) fn sample_flood_vec<R: RngCore + CryptoRng>(
    size: usize,
    deviation: u64,
    rng: &mut R,
) -> Vec<i64> {
    let deviation = deviation as f64;
    (0..size)
        .map(|_| {
            let u1: f64 = rng.random_range(f64::EPSILON..1.0);
            let u2: f64 = rng.random_range(0.0..1.0);
            let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
            (z * deviation).round() as i64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{sample_flood_vec, sample_sparse_ternary_vec, sample_ternary_vec};
    use rand::rng;

    #[test]
    fn ternary_support() {
        let mut rng = rng();
        let v = sample_ternary_vec(4096, &mut rng);
        assert_eq!(v.len(), 4096);
        assert!(v.iter().all(|c| (-1..=1).contains(c)));
        // All three values should show up in a vector this long.
        for value in [-1i64, 0, 1] {
            assert!(v.contains(&value));
        }
    }

    #[test]
    fn sparse_ternary_weight() {
        let mut rng = rng();
        for weight in [0, 1, 64, 128] {
            let v = sample_sparse_ternary_vec(1024, weight, &mut rng);
            assert_eq!(v.iter().filter(|c| **c != 0).count(), weight);
            assert!(v.iter().all(|c| (-1..=1).contains(c)));
        }
    }

    #[test]
    fn flood_moments() {
        let mut rng = rng();
        let deviation = 1u64 << 20;
        let v = sample_flood_vec(65536, deviation, &mut rng);
        let mean = v.iter().map(|c| *c as f64).sum::<f64>() / v.len() as f64;
        let var = v.iter().map(|c| (*c as f64 - mean).powi(2)).sum::<f64>() / v.len() as f64;
        let measured = var.sqrt();
        assert!(mean.abs() < deviation as f64 / 10.0);
        assert!(measured > deviation as f64 * 0.95 && measured < deviation as f64 * 1.05);
    }
}
