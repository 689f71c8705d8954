//! Parameters for the threshold RLWE encryption scheme.

use crate::proto;
use crate::{Error, ParametersError, Result};
use fhe_math::{
    ntt::NttOperator,
    rns::{RnsContext, ScalingFactor},
    rq::{scaler::Scaler, traits::TryConvertFrom, Context, Poly, Representation},
    zq::{primes::generate_prime, Modulus},
};
use fhe_traits::{Deserialize, FheParameters, Serialize};
use itertools::Itertools;
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use prost::Message;
use std::fmt::Debug;
use std::sync::Arc;

/// Distribution the local secret shares are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretDistribution {
    /// Centered-binomial approximation of a discrete Gaussian, the
    /// conservative RLWE choice.
    Gaussian,
    /// Uniform ternary coefficients in {-1, 0, 1}.
    Ternary,
    /// Ternary coefficients with a fixed Hamming weight of 64.
    SparseTernary,
}

/// Scheme tag selecting how slot shifts map to automorphism indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeId {
    /// Exact arithmetic; plaintext slots form two rows of `N / 2` entries.
    Exact,
    /// Approximate arithmetic; slots are `M / 4` complex conjugate pairs.
    Approximate,
}

/// Parameters for the threshold RLWE encryption scheme.
///
/// This struct consolidates the raw parameters together with the
/// pre-computed values needed for encryption, key switching and
/// scale-and-round decryption, as well as the multiparty-specific knobs:
/// the noise scale `ns`, the smudging deviation used by partial
/// decryption, the batch size and the secret-share distribution.
#[derive(PartialEq, Eq)]
pub struct RlweParameters {
    /// Number of coefficients in a polynomial.
    polynomial_degree: usize,

    /// Modulus of the plaintext.
    plaintext_modulus: u64,

    /// Vector of coprime moduli q_i for the ciphertext.
    pub(crate) moduli: Box<[u64]>,

    /// Vector of the sizes of the coprime moduli q_i for the ciphertext.
    moduli_sizes: Box<[usize]>,

    /// Error variance of the ordinary discrete Gaussian.
    pub(crate) variance: usize,

    /// Noise scale `ns`; every error term is multiplied by it.
    noise_scale: u64,

    /// Standard deviation of the smudging noise for partial decryption.
    smudging_deviation: u64,

    /// Number of packed plaintext slots.
    batch_size: usize,

    /// Distribution of the local secret shares.
    pub(crate) secret_distribution: SecretDistribution,

    /// Scheme tag for the shift-to-automorphism-index rule.
    scheme: SchemeId,

    /// Context of the ciphertext ring.
    pub(crate) ctx: Arc<Context>,

    /// Plaintext modulus as a Modulus type.
    pub(crate) plaintext: Modulus,

    /// NTT operator for SIMD plaintext operations, if possible.
    pub(crate) op: Option<Arc<NttOperator>>,

    /// Scaling polynomial for the plaintext.
    pub(crate) delta: Poly,

    /// Q modulo the plaintext modulus.
    pub(crate) q_mod_t: u64,

    /// Down scaler from the ciphertext ring to the plaintext.
    pub(crate) scaler: Scaler,

    /// Pre-computed contexts and scalers for multiplication.
    pub(crate) mul_params: MultiplicationParameters,

    /// Map from slot positions to polynomial coefficient indices.
    pub(crate) slot_index_map: Box<[usize]>,
}

impl Debug for RlweParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RlweParameters")
            .field("polynomial_degree", &self.polynomial_degree)
            .field("plaintext_modulus", &self.plaintext_modulus)
            .field("moduli", &self.moduli)
            .field("noise_scale", &self.noise_scale)
            .field("batch_size", &self.batch_size)
            .field("secret_distribution", &self.secret_distribution)
            .finish()
    }
}

impl FheParameters for RlweParameters {}

unsafe impl Send for RlweParameters {}

impl RlweParameters {
    /// Returns the underlying polynomial degree `N`.
    pub const fn degree(&self) -> usize {
        self.polynomial_degree
    }

    /// Returns the cyclotomic order `M = 2N`.
    pub const fn cyclotomic_order(&self) -> usize {
        2 * self.polynomial_degree
    }

    /// Returns a reference to the ciphertext moduli.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Returns the sizes, in bits, of the ciphertext moduli.
    pub fn moduli_sizes(&self) -> &[usize] {
        &self.moduli_sizes
    }

    /// Returns the plaintext modulus.
    pub const fn plaintext(&self) -> u64 {
        self.plaintext_modulus
    }

    /// Returns the noise scale `ns`.
    pub const fn noise_scale(&self) -> u64 {
        self.noise_scale
    }

    /// Returns the smudging standard deviation used by partial decryption.
    pub const fn smudging_deviation(&self) -> u64 {
        self.smudging_deviation
    }

    /// Returns the number of packed plaintext slots.
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns the distribution secret shares are drawn from.
    pub const fn secret_distribution(&self) -> SecretDistribution {
        self.secret_distribution
    }

    /// Returns the scheme tag.
    pub const fn scheme(&self) -> SchemeId {
        self.scheme
    }

    /// Returns the context of the ciphertext ring.
    pub fn ctx(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Multiply an error polynomial by the noise scale.
    pub(crate) fn scale_noise(&self, e: Poly) -> Poly {
        if self.noise_scale == 1 {
            e
        } else {
            &BigUint::from(self.noise_scale) * &e
        }
    }

    #[cfg(test)]
    /// Returns default parameters for tests.
    pub fn default_arc(num_moduli: usize, degree: usize) -> Arc<Self> {
        if !degree.is_power_of_two() || degree < 8 {
            panic!("Invalid degree");
        }
        RlweParametersBuilder::new()
            .set_degree(degree)
            .set_plaintext_modulus(1153)
            .set_moduli_sizes(&vec![62usize; num_moduli])
            .build_arc()
            .unwrap()
    }
}

/// Pre-computed contexts and scalers for ciphertext multiplication.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct MultiplicationParameters {
    /// Extender to the multiplication basis.
    pub(crate) extender: Scaler,
    /// Scaler by t/Q back to the ciphertext basis.
    pub(crate) down_scaler: Scaler,
    /// Context of the extended multiplication basis.
    pub(crate) mul_ctx: Arc<Context>,
}

/// Builder for parameters for the threshold RLWE encryption scheme.
#[derive(Debug)]
pub struct RlweParametersBuilder {
    degree: usize,
    plaintext: u64,
    variance: usize,
    noise_scale: u64,
    smudging_deviation: u64,
    batch_size: usize,
    secret_distribution: SecretDistribution,
    scheme: SchemeId,
    ciphertext_moduli: Vec<u64>,
    ciphertext_moduli_sizes: Vec<usize>,
}

impl RlweParametersBuilder {
    /// Creates a new instance of the builder.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            degree: Default::default(),
            plaintext: Default::default(),
            variance: 10,
            noise_scale: 1,
            smudging_deviation: 1 << 30,
            batch_size: 0,
            secret_distribution: SecretDistribution::Ternary,
            scheme: SchemeId::Exact,
            ciphertext_moduli: Default::default(),
            ciphertext_moduli_sizes: Default::default(),
        }
    }

    /// Sets the polynomial degree. Returns an error on build if the degree
    /// is not a power of two larger or equal to 8.
    pub fn set_degree(&mut self, degree: usize) -> &mut Self {
        self.degree = degree;
        self
    }

    /// Sets the plaintext modulus. It must be smaller than every ciphertext
    /// modulus.
    pub fn set_plaintext_modulus(&mut self, plaintext: u64) -> &mut Self {
        self.plaintext = plaintext;
        self
    }

    /// Sets the sizes of the ciphertext moduli.
    /// Only one of `set_moduli_sizes` and `set_moduli` can be specified.
    pub fn set_moduli_sizes(&mut self, sizes: &[usize]) -> &mut Self {
        sizes.clone_into(&mut self.ciphertext_moduli_sizes);
        self
    }

    /// Sets the ciphertext moduli to use.
    /// Only one of `set_moduli_sizes` and `set_moduli` can be specified.
    pub fn set_moduli(&mut self, moduli: &[u64]) -> &mut Self {
        moduli.clone_into(&mut self.ciphertext_moduli);
        self
    }

    /// Sets the error variance. Returns an error on build if the variance is
    /// not between one and sixteen.
    pub fn set_variance(&mut self, variance: usize) -> &mut Self {
        self.variance = variance;
        self
    }

    /// Sets the noise scale `ns`, a small positive integer every error term
    /// is multiplied by. Defaults to 1.
    pub fn set_noise_scale(&mut self, noise_scale: u64) -> &mut Self {
        self.noise_scale = noise_scale;
        self
    }

    /// Sets the standard deviation of the smudging noise added by partial
    /// decryption. Defaults to 2^30.
    pub fn set_smudging_deviation(&mut self, deviation: u64) -> &mut Self {
        self.smudging_deviation = deviation;
        self
    }

    /// Sets the number of packed plaintext slots. Must be a power of two of
    /// at most half the degree. Defaults to half the degree.
    pub fn set_batch_size(&mut self, batch_size: usize) -> &mut Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the distribution the secret shares are drawn from.
    pub fn set_secret_distribution(&mut self, distribution: SecretDistribution) -> &mut Self {
        self.secret_distribution = distribution;
        self
    }

    /// Sets the scheme tag selecting the shift-to-automorphism-index rule.
    pub fn set_scheme(&mut self, scheme: SchemeId) -> &mut Self {
        self.scheme = scheme;
        self
    }

    /// Generate ciphertext moduli with the specified sizes.
    fn generate_moduli(moduli_sizes: &[usize], degree: usize) -> Result<Vec<u64>> {
        let mut moduli = vec![];
        for size in moduli_sizes {
            if *size > 62 || *size < 10 {
                return Err(Error::ParametersError(ParametersError::InvalidModulusSize(
                    *size, 10, 62,
                )));
            }

            let mut upper_bound = 1 << size;
            loop {
                if let Some(prime) = generate_prime(*size, 2 * degree as u64, upper_bound) {
                    if !moduli.contains(&prime) {
                        moduli.push(prime);
                        break;
                    } else {
                        upper_bound = prime;
                    }
                } else {
                    return Err(Error::ParametersError(ParametersError::NotEnoughPrimes(
                        *size, degree,
                    )));
                }
            }
        }

        Ok(moduli)
    }

    /// Build a new `RlweParameters` inside an `Arc`.
    pub fn build_arc(&self) -> Result<Arc<RlweParameters>> {
        self.build().map(Arc::new)
    }

    /// Build a new `RlweParameters`.
    pub fn build(&self) -> Result<RlweParameters> {
        if self.degree < 8 || !self.degree.is_power_of_two() {
            return Err(Error::ParametersError(ParametersError::InvalidDegree(
                self.degree,
            )));
        }

        if self.noise_scale == 0 {
            return Err(Error::ParametersError(ParametersError::InvalidNoiseScale(
                self.noise_scale,
            )));
        }

        let batch_size = if self.batch_size == 0 {
            self.degree >> 1
        } else {
            self.batch_size
        };
        if !batch_size.is_power_of_two() || batch_size > self.degree >> 1 {
            return Err(Error::ParametersError(ParametersError::InvalidBatchSize(
                batch_size,
            )));
        }

        let plaintext_modulus = Modulus::new(self.plaintext).map_err(|e| {
            Error::ParametersError(ParametersError::InvalidPlaintext(e.to_string()))
        })?;

        if !self.ciphertext_moduli.is_empty() && !self.ciphertext_moduli_sizes.is_empty() {
            return Err(Error::ParametersError(ParametersError::TooManySpecified(
                "Only one of `ciphertext_moduli` and `ciphertext_moduli_sizes` can be specified"
                    .to_string(),
            )));
        } else if self.ciphertext_moduli.is_empty() && self.ciphertext_moduli_sizes.is_empty() {
            return Err(Error::ParametersError(ParametersError::TooFewSpecified(
                "One of `ciphertext_moduli` and `ciphertext_moduli_sizes` must be specified"
                    .to_string(),
            )));
        }

        let mut moduli = self.ciphertext_moduli.clone();
        if !self.ciphertext_moduli_sizes.is_empty() {
            moduli = Self::generate_moduli(&self.ciphertext_moduli_sizes, self.degree)?
        }

        if moduli.iter().any(|m| *m <= self.plaintext) {
            return Err(Error::ParametersError(ParametersError::InvalidPlaintext(
                "The plaintext modulus must be smaller than every ciphertext modulus".to_string(),
            )));
        }

        let moduli_sizes = moduli
            .iter()
            .map(|m| 64 - m.leading_zeros() as usize)
            .collect_vec();

        let ctx = Arc::new(Context::new(&moduli, self.degree)?);
        let plaintext_ctx = Arc::new(Context::new(&moduli[..1], self.degree)?);

        let op = NttOperator::new(&plaintext_modulus, self.degree).map(Arc::new);

        // Scaling polynomial delta, lifted from (-t)^(-1) mod each q_i.
        let mut delta_rests = vec![];
        for m in &moduli {
            let q = Modulus::new(*m)?;
            let neg_t = q.neg(self.plaintext);
            let inv = q.inv(neg_t).ok_or_else(|| {
                Error::ParametersError(ParametersError::InvalidPlaintext(
                    "The plaintext modulus is not invertible in the ciphertext ring".to_string(),
                ))
            })?;
            delta_rests.push(inv)
        }
        let rns = RnsContext::new(&moduli)?;
        let mut delta = Poly::try_convert_from(
            &[rns.lift((&delta_rests).into())],
            &ctx,
            true,
            Representation::PowerBasis,
        )?;
        delta.change_representation(Representation::NttShoup);

        let q_mod_t = (rns.modulus() % self.plaintext).to_u64().unwrap();

        let scaler = Scaler::new(
            &ctx,
            &plaintext_ctx,
            ScalingFactor::new(&BigUint::from(self.plaintext), rns.modulus()),
        )?;

        // Extended basis for the tensor product, ~60 bits larger than Q.
        let modulus_size = moduli_sizes.iter().sum::<usize>();
        let n_extra_moduli = (modulus_size + 60).div_ceil(62);
        let mut extended_basis = Vec::with_capacity(moduli.len() + n_extra_moduli);
        extended_basis.append(&mut moduli.clone());
        let mut upper_bound = 1 << 62;
        while extended_basis.len() != moduli.len() + n_extra_moduli {
            upper_bound = generate_prime(62, 2 * self.degree as u64, upper_bound).ok_or(
                Error::ParametersError(ParametersError::NotEnoughPrimes(62, self.degree)),
            )?;
            if !extended_basis.contains(&upper_bound) {
                extended_basis.push(upper_bound)
            }
        }
        let mul_ctx = Arc::new(Context::new(&extended_basis, self.degree)?);
        let mul_params = MultiplicationParameters {
            extender: Scaler::new(&ctx, &mul_ctx, ScalingFactor::one())?,
            down_scaler: Scaler::new(
                &mul_ctx,
                &ctx,
                ScalingFactor::new(&BigUint::from(self.plaintext), ctx.modulus()),
            )?,
            mul_ctx,
        };

        // Slot ordering along the orbit of the generator 5, following the
        // usual power-of-two batching layout.
        let row_size = self.degree >> 1;
        let m = self.degree << 1;
        let gen = 5;
        let mut pos = 1;
        let mut slot_index_map = vec![0usize; self.degree];
        for i in 0..row_size {
            let index1 = (pos - 1) >> 1;
            let index2 = (m - pos - 1) >> 1;
            slot_index_map[i] = index1.reverse_bits() >> (self.degree.leading_zeros() + 1);
            slot_index_map[row_size | i] =
                index2.reverse_bits() >> (self.degree.leading_zeros() + 1);
            pos *= gen;
            pos &= m - 1;
        }

        Ok(RlweParameters {
            polynomial_degree: self.degree,
            plaintext_modulus: self.plaintext,
            moduli: moduli.into(),
            moduli_sizes: moduli_sizes.into(),
            variance: self.variance,
            noise_scale: self.noise_scale,
            smudging_deviation: self.smudging_deviation,
            batch_size,
            secret_distribution: self.secret_distribution,
            scheme: self.scheme,
            ctx,
            plaintext: plaintext_modulus,
            op,
            delta,
            q_mod_t,
            scaler,
            mul_params,
            slot_index_map: slot_index_map.into(),
        })
    }
}

impl Serialize for RlweParameters {
    fn to_bytes(&self) -> Vec<u8> {
        proto::Parameters {
            degree: self.polynomial_degree as u32,
            plaintext: self.plaintext_modulus,
            moduli: self.moduli.to_vec(),
            variance: self.variance as u32,
            noise_scale: self.noise_scale,
            smudging_deviation: self.smudging_deviation,
            batch_size: self.batch_size as u32,
            secret_distribution: match self.secret_distribution {
                SecretDistribution::Gaussian => 0,
                SecretDistribution::Ternary => 1,
                SecretDistribution::SparseTernary => 2,
            },
            scheme: match self.scheme {
                SchemeId::Exact => 0,
                SchemeId::Approximate => 1,
            },
        }
        .encode_to_vec()
    }
}

impl Deserialize for RlweParameters {
    type Error = Error;

    fn try_deserialize(bytes: &[u8]) -> Result<Self> {
        let params: proto::Parameters =
            Message::decode(bytes).map_err(|_| Error::SerializationError)?;
        RlweParametersBuilder::new()
            .set_degree(params.degree as usize)
            .set_plaintext_modulus(params.plaintext)
            .set_moduli(&params.moduli)
            .set_variance(params.variance as usize)
            .set_noise_scale(params.noise_scale)
            .set_smudging_deviation(params.smudging_deviation)
            .set_batch_size(params.batch_size as usize)
            .set_secret_distribution(match params.secret_distribution {
                0 => SecretDistribution::Gaussian,
                1 => SecretDistribution::Ternary,
                2 => SecretDistribution::SparseTernary,
                _ => return Err(Error::SerializationError),
            })
            .set_scheme(match params.scheme {
                0 => SchemeId::Exact,
                1 => SchemeId::Approximate,
                _ => return Err(Error::SerializationError),
            })
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::{RlweParameters, RlweParametersBuilder, SecretDistribution};
    use crate::ParametersError;
    use fhe_traits::{Deserialize, Serialize};
    use std::error::Error;

    #[test]
    fn default() {
        let params = RlweParameters::default_arc(2, 16);
        assert_eq!(params.moduli().len(), 2);
        assert_eq!(params.degree(), 16);
        assert_eq!(params.cyclotomic_order(), 32);
        assert_eq!(params.batch_size(), 8);
        assert_eq!(params.noise_scale(), 1);
        assert_eq!(params.secret_distribution(), SecretDistribution::Ternary);
    }

    #[test]
    fn builder_validation() {
        assert!(RlweParametersBuilder::new().build().is_err());
        assert!(RlweParametersBuilder::new().set_degree(7).build().is_err());
        assert!(
            RlweParametersBuilder::new()
                .set_degree(16)
                .set_plaintext_modulus(2)
                .build()
                .is_err()
        );

        let e = RlweParametersBuilder::new()
            .set_degree(16)
            .set_plaintext_modulus(2)
            .set_moduli_sizes(&[30])
            .set_batch_size(3)
            .build();
        assert_eq!(
            e.err(),
            Some(crate::Error::ParametersError(
                ParametersError::InvalidBatchSize(3)
            ))
        );

        let e = RlweParametersBuilder::new()
            .set_degree(16)
            .set_plaintext_modulus(2)
            .set_moduli_sizes(&[30])
            .set_noise_scale(0)
            .build();
        assert_eq!(
            e.err(),
            Some(crate::Error::ParametersError(
                ParametersError::InvalidNoiseScale(0)
            ))
        );

        assert!(
            RlweParametersBuilder::new()
                .set_degree(16)
                .set_plaintext_modulus(2)
                .set_moduli_sizes(&[30])
                .build()
                .is_ok()
        );
    }

    #[test]
    fn serialize() -> Result<(), Box<dyn Error>> {
        let params = RlweParametersBuilder::new()
            .set_degree(16)
            .set_plaintext_modulus(1153)
            .set_moduli_sizes(&[50, 50])
            .set_noise_scale(1)
            .set_batch_size(4)
            .set_secret_distribution(SecretDistribution::SparseTernary)
            .build()?;
        let bytes = params.to_bytes();
        assert_eq!(RlweParameters::try_deserialize(&bytes)?, params);
        Ok(())
    }
}
