//! Secret shares for the threshold RLWE scheme.

use crate::bfv::{Ciphertext, Plaintext, RlweParameters, SecretDistribution};
use crate::sampling::{sample_sparse_ternary_vec, sample_ternary_vec};
use crate::{Error, Result};
use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use fhe_traits::{FheDecrypter, FheEncrypter, FheParametrized};
use fhe_util::sample_vec_cbd;
use num_bigint::BigUint;
use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use zeroize::{Zeroize as _, Zeroizing};
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

/// Number of non-zero coefficients of a sparse ternary secret.
pub(crate) const SPARSE_HAMMING_WEIGHT: usize = 64;

/// One party's secret share.
///
/// The share is a single ring element, kept in evaluation format since
/// every protocol operation consumes it that way. No party ever holds the
/// joint secret; it exists only as the never-materialized sum of all
/// shares.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    /// The parameters of the underlying scheme.
    #[zeroize(skip)]
    pub(crate) par: Arc<RlweParameters>,
    /// The secret element, in evaluation format.
    pub(crate) s: Poly,
}

impl SecretKey {
    /// Generate a random share from the distribution configured on the
    /// parameters.
    pub fn random<R: RngCore + CryptoRng>(par: &Arc<RlweParameters>, rng: &mut R) -> Result<Self> {
        let s = match par.secret_distribution {
            SecretDistribution::Gaussian => {
                let coefficients = Zeroizing::new(
                    sample_vec_cbd(par.degree(), par.variance, rng)
                        .map_err(|e| Error::SamplerFailure(e.to_string()))?,
                );
                let mut s = Poly::try_convert_from(
                    coefficients.as_ref() as &[i64],
                    &par.ctx,
                    false,
                    Representation::PowerBasis,
                )?;
                s.change_representation(Representation::Ntt);
                s
            }
            SecretDistribution::Ternary => {
                let coefficients = Zeroizing::new(sample_ternary_vec(par.degree(), rng));
                let mut s = Poly::try_convert_from(
                    coefficients.as_ref() as &[i64],
                    &par.ctx,
                    false,
                    Representation::PowerBasis,
                )?;
                s.change_representation(Representation::Ntt);
                s
            }
            SecretDistribution::SparseTernary => {
                let coefficients = Zeroizing::new(sample_sparse_ternary_vec(
                    par.degree(),
                    SPARSE_HAMMING_WEIGHT,
                    rng,
                ));
                let mut s = Poly::try_convert_from(
                    coefficients.as_ref() as &[i64],
                    &par.ctx,
                    false,
                    Representation::PowerBasis,
                )?;
                s.change_representation(Representation::Ntt);
                s
            }
        };
        Ok(Self {
            par: par.clone(),
            s,
        })
    }

    /// Build a share from an existing secret element.
    pub(crate) fn new(s: Poly, par: &Arc<RlweParameters>) -> Self {
        Self {
            par: par.clone(),
            s,
        }
    }

    /// The secret element in coefficient format, for key-switch generation.
    pub(crate) fn power_basis(&self) -> Zeroizing<Poly> {
        let mut s = Zeroizing::new(self.s.clone());
        s.change_representation(Representation::PowerBasis);
        s
    }

    /// Measure the noise in a [`Ciphertext`].
    ///
    /// # Safety
    ///
    /// This operation may run in a variable time depending on the value of
    /// the noise.
    pub unsafe fn measure_noise(&self, ct: &Ciphertext) -> Result<usize> {
        let plaintext = self.try_decrypt(ct)?;
        let mut m = plaintext.to_poly();

        let mut si = self.s.clone();
        let mut c = ct.c[0].clone();
        c.disallow_variable_time_computations();

        for i in 1..ct.c.len() {
            let mut cis = ct.c[i].clone();
            cis.disallow_variable_time_computations();
            cis *= &si;
            c += &cis;
            cis.zeroize();
            si *= &self.s;
        }
        c -= &m;
        c.change_representation(Representation::PowerBasis);

        si.zeroize();

        let ciphertext_modulus = c.ctx().modulus();
        let mut noise = 0usize;
        for coeff in Vec::<BigUint>::from(&c) {
            noise = std::cmp::max(
                noise,
                std::cmp::min(coeff.bits(), (ciphertext_modulus - &coeff).bits()) as usize,
            )
        }

        c.zeroize();
        m.zeroize();

        Ok(noise)
    }

    pub(crate) fn encrypt_poly<R: RngCore + CryptoRng>(
        &self,
        p: &Poly,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        if p.representation() != &Representation::Ntt {
            return Err(Error::MathError(fhe_math::Error::IncorrectRepresentation(
                p.representation().clone(),
                Representation::Ntt,
            )));
        }

        let mut seed = <ChaCha8Rng as SeedableRng>::Seed::default();
        rng.fill(&mut seed);

        let mut a = Poly::random_from_seed(&self.par.ctx, Representation::Ntt, seed);
        let mut a_s = &a * &self.s;

        let e = Poly::small(&self.par.ctx, Representation::Ntt, self.par.variance, rng)?;
        let mut b = self.par.scale_noise(e);
        b -= &a_s;
        b += p;

        a_s.zeroize();

        // It is now safe to enable variable time computations.
        unsafe {
            a.allow_variable_time_computations();
            b.allow_variable_time_computations()
        }

        Ok(Ciphertext {
            par: self.par.clone(),
            seed: Some(seed),
            c: vec![b, a],
        })
    }
}

impl FheParametrized for SecretKey {
    type Parameters = RlweParameters;
}

impl FheEncrypter<Plaintext, Ciphertext> for SecretKey {
    type Error = Error;

    fn try_encrypt<R: RngCore + CryptoRng>(
        &self,
        pt: &Plaintext,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        if self.par != pt.par {
            return Err(Error::ParameterMismatch(
                "The plaintext uses different parameters".to_string(),
            ));
        }
        let mut m = pt.to_poly();
        let ct = self.encrypt_poly(&m, rng);
        m.zeroize();
        ct
    }
}

impl FheDecrypter<Plaintext, Ciphertext> for SecretKey {
    type Error = Error;

    fn try_decrypt(&self, ct: &Ciphertext) -> Result<Plaintext> {
        if self.par != ct.par {
            return Err(Error::ParameterMismatch(
                "The ciphertext uses different parameters".to_string(),
            ));
        }

        let mut si = self.s.clone();
        let mut c = ct.c[0].clone();
        c.disallow_variable_time_computations();

        for i in 1..ct.c.len() {
            let mut cis = ct.c[i].clone();
            cis.disallow_variable_time_computations();
            cis *= &si;
            c += &cis;
            cis.zeroize();
            si *= &self.s;
        }
        c.change_representation(Representation::PowerBasis);

        si.zeroize();

        let pt = Plaintext::try_from_scaled(&c, &self.par);
        c.zeroize();
        pt
    }
}
