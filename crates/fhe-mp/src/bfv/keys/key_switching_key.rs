//! Key-switching keys for the threshold RLWE scheme.

use crate::bfv::{traits::TryConvertFrom as MpTryConvertFrom, RlweParameters, SecretKey};
use crate::proto;
use crate::{Error, Result};
use fhe_math::rns::RnsContext;
use fhe_math::rq::{Context, Poly, Representation};
use fhe_traits::{DeserializeParametrized, DeserializeWithContext, FheParametrized, Serialize};
use itertools::izip;
use prost::Message;
use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Key-switching key (evaluation key) for the threshold RLWE scheme.
///
/// The key holds two parallel digit vectors `(a, b)` over the RNS garner
/// basis, one pair per ciphertext modulus, such that
/// `b_k + a_k·s = ns·e_k + g_k·from` where `from` is the switched-out
/// secret. The multiparty protocols compose such keys additively, which is
/// sound exactly when the parties share the `a` vector; the
/// [`new_from_prior`](Self::new_from_prior) constructor produces a party's
/// contribution reusing the `a` vector of an existing key.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct KeySwitchingKey {
    /// The parameters of the underlying scheme.
    pub(crate) par: Arc<RlweParameters>,

    /// The (optional) seed that generated the polynomials a.
    pub(crate) seed: Option<<ChaCha8Rng as SeedableRng>::Seed>,

    /// The key switching elements a.
    pub(crate) a: Box<[Poly]>,

    /// The key switching elements b.
    pub(crate) b: Box<[Poly]>,
}

impl KeySwitchingKey {
    /// Generate a [`KeySwitchingKey`] to this party's secret from a
    /// polynomial `from`, with fresh seeded public randomness.
    pub fn new<R: RngCore + CryptoRng>(sk: &SecretKey, from: &Poly, rng: &mut R) -> Result<Self> {
        if sk.par.moduli.len() == 1 {
            return Err(Error::UnspecifiedInput(
                "These parameters do not support key switching".to_string(),
            ));
        }
        if from.ctx() != &sk.par.ctx {
            return Err(Error::ParameterMismatch(
                "Incorrect context for polynomial from".to_string(),
            ));
        }

        let mut seed = <ChaCha8Rng as SeedableRng>::Seed::default();
        rng.fill(&mut seed);
        let a = Self::generate_a(&sk.par.ctx, seed, sk.par.moduli.len());
        let b = Self::generate_b(sk, from, &a, rng)?;

        Ok(Self {
            par: sk.par.clone(),
            seed: Some(seed),
            a: a.into_boxed_slice(),
            b: b.into_boxed_slice(),
        })
    }

    /// Generate a [`KeySwitchingKey`] to this party's secret from a
    /// polynomial `from`, reusing the `a` vector of an existing key.
    ///
    /// This is the multiparty variant: contributions produced against the
    /// same prior key can be summed into a key for the sum of the parties'
    /// secrets.
    pub fn new_from_prior<R: RngCore + CryptoRng>(
        sk: &SecretKey,
        from: &Poly,
        prior: &KeySwitchingKey,
        rng: &mut R,
    ) -> Result<Self> {
        if sk.par != prior.par {
            return Err(Error::ParameterMismatch(
                "The prior key uses different parameters".to_string(),
            ));
        }
        if from.ctx() != &sk.par.ctx {
            return Err(Error::ParameterMismatch(
                "Incorrect context for polynomial from".to_string(),
            ));
        }

        let b = Self::generate_b(sk, from, &prior.a, rng)?;

        Ok(Self {
            par: sk.par.clone(),
            seed: prior.seed,
            a: prior.a.clone(),
            b: b.into_boxed_slice(),
        })
    }

    /// The number of digits in the gadget decomposition.
    pub fn len(&self) -> usize {
        self.a.len()
    }

    /// Whether the key holds no digits. Always false for valid keys.
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Generate the a's from the seed.
    fn generate_a(
        ctx: &Arc<Context>,
        seed: <ChaCha8Rng as SeedableRng>::Seed,
        size: usize,
    ) -> Vec<Poly> {
        let mut a = Vec::with_capacity(size);
        let mut rng = ChaCha8Rng::from_seed(seed);
        (0..size).for_each(|_| {
            let mut seed_i = <ChaCha8Rng as SeedableRng>::Seed::default();
            rng.fill(&mut seed_i);
            let mut ai = Poly::random_from_seed(ctx, Representation::NttShoup, seed_i);
            unsafe { ai.allow_variable_time_computations() }
            a.push(ai);
        });
        a
    }

    /// Generate the b's from the a's and this party's secret.
    fn generate_b<R: RngCore + CryptoRng>(
        sk: &SecretKey,
        from: &Poly,
        a: &[Poly],
        rng: &mut R,
    ) -> Result<Vec<Poly>> {
        if a.is_empty() {
            return Err(Error::EmptyInput("Empty number of a's".to_string()));
        }
        if from.representation() != &Representation::PowerBasis {
            return Err(Error::MathError(fhe_math::Error::IncorrectRepresentation(
                from.representation().clone(),
                Representation::PowerBasis,
            )));
        }

        let rns = RnsContext::new(&sk.par.moduli)?;
        let b = a
            .iter()
            .enumerate()
            .map(|(i, ai)| {
                let mut a_s = Zeroizing::new(ai.clone());
                a_s.disallow_variable_time_computations();
                a_s.change_representation(Representation::Ntt);
                *a_s.as_mut() *= &sk.s;
                a_s.change_representation(Representation::PowerBasis);

                let e = Poly::small(
                    a_s.ctx(),
                    Representation::PowerBasis,
                    sk.par.variance,
                    rng,
                )?;
                let mut bi = sk.par.scale_noise(e);
                bi -= a_s.as_ref();

                let gi = rns.get_garner(i).unwrap();
                let gi_from = Zeroizing::new(gi * from);
                bi += gi_from.as_ref();

                // It is now safe to enable variable time computations.
                unsafe { bi.allow_variable_time_computations() }
                bi.change_representation(Representation::NttShoup);
                Ok(bi)
            })
            .collect::<Result<Vec<Poly>>>()?;

        Ok(b)
    }

    /// Key switch a polynomial in coefficient format.
    pub fn key_switch(&self, p: &Poly) -> Result<(Poly, Poly)> {
        if p.ctx() != &self.par.ctx {
            return Err(Error::ParameterMismatch(
                "The input polynomial does not have the correct context".to_string(),
            ));
        }
        if p.representation() != &Representation::PowerBasis {
            return Err(Error::MathError(fhe_math::Error::IncorrectRepresentation(
                p.representation().clone(),
                Representation::PowerBasis,
            )));
        }

        let ctx = &self.par.ctx;
        let mut c0 = Poly::zero(ctx, Representation::Ntt);
        let mut c1 = Poly::zero(ctx, Representation::Ntt);
        let p_coefficients = p.coefficients();
        for (p_i_coefficients, b_i, a_i) in
            izip!(p_coefficients.outer_iter(), self.b.iter(), self.a.iter())
        {
            let mut p_i = unsafe {
                Poly::create_constant_ntt_polynomial_with_lazy_coefficients_and_variable_time(
                    p_i_coefficients.as_slice().unwrap(),
                    ctx,
                )
            };
            c0 += &(&p_i * b_i);
            p_i *= a_i;
            c1 += &p_i;
        }
        Ok((c0, c1))
    }
}

impl FheParametrized for KeySwitchingKey {
    type Parameters = RlweParameters;
}

impl From<&KeySwitchingKey> for proto::KeySwitchingKey {
    fn from(value: &KeySwitchingKey) -> Self {
        let mut ksk = proto::KeySwitchingKey {
            len: value.a.len() as u32,
            ..Default::default()
        };
        if let Some(seed) = value.seed.as_ref() {
            ksk.seed = seed.to_vec();
        } else {
            ksk.a.reserve_exact(value.a.len());
            for ai in value.a.iter() {
                ksk.a.push(ai.to_bytes())
            }
        }
        ksk.b.reserve_exact(value.b.len());
        for bi in value.b.iter() {
            ksk.b.push(bi.to_bytes())
        }
        ksk
    }
}

impl MpTryConvertFrom<&proto::KeySwitchingKey> for KeySwitchingKey {
    fn try_convert_from(
        value: &proto::KeySwitchingKey,
        par: &Arc<RlweParameters>,
    ) -> Result<Self> {
        let len = value.len as usize;
        if len != par.moduli.len() || value.b.len() != len {
            return Err(Error::SerializationError);
        }

        let seed = if value.seed.is_empty() {
            if value.a.len() != len {
                return Err(Error::SerializationError);
            }
            None
        } else {
            let seed = <ChaCha8Rng as SeedableRng>::Seed::try_from(value.seed.clone())
                .map_err(|_| Error::SerializationError)?;
            Some(seed)
        };

        let a = if let Some(seed) = seed {
            Self::generate_a(&par.ctx, seed, len)
        } else {
            value
                .a
                .iter()
                .map(|ai| Poly::from_bytes(ai, &par.ctx).map_err(Error::MathError))
                .collect::<Result<Vec<Poly>>>()?
        };

        let b = value
            .b
            .iter()
            .map(|bi| Poly::from_bytes(bi, &par.ctx).map_err(Error::MathError))
            .collect::<Result<Vec<Poly>>>()?;

        Ok(Self {
            par: par.clone(),
            seed,
            a: a.into_boxed_slice(),
            b: b.into_boxed_slice(),
        })
    }
}

impl Serialize for KeySwitchingKey {
    fn to_bytes(&self) -> Vec<u8> {
        proto::KeySwitchingKey::from(self).encode_to_vec()
    }
}

impl DeserializeParametrized for KeySwitchingKey {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Self::Parameters>) -> Result<Self> {
        let ksk: proto::KeySwitchingKey =
            Message::decode(bytes).map_err(|_| Error::SerializationError)?;
        KeySwitchingKey::try_convert_from(&ksk, par)
    }
}
