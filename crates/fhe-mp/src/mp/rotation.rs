//! Automorphism (rotation) key maps built across parties.

use crate::bfv::{
    traits::TryConvertFrom as MpTryConvertFrom, Ciphertext, KeySwitchingKey, RlweParameters,
    SchemeId, SecretKey,
};
use crate::mp::eval_key::add_eval_keys;
use crate::proto;
use crate::{Error, Result};
use fhe_math::rq::{Representation, SubstitutionExponent};
use fhe_math::zq::Modulus;
use fhe_traits::{DeserializeParametrized, FheParametrized, Serialize};
use prost::Message;
use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Indices below this count are processed sequentially; larger maps fan
/// out across threads.
const PARALLEL_THRESHOLD: usize = 4;

/// Inverse of an odd integer modulo a power of two, by Newton iteration.
fn inverse_mod_power_of_two(k: usize, m: usize) -> usize {
    debug_assert!(m.is_power_of_two() && k & 1 == 1);
    let mask = m - 1;
    let mut x = 1usize;
    for _ in 0..m.trailing_zeros() {
        x = (x * ((2 + m - ((k * x) & mask)) & mask)) & mask;
    }
    x
}

/// Automorphism index realizing a slot shift: `5^{shift mod M/4} mod M`.
fn shift_to_index(shift: i64, m: usize) -> usize {
    let slots = (m >> 2) as i64;
    let exponent = shift.rem_euclid(slots) as u64;
    Modulus::new(m as u64).unwrap().pow(5, exponent) as usize
}

/// A map from automorphism indices to evaluation keys switching
/// `φ_{k⁻¹}(s)` back onto `s`.
///
/// The first party generates the map with fresh randomness
/// ([`generate`](Self::generate)); every further party derives its
/// contribution from that prior map ([`extend`](Self::extend)), reusing its
/// `a` vectors so contributions can be summed with
/// [`add`](Self::add). Applying an entry at index `k` substitutes the
/// ciphertext by `k⁻¹ mod 2N` and key switches the result, realizing the
/// slot rotation associated with `k`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RotationKeyMap {
    pub(crate) par: Arc<RlweParameters>,
    pub(crate) map: BTreeMap<usize, KeySwitchingKey>,
}

impl RotationKeyMap {
    /// Automorphism index realizing a slot shift, per the scheme tag of the
    /// parameters.
    pub fn index_for_shift(par: &Arc<RlweParameters>, shift: i64) -> usize {
        // Exact-arithmetic packing shifts a row of N/2 slots; approximate
        // packing shifts M/4 conjugate slot pairs. On power-of-two rings
        // both windows hold M/4 positions, so the two rules reduce to the
        // same generator power.
        match par.scheme() {
            SchemeId::Exact | SchemeId::Approximate => {
                shift_to_index(shift, par.cyclotomic_order())
            }
        }
    }

    /// Automorphism indices enabling the inner sum over the batch:
    /// `g, g², g⁴, …` for `g = 5`, `⌈log₂ B⌉` of them.
    pub fn sum_indices(par: &Arc<RlweParameters>) -> Vec<usize> {
        let m = par.cyclotomic_order();
        let count = par.batch_size().ilog2() as usize;
        let mut indices = Vec::with_capacity(count);
        let mut g = 5usize;
        for _ in 0..count {
            indices.push(g);
            g = (g * g) % m;
        }
        indices
    }

    /// Generate a fresh map of rotation keys for the given automorphism
    /// indices. This is the first party's round; later parties extend the
    /// returned map.
    ///
    /// An empty index list yields an empty map.
    pub fn generate<R: RngCore + CryptoRng>(
        sk: &SecretKey,
        indices: &[usize],
        rng: &mut R,
    ) -> Result<Self> {
        Self::build(sk, indices, None, rng)
    }

    /// Generate this party's contribution for the given indices, reusing
    /// the `a` vectors of this prior map.
    ///
    /// Every index must be present in the prior map.
    pub fn extend<R: RngCore + CryptoRng>(
        &self,
        sk: &SecretKey,
        indices: &[usize],
        rng: &mut R,
    ) -> Result<Self> {
        if self.par != sk.par {
            return Err(Error::ParameterMismatch(
                "The share and the prior map carry different parameters".to_string(),
            ));
        }
        Self::build(sk, indices, Some(self), rng)
    }

    /// Generate a fresh map keyed for the given signed slot shifts.
    pub fn generate_for_shifts<R: RngCore + CryptoRng>(
        sk: &SecretKey,
        shifts: &[i64],
        rng: &mut R,
    ) -> Result<Self> {
        let indices = shifts
            .iter()
            .map(|shift| Self::index_for_shift(&sk.par, *shift))
            .collect::<Vec<_>>();
        Self::generate(sk, &indices, rng)
    }

    /// Generate this party's contribution for the given signed slot shifts,
    /// reusing the `a` vectors of this prior map.
    pub fn extend_for_shifts<R: RngCore + CryptoRng>(
        &self,
        sk: &SecretKey,
        shifts: &[i64],
        rng: &mut R,
    ) -> Result<Self> {
        let indices = shifts
            .iter()
            .map(|shift| Self::index_for_shift(&sk.par, *shift))
            .collect::<Vec<_>>();
        self.extend(sk, &indices, rng)
    }

    /// Generate a fresh map keyed for the inner sum over the batch.
    ///
    /// With a batch size of 1 the map is empty.
    pub fn generate_for_sum<R: RngCore + CryptoRng>(sk: &SecretKey, rng: &mut R) -> Result<Self> {
        Self::generate(sk, &Self::sum_indices(&sk.par), rng)
    }

    /// Generate this party's inner-sum contribution, reusing the `a`
    /// vectors of this prior map.
    pub fn extend_for_sum<R: RngCore + CryptoRng>(
        &self,
        sk: &SecretKey,
        rng: &mut R,
    ) -> Result<Self> {
        self.extend(sk, &Self::sum_indices(&sk.par), rng)
    }

    fn build<R: RngCore + CryptoRng>(
        sk: &SecretKey,
        indices: &[usize],
        prior: Option<&RotationKeyMap>,
        rng: &mut R,
    ) -> Result<Self> {
        let par = sk.par.clone();
        if indices.len() > par.degree() - 1 {
            return Err(Error::DimensionOverflow(indices.len(), par.degree() - 1));
        }
        if let Some(prior) = prior {
            for k in indices {
                if !prior.map.contains_key(k) {
                    return Err(Error::UnspecifiedInput(format!(
                        "No key for automorphism index {k} in the prior map"
                    )));
                }
            }
        }

        // Per-index seeds are drawn up front from the caller's generator, so
        // parallel and sequential construction produce identical maps.
        let seeds = indices
            .iter()
            .map(|_| {
                let mut seed = <ChaCha8Rng as SeedableRng>::Seed::default();
                rng.fill(&mut seed);
                seed
            })
            .collect::<Vec<_>>();

        let entries = if indices.len() >= PARALLEL_THRESHOLD {
            indices
                .par_iter()
                .zip(seeds.par_iter())
                .map(|(k, seed)| Self::key_for_index(sk, *k, prior, *seed))
                .collect::<Result<Vec<_>>>()?
        } else {
            indices
                .iter()
                .zip(seeds.iter())
                .map(|(k, seed)| Self::key_for_index(sk, *k, prior, *seed))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(Self {
            par,
            map: entries.into_iter().collect(),
        })
    }

    fn key_for_index(
        sk: &SecretKey,
        k: usize,
        prior: Option<&RotationKeyMap>,
        seed: <ChaCha8Rng as SeedableRng>::Seed,
    ) -> Result<(usize, KeySwitchingKey)> {
        let par = &sk.par;
        let m = par.cyclotomic_order();
        if k & 1 == 0 || k >= m {
            return Err(Error::UnspecifiedInput(format!(
                "Invalid automorphism index {k}: expected an odd integer below 2N"
            )));
        }

        // The key at k switches φ_{k⁻¹}(s) back onto s; the evaluator
        // substitutes ciphertext components by the same k⁻¹.
        let k_inv = inverse_mod_power_of_two(k, m);
        let exponent = SubstitutionExponent::new(&par.ctx, k_inv)?;
        let mut s_permuted = Zeroizing::new(sk.s.substitute(&exponent)?);
        s_permuted.change_representation(Representation::PowerBasis);

        let mut rng = ChaCha8Rng::from_seed(seed);
        let key = match prior.and_then(|prior| prior.map.get(&k)) {
            Some(prior_key) => {
                KeySwitchingKey::new_from_prior(sk, s_permuted.as_ref(), prior_key, &mut rng)?
            }
            None => KeySwitchingKey::new(sk, s_permuted.as_ref(), &mut rng)?,
        };
        Ok((k, key))
    }

    /// Add two maps with intersection semantics: the result holds
    /// [`add_eval_keys`] of the operands at each common index, and indices
    /// present in only one operand are dropped.
    pub fn add(&self, other: &RotationKeyMap) -> Result<RotationKeyMap> {
        if self.par != other.par {
            return Err(Error::ParameterMismatch(
                "The maps carry different parameters".to_string(),
            ));
        }

        let mut map = BTreeMap::new();
        for (k, key1) in &self.map {
            if let Some(key2) = other.map.get(k) {
                map.insert(*k, add_eval_keys(key1, key2)?);
            }
        }

        Ok(Self {
            par: self.par.clone(),
            map,
        })
    }

    /// Apply the automorphism at index `k` to a ciphertext.
    pub fn apply(&self, ct: &Ciphertext, k: usize) -> Result<Ciphertext> {
        if ct.par != self.par {
            return Err(Error::ParameterMismatch(
                "The ciphertext carries different parameters".to_string(),
            ));
        }
        if ct.len() != 2 {
            return Err(Error::TooManyValues(ct.len(), 2));
        }
        let key = self.map.get(&k).ok_or_else(|| {
            Error::UnspecifiedInput(format!("No key for automorphism index {k}"))
        })?;

        let k_inv = inverse_mod_power_of_two(k, self.par.cyclotomic_order());
        let exponent = SubstitutionExponent::new(&self.par.ctx, k_inv)?;

        let mut c1 = ct[1].substitute(&exponent)?;
        c1.change_representation(Representation::PowerBasis);
        let (mut d0, d1) = key.key_switch(&c1)?;
        d0 += &ct[0].substitute(&exponent)?;

        Ciphertext::new(vec![d0, d1], &self.par)
    }

    /// Rotate the plaintext slots by a signed shift: slot `j` of the result
    /// holds slot `j − shift` of the input, cyclically over the batch.
    pub fn rotate_by(&self, ct: &Ciphertext, shift: i64) -> Result<Ciphertext> {
        self.apply(ct, Self::index_for_shift(&self.par, shift))
    }

    /// Sum the batch into every slot, using the ladder of sum keys.
    pub fn inner_sum(&self, ct: &Ciphertext) -> Result<Ciphertext> {
        let mut out = ct.clone();
        for k in Self::sum_indices(&self.par) {
            let rotated = self.apply(&out, k)?;
            out += &rotated;
        }
        Ok(out)
    }

    /// The automorphism indices present in this map, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.map.keys().copied()
    }

    /// The number of keys in the map.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the map holds no keys.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl FheParametrized for RotationKeyMap {
    type Parameters = RlweParameters;
}

impl From<&RotationKeyMap> for proto::RotationKeyMap {
    fn from(value: &RotationKeyMap) -> Self {
        proto::RotationKeyMap {
            keys: value
                .map
                .iter()
                .map(|(k, key)| proto::RotationKeyEntry {
                    index: *k as u32,
                    key: Some(proto::KeySwitchingKey::from(key)),
                })
                .collect(),
        }
    }
}

impl Serialize for RotationKeyMap {
    fn to_bytes(&self) -> Vec<u8> {
        proto::RotationKeyMap::from(self).encode_to_vec()
    }
}

impl DeserializeParametrized for RotationKeyMap {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Self::Parameters>) -> Result<Self> {
        let rep: proto::RotationKeyMap =
            Message::decode(bytes).map_err(|_| Error::SerializationError)?;
        let mut map = BTreeMap::new();
        for entry in &rep.keys {
            let key = entry.key.as_ref().ok_or(Error::SerializationError)?;
            map.insert(
                entry.index as usize,
                KeySwitchingKey::try_convert_from(key, par)?,
            );
        }
        Ok(Self {
            par: par.clone(),
            map,
        })
    }
}
