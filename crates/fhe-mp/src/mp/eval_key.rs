//! Additive composition and rerandomization of evaluation keys.

use crate::bfv::{KeySwitchingKey, PublicKey, SecretKey};
use crate::{Error, Result};
use fhe_math::rq::{Poly, Representation};
use itertools::izip;
use rand::{CryptoRng, RngCore};

fn to_ntt(p: &Poly) -> Poly {
    let mut q = p.clone();
    q.change_representation(Representation::Ntt);
    q
}

/// Add two public-key contributions sharing the same public randomness.
///
/// The caller ensures both keys were built over the same `a`; the result
/// reuses the `a` of the first key. The operation is commutative.
pub fn add_public_keys(pk1: &PublicKey, pk2: &PublicKey) -> Result<PublicKey> {
    if pk1.par != pk2.par {
        return Err(Error::ParameterMismatch(
            "The public keys carry different parameters".to_string(),
        ));
    }

    Ok(PublicKey {
        par: pk1.par.clone(),
        b: &pk1.b + &pk2.b,
        a: pk1.a.clone(),
    })
}

/// Add two evaluation-key contributions sharing the same `a` vector.
///
/// By protocol the `a` vectors already match across parties (they were
/// built from a common prior key), so the result reuses the `a` vector of
/// the first key and sums the `b` vectors digit-wise.
pub fn add_eval_keys(ek1: &KeySwitchingKey, ek2: &KeySwitchingKey) -> Result<KeySwitchingKey> {
    if ek1.par != ek2.par || ek1.len() != ek2.len() {
        return Err(Error::ParameterMismatch(
            "The evaluation keys carry different parameters".to_string(),
        ));
    }

    let b = izip!(ek1.b.iter(), ek2.b.iter())
        .map(|(b1, b2)| {
            let mut bi = to_ntt(b1);
            bi += &to_ntt(b2);
            bi.change_representation(Representation::NttShoup);
            bi
        })
        .collect::<Vec<_>>();

    Ok(KeySwitchingKey {
        par: ek1.par.clone(),
        seed: ek1.seed,
        a: ek1.a.clone(),
        b: b.into_boxed_slice(),
    })
}

/// Add two rerandomized evaluation-key contributions digit-wise on both
/// vectors.
///
/// Unlike [`add_eval_keys`], the `a` vectors need not match: after
/// [`mult_eval_key`] every party's contribution carries its own
/// rerandomized `a` vector, and the relinearization key for the joint
/// secret is the sum over both vectors.
pub fn add_eval_mult_keys(ek1: &KeySwitchingKey, ek2: &KeySwitchingKey) -> Result<KeySwitchingKey> {
    if ek1.par != ek2.par || ek1.len() != ek2.len() {
        return Err(Error::ParameterMismatch(
            "The evaluation keys carry different parameters".to_string(),
        ));
    }

    let (a, b): (Vec<_>, Vec<_>) = izip!(ek1.a.iter(), ek1.b.iter(), ek2.a.iter(), ek2.b.iter())
        .map(|(a1, b1, a2, b2)| {
            let mut ai = to_ntt(a1);
            ai += &to_ntt(a2);
            ai.change_representation(Representation::NttShoup);
            let mut bi = to_ntt(b1);
            bi += &to_ntt(b2);
            bi.change_representation(Representation::NttShoup);
            (ai, bi)
        })
        .unzip();

    Ok(KeySwitchingKey {
        par: ek1.par.clone(),
        seed: None,
        a: a.into_boxed_slice(),
        b: b.into_boxed_slice(),
    })
}

/// Rerandomize an evaluation key by a party's secret share.
///
/// Fresh independent noise is drawn for every digit; the sum of such
/// contributions over all parties is a relinearization key for the joint
/// secret.
pub fn mult_eval_key<R: RngCore + CryptoRng>(
    sk: &SecretKey,
    ek: &KeySwitchingKey,
    rng: &mut R,
) -> Result<KeySwitchingKey> {
    if sk.par != ek.par {
        return Err(Error::ParameterMismatch(
            "The share and the evaluation key carry different parameters".to_string(),
        ));
    }

    let par = &sk.par;
    let mut a = Vec::with_capacity(ek.len());
    let mut b = Vec::with_capacity(ek.len());
    for (ai, bi) in izip!(ek.a.iter(), ek.b.iter()) {
        let e1 = Poly::small(&par.ctx, Representation::Ntt, par.variance, rng)?;
        let e2 = Poly::small(&par.ctx, Representation::Ntt, par.variance, rng)?;

        let mut ai = to_ntt(ai);
        ai.disallow_variable_time_computations();
        ai *= &sk.s;
        ai += &par.scale_noise(e1);
        ai.change_representation(Representation::NttShoup);

        let mut bi = to_ntt(bi);
        bi.disallow_variable_time_computations();
        bi *= &sk.s;
        bi += &par.scale_noise(e2);
        bi.change_representation(Representation::NttShoup);

        a.push(ai);
        b.push(bi);
    }

    Ok(KeySwitchingKey {
        par: sk.par.clone(),
        seed: None,
        a: a.into_boxed_slice(),
        b: b.into_boxed_slice(),
    })
}

/// This party's share of the common linear evaluation key, with fresh
/// public randomness.
///
/// The share is a key switching the party's own secret to itself; summed
/// across parties (via [`add_eval_keys`]) and rerandomized (via
/// [`mult_eval_key`] and [`add_eval_mult_keys`]) it becomes the
/// relinearization key for the joint secret.
pub fn linear_key_share<R: RngCore + CryptoRng>(
    sk: &SecretKey,
    rng: &mut R,
) -> Result<KeySwitchingKey> {
    let from = sk.power_basis();
    KeySwitchingKey::new(sk, from.as_ref(), rng)
}

/// This party's share of the common linear evaluation key, reusing the
/// public randomness of a prior share.
pub fn linear_key_share_from<R: RngCore + CryptoRng>(
    sk: &SecretKey,
    prior: &KeySwitchingKey,
    rng: &mut R,
) -> Result<KeySwitchingKey> {
    let from = sk.power_basis();
    KeySwitchingKey::new_from_prior(sk, from.as_ref(), prior, rng)
}
