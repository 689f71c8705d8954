//! Joint key generation.

use crate::bfv::{PublicKey, RlweParameters, SecretKey};
use crate::{Error, Result};
use fhe_math::rq::{Poly, Representation};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use zeroize::Zeroizing;

/// A public key together with one secret element.
///
/// For [`aggregate_keygen`] the secret is the sum of all shares, which only
/// a trusted aggregator may hold; for [`extend_keygen`] it is the calling
/// party's fresh local share.
#[derive(Debug)]
pub struct KeyPair {
    /// The (joint) public key.
    pub public: PublicKey,
    /// The secret element paired with it.
    pub secret: SecretKey,
}

/// Aggregate secret shares into a joint key pair.
///
/// Draws fresh public randomness `a` and produces the public key
/// `(ns·e − a·Σsᵢ, a)`. All shares must carry the given parameters.
pub fn aggregate_keygen<R: RngCore + CryptoRng>(
    par: &Arc<RlweParameters>,
    shares: &[SecretKey],
    rng: &mut R,
) -> Result<KeyPair> {
    if shares.is_empty() {
        return Err(Error::EmptyInput("No secret shares provided".to_string()));
    }
    if shares.iter().any(|share| &share.par != par) {
        return Err(Error::ParameterMismatch(
            "The shares carry different parameters".to_string(),
        ));
    }

    let mut s = Poly::zero(&par.ctx, Representation::Ntt);
    for share in shares {
        s += &share.s;
    }

    let a = Poly::random(&par.ctx, Representation::Ntt, rng);
    let e = Poly::small(&par.ctx, Representation::Ntt, par.variance, rng)?;
    let e = Zeroizing::new(par.scale_noise(e));

    let mut b = -(&a * &s);
    b += e.as_ref();

    Ok(KeyPair {
        public: PublicKey {
            par: par.clone(),
            b,
            a,
        },
        secret: SecretKey::new(s, par),
    })
}

/// Draw a fresh local share and extend a predecessor public key with it.
///
/// The predecessor's public randomness `a` is reused, which is what makes
/// the parties' contributions joinable. With `fresh = true` the returned
/// key is this party's *separable* contribution `(ns·e − a·sᵢ, a)`; with
/// `fresh = false` the predecessor's `b` is folded in, yielding the updated
/// joint key `(ns·e − a·sᵢ + b_prev, a)` after this party.
pub fn extend_keygen<R: RngCore + CryptoRng>(
    prior: &PublicKey,
    fresh: bool,
    rng: &mut R,
) -> Result<KeyPair> {
    let par = prior.par.clone();
    let secret = SecretKey::random(&par, rng)?;

    let e = Poly::small(&par.ctx, Representation::Ntt, par.variance, rng)?;
    let e = Zeroizing::new(par.scale_noise(e));

    let mut b = -(&prior.a * &secret.s);
    b += e.as_ref();
    if !fresh {
        b += &prior.b;
    }

    Ok(KeyPair {
        public: PublicKey {
            par,
            b,
            a: prior.a.clone(),
        },
        secret,
    })
}

#[cfg(test)]
mod tests {
    use super::{aggregate_keygen, extend_keygen};
    use crate::bfv::{RlweParameters, SecretKey};
    use crate::mp::CommonRandomPoly;
    use fhe_math::rq::Representation;
    use num_bigint::BigUint;
    use rand::rng;
    use std::error::Error;

    const NUM_PARTIES: usize = 5;

    #[test]
    fn empty_shares_rejected() {
        let mut rng = rng();
        let params = RlweParameters::default_arc(2, 16);
        assert!(aggregate_keygen(&params, &[], &mut rng).is_err());
    }

    #[test]
    fn mismatched_shares_rejected() -> Result<(), Box<dyn Error>> {
        let mut rng = rng();
        let params = RlweParameters::default_arc(2, 16);
        let other = RlweParameters::default_arc(2, 32);
        let shares = vec![
            SecretKey::random(&params, &mut rng)?,
            SecretKey::random(&other, &mut rng)?,
        ];
        assert!(aggregate_keygen(&params, &shares, &mut rng).is_err());
        Ok(())
    }

    #[test]
    // The joint key must satisfy b + a·(Σ sᵢ) = ns·e with e small.
    fn aggregate_key_validity() -> Result<(), Box<dyn Error>> {
        let mut rng = rng();
        let params = RlweParameters::default_arc(2, 16);
        for _ in 0..10 {
            let shares = (0..NUM_PARTIES)
                .map(|_| SecretKey::random(&params, &mut rng))
                .collect::<crate::Result<Vec<_>>>()?;
            let kp = aggregate_keygen(&params, &shares, &mut rng)?;

            let mut residual = &kp.public.b + &(&kp.public.a * &kp.secret.s);
            residual.change_representation(Representation::PowerBasis);

            let q = params.ctx.modulus();
            let bound = BigUint::from(2 * params.variance as u64 * params.noise_scale());
            for coeff in Vec::<BigUint>::from(&residual) {
                let magnitude = std::cmp::min(coeff.clone(), q - &coeff);
                assert!(magnitude <= bound);
            }
        }
        Ok(())
    }

    #[test]
    // Chaining all parties with fresh = false must yield a key valid under
    // the sum of the drawn shares, regardless of the chain order.
    fn extend_key_validity() -> Result<(), Box<dyn Error>> {
        let mut rng = rng();
        let params = RlweParameters::default_arc(2, 16);
        let crp = CommonRandomPoly::new(&params, &mut rng)?;

        let mut pk = crp.to_public_seed();
        let mut shares = vec![];
        for _ in 0..NUM_PARTIES {
            let kp = extend_keygen(&pk, false, &mut rng)?;
            pk = kp.public;
            shares.push(kp.secret);
        }

        let mut s = fhe_math::rq::Poly::zero(&params.ctx, Representation::Ntt);
        for share in &shares {
            s += &share.s;
        }

        let mut residual = &pk.b + &(&pk.a * &s);
        residual.change_representation(Representation::PowerBasis);

        let q = params.ctx.modulus();
        // Each chained party contributes one ns-scaled cbd error.
        let bound =
            BigUint::from(2 * params.variance as u64 * params.noise_scale() * NUM_PARTIES as u64);
        for coeff in Vec::<BigUint>::from(&residual) {
            let magnitude = std::cmp::min(coeff.clone(), q - &coeff);
            assert!(magnitude <= bound);
        }
        Ok(())
    }
}
