//! Noise-flooded partial decryption and fusion.

use crate::bfv::{Ciphertext, Plaintext, RlweParameters, SecretKey};
use crate::sampling::sample_flood_vec;
use crate::{Error, Result};
use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Role of a party in one decryption session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyRole {
    /// The single party that folds `c0` into its contribution.
    Lead,
    /// Every other party.
    Follower,
}

/// One party's contribution to a decryption session.
///
/// Partial decryptions are single-use: they carry smudging noise bound to
/// one ciphertext and leak a flooded linear function of the share.
#[derive(Debug, Clone)]
pub struct PartialDecryption {
    pub(crate) par: Arc<RlweParameters>,
    pub(crate) role: PartyRole,
    pub(crate) b: Poly,
}

impl PartialDecryption {
    /// The role this contribution was produced under.
    pub fn role(&self) -> PartyRole {
        self.role
    }

    /// The flooded element this party transmits: in coefficient format for
    /// the lead, in evaluation format for followers.
    pub fn b(&self) -> &Poly {
        &self.b
    }
}

/// Smudging noise of deviation `σ_MP`, scaled by `ns`, in evaluation
/// format.
///
/// `σ_MP` is far larger than the ambient ciphertext noise, so the partial
/// decryption is statistically indistinguishable from a fresh RLWE sample.
fn flood_noise<R: RngCore + CryptoRng>(par: &Arc<RlweParameters>, rng: &mut R) -> Result<Poly> {
    let coefficients = Zeroizing::new(sample_flood_vec(
        par.degree(),
        par.smudging_deviation(),
        rng,
    ));
    let mut e = Poly::try_convert_from(
        coefficients.as_ref() as &[i64],
        &par.ctx,
        false,
        Representation::PowerBasis,
    )?;
    e.change_representation(Representation::Ntt);
    Ok(par.scale_noise(e))
}

/// The lead party's partial decryption: `c0 + s·c1 + ns·e`, switched to
/// coefficient format.
///
/// Exactly one party must act as lead per session.
pub fn lead_partial<R: RngCore + CryptoRng>(
    ct: &Ciphertext,
    sk: &SecretKey,
    rng: &mut R,
) -> Result<PartialDecryption> {
    if ct.par != sk.par {
        return Err(Error::ParameterMismatch(
            "The ciphertext and the share carry different parameters".to_string(),
        ));
    }
    if ct.len() != 2 {
        return Err(Error::TooManyValues(ct.len(), 2));
    }

    let e = Zeroizing::new(flood_noise(&sk.par, rng)?);

    let mut b = ct[1].clone();
    b.disallow_variable_time_computations();
    b *= &sk.s;
    b += &ct[0];
    b += e.as_ref();
    b.change_representation(Representation::PowerBasis);

    Ok(PartialDecryption {
        par: sk.par.clone(),
        role: PartyRole::Lead,
        b,
    })
}

/// A follower party's partial decryption: `s·c1 + ns·e`, left in
/// evaluation format.
pub fn follower_partial<R: RngCore + CryptoRng>(
    ct: &Ciphertext,
    sk: &SecretKey,
    rng: &mut R,
) -> Result<PartialDecryption> {
    if ct.par != sk.par {
        return Err(Error::ParameterMismatch(
            "The ciphertext and the share carry different parameters".to_string(),
        ));
    }
    if ct.len() != 2 {
        return Err(Error::TooManyValues(ct.len(), 2));
    }

    let e = Zeroizing::new(flood_noise(&sk.par, rng)?);

    let mut b = ct[1].clone();
    b.disallow_variable_time_computations();
    b *= &sk.s;
    b += e.as_ref();

    Ok(PartialDecryption {
        par: sk.par.clone(),
        role: PartyRole::Follower,
        b,
    })
}

/// Fuse the partial decryptions of one session into the plaintext.
///
/// The set must contain exactly one lead contribution; all contributions
/// must carry the same parameters. The `b` components are summed, switched
/// to coefficient format and scaled down to the plaintext modulus.
pub fn fuse<I>(partials: I) -> Result<Plaintext>
where
    I: IntoIterator<Item = PartialDecryption>,
{
    let partials: Vec<PartialDecryption> = partials.into_iter().collect();
    let first = partials
        .first()
        .ok_or_else(|| Error::EmptyInput("No partial decryptions provided".to_string()))?;
    let par = first.par.clone();

    if partials.iter().any(|partial| partial.par != par) {
        return Err(Error::ParameterMismatch(
            "The partial decryptions carry different parameters".to_string(),
        ));
    }

    let leads = partials
        .iter()
        .filter(|partial| partial.role == PartyRole::Lead)
        .count();
    if leads != 1 {
        return Err(Error::MalformedPartial(format!(
            "A decryption session requires exactly one lead partial, found {leads}"
        )));
    }
    for partial in &partials {
        let expected = match partial.role {
            PartyRole::Lead => Representation::PowerBasis,
            PartyRole::Follower => Representation::Ntt,
        };
        if partial.b.representation() != &expected {
            return Err(Error::MalformedPartial(
                "A partial decryption has an unexpected format".to_string(),
            ));
        }
    }

    let mut c = Zeroizing::new(Poly::zero(&par.ctx, Representation::Ntt));
    let mut lead_b = None;
    for partial in partials {
        match partial.role {
            PartyRole::Lead => lead_b = Some(partial.b),
            PartyRole::Follower => *c.as_mut() += &partial.b,
        }
    }
    c.change_representation(Representation::PowerBasis);
    // The lead contribution is already in coefficient format.
    *c.as_mut() += &lead_b.unwrap();

    Plaintext::try_from_scaled(c.as_ref(), &par)
}
