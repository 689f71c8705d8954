//! Common random polynomials.

use crate::bfv::{PublicKey, RlweParameters};
use crate::Result;
use fhe_math::rq::{Poly, Representation};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;

/// A polynomial sampled from a random _common reference string_.
///
/// Chained key generation needs a starting `a` all parties agree on; this
/// type produces it and wraps it as a trivial `(0, a)` public key that the
/// first party extends.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CommonRandomPoly {
    pub(crate) par: Arc<RlweParameters>,
    pub(crate) poly: Poly,
}

impl CommonRandomPoly {
    /// Generate a new random CRP.
    pub fn new<R: RngCore + CryptoRng>(par: &Arc<RlweParameters>, rng: &mut R) -> Result<Self> {
        let poly = Poly::random(&par.ctx, Representation::Ntt, rng);
        Ok(Self {
            par: par.clone(),
            poly,
        })
    }

    /// The trivial public key `(0, a)` seeding a key-generation chain.
    pub fn to_public_seed(&self) -> PublicKey {
        PublicKey {
            par: self.par.clone(),
            b: Poly::zero(&self.par.ctx, Representation::Ntt),
            a: self.poly.clone(),
        }
    }
}
