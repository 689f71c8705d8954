//! Public keys for the threshold RLWE scheme.

use crate::bfv::{Ciphertext, Plaintext, RlweParameters};
use crate::proto;
use crate::{Error, Result};
use fhe_math::rq::{Poly, Representation};
use fhe_traits::{
    DeserializeParametrized, DeserializeWithContext, FheEncrypter, FheParametrized, Serialize,
};
use prost::Message;
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Public key for the threshold RLWE scheme.
///
/// The key is the pair `(b, a)` of ring elements in evaluation format,
/// satisfying `b + a·s ≈ 0` up to an `ns`-scaled Gaussian, where `s` is the
/// (joint) secret. Joint keys are produced by the key generation protocols
/// in [`crate::mp`]; every party's contribution reuses the same public
/// randomness `a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// The parameters of the underlying scheme.
    pub(crate) par: Arc<RlweParameters>,
    /// The masked element `b = ns·e − a·s`.
    pub(crate) b: Poly,
    /// The public randomness `a`.
    pub(crate) a: Poly,
}

impl PublicKey {
    /// The parameters of this key.
    pub fn par(&self) -> &Arc<RlweParameters> {
        &self.par
    }
}

impl FheParametrized for PublicKey {
    type Parameters = RlweParameters;
}

impl FheEncrypter<Plaintext, Ciphertext> for PublicKey {
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

        let ctx = &self.par.ctx;
        let u = Zeroizing::new(Poly::small(
            ctx,
            Representation::Ntt,
            self.par.variance,
            rng,
        )?);
        let e1 = Poly::small(ctx, Representation::Ntt, self.par.variance, rng)?;
        let e1 = Zeroizing::new(self.par.scale_noise(e1));
        let e2 = Poly::small(ctx, Representation::Ntt, self.par.variance, rng)?;
        let e2 = Zeroizing::new(self.par.scale_noise(e2));

        let m = Zeroizing::new(pt.to_poly());
        let mut c0 = u.as_ref() * &self.b;
        c0 += e1.as_ref();
        c0 += m.as_ref();
        let mut c1 = u.as_ref() * &self.a;
        c1 += e2.as_ref();

        // It is now safe to enable variable time computations.
        unsafe {
            c0.allow_variable_time_computations();
            c1.allow_variable_time_computations()
        }

        Ok(Ciphertext {
            par: self.par.clone(),
            seed: None,
            c: vec![c0, c1],
        })
    }
}

impl From<&PublicKey> for proto::PublicKey {
    fn from(pk: &PublicKey) -> Self {
        proto::PublicKey {
            b: pk.b.to_bytes(),
            a: pk.a.to_bytes(),
        }
    }
}

impl Serialize for PublicKey {
    fn to_bytes(&self) -> Vec<u8> {
        proto::PublicKey::from(self).encode_to_vec()
    }
}

impl DeserializeParametrized for PublicKey {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Self::Parameters>) -> Result<Self> {
        let rep: proto::PublicKey = Message::decode(bytes).map_err(|_| Error::SerializationError)?;
        let mut b = Poly::from_bytes(&rep.b, &par.ctx).map_err(Error::MathError)?;
        let mut a = Poly::from_bytes(&rep.a, &par.ctx).map_err(Error::MathError)?;
        b.disallow_variable_time_computations();
        a.disallow_variable_time_computations();
        Ok(Self {
            par: par.clone(),
            b,
            a,
        })
    }
}
