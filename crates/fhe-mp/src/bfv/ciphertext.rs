//! Ciphertext type for the threshold RLWE scheme.

use crate::bfv::RlweParameters;
use crate::proto;
use crate::{Error, Result};
use fhe_math::rq::{Poly, Representation};
use fhe_traits::{
    DeserializeParametrized, DeserializeWithContext, FheCiphertext, FheParametrized, Serialize,
};
use prost::Message;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A ciphertext encrypting a plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    /// The parameters of the underlying scheme.
    pub(crate) par: Arc<RlweParameters>,

    /// The seed that generated the polynomial c1 in a fresh ciphertext.
    pub(crate) seed: Option<<ChaCha8Rng as SeedableRng>::Seed>,

    /// The ciphertext elements.
    pub(crate) c: Vec<Poly>,
}

impl Deref for Ciphertext {
    type Target = [Poly];

    fn deref(&self) -> &Self::Target {
        &self.c
    }
}

impl DerefMut for Ciphertext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.c
    }
}

impl Ciphertext {
    /// Create a ciphertext from a vector of polynomials.
    ///
    /// A ciphertext must contain at least two polynomials, all in Ntt
    /// representation over the ciphertext context.
    pub fn new(c: Vec<Poly>, par: &Arc<RlweParameters>) -> Result<Self> {
        if c.len() < 2 {
            return Err(Error::EmptyInput(
                "A ciphertext must contain at least two polynomials".to_string(),
            ));
        }

        for ci in c.iter() {
            if ci.representation() != &Representation::Ntt {
                return Err(Error::MathError(fhe_math::Error::IncorrectRepresentation(
                    ci.representation().clone(),
                    Representation::Ntt,
                )));
            }
            if ci.ctx() != &par.ctx {
                return Err(Error::MathError(fhe_math::Error::InvalidContext));
            }
        }

        Ok(Self {
            par: par.clone(),
            seed: None,
            c,
        })
    }

    /// Generate a ciphertext of zero polynomials.
    pub fn zero(par: &Arc<RlweParameters>) -> Self {
        Self {
            par: par.clone(),
            seed: None,
            c: vec![
                Poly::zero(&par.ctx, Representation::Ntt),
                Poly::zero(&par.ctx, Representation::Ntt),
            ],
        }
    }

    /// The parameters of this ciphertext.
    pub fn par(&self) -> &Arc<RlweParameters> {
        &self.par
    }
}

impl FheParametrized for Ciphertext {
    type Parameters = RlweParameters;
}

impl FheCiphertext for Ciphertext {}

impl Serialize for Ciphertext {
    fn to_bytes(&self) -> Vec<u8> {
        proto::Ciphertext {
            c: self.c.iter().map(|ci| ci.to_bytes()).collect(),
        }
        .encode_to_vec()
    }
}

impl DeserializeParametrized for Ciphertext {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Self::Parameters>) -> Result<Self> {
        let rep: proto::Ciphertext = Message::decode(bytes).map_err(|_| Error::SerializationError)?;
        let c = rep
            .c
            .iter()
            .map(|ci| Poly::from_bytes(ci, &par.ctx).map_err(Error::MathError))
            .collect::<Result<Vec<Poly>>>()?;
        Ciphertext::new(c, par)
    }
}

#[cfg(test)]
mod tests {
    use super::Ciphertext;
    use crate::bfv::RlweParameters;
    use fhe_math::rq::{Poly, Representation};
    use fhe_traits::{DeserializeParametrized, Serialize};
    use rand::rng;
    use std::error::Error;

    #[test]
    fn constructor() -> Result<(), Box<dyn Error>> {
        let mut rng = rng();
        let params = RlweParameters::default_arc(2, 16);

        let p0 = Poly::random(&params.ctx, Representation::Ntt, &mut rng);
        let p1 = Poly::random(&params.ctx, Representation::Ntt, &mut rng);
        assert!(Ciphertext::new(vec![p0.clone(), p1.clone()], &params).is_ok());
        assert!(Ciphertext::new(vec![p0.clone()], &params).is_err());

        let mut p2 = p0.clone();
        p2.change_representation(Representation::PowerBasis);
        assert!(Ciphertext::new(vec![p2, p1], &params).is_err());
        Ok(())
    }

    #[test]
    fn serialize() -> Result<(), Box<dyn Error>> {
        let mut rng = rng();
        let params = RlweParameters::default_arc(2, 16);
        let ct = Ciphertext::new(
            vec![
                Poly::random(&params.ctx, Representation::Ntt, &mut rng),
                Poly::random(&params.ctx, Representation::Ntt, &mut rng),
            ],
            &params,
        )?;
        assert_eq!(ct, Ciphertext::from_bytes(&ct.to_bytes(), &params)?);
        Ok(())
    }
}
