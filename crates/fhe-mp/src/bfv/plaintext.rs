//! Plaintext type and encoding/decoding.

use crate::{
    bfv::{Encoding, RlweParameters},
    Error, Result,
};
use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use fhe_traits::{FheDecoder, FheEncoder, FheParametrized, FhePlaintext};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use std::sync::Arc;
use zeroize::{Zeroize as _, Zeroizing};
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

/// A plaintext object, that encodes a vector according to a specific
/// encoding.
///
/// With the `Simd` encoding, the input vector (of length at most the batch
/// size `B`) is laid out along the generator-5 slot orbit and replicated
/// cyclically over all slots, so that row-cyclic automorphisms act as
/// rotations modulo `B`.
#[derive(Debug, Clone, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Plaintext {
    /// The parameters of the underlying scheme.
    #[zeroize(skip)]
    pub(crate) par: Arc<RlweParameters>,
    /// The value after encoding.
    pub(crate) value: Box<[u64]>,
    /// The encoding of the plaintext, if known.
    #[zeroize(skip)]
    pub(crate) encoding: Option<Encoding>,
    /// The plaintext as a polynomial.
    pub(crate) poly_ntt: Poly,
}

impl FheParametrized for Plaintext {
    type Parameters = RlweParameters;
}

impl FhePlaintext for Plaintext {
    type Encoding = Encoding;
}

unsafe impl Send for Plaintext {}

impl Plaintext {
    /// The plaintext, scaled into the ciphertext ring.
    pub(crate) fn to_poly(&self) -> Poly {
        let mut m_v = Zeroizing::new(self.value.clone());
        self.par.plaintext.scalar_mul_vec(&mut m_v, self.par.q_mod_t);
        let mut m = Poly::try_convert_from(
            m_v.as_ref(),
            &self.par.ctx,
            false,
            Representation::PowerBasis,
        )
        .unwrap();
        m.change_representation(Representation::Ntt);
        m *= &self.par.delta;
        m
    }

    /// Scale-and-round a raw decryption `c0 + c1·s (+ …)`, in coefficient
    /// format, down to the plaintext modulus.
    pub(crate) fn try_from_scaled(c: &Poly, par: &Arc<RlweParameters>) -> Result<Self> {
        let d = Zeroizing::new(c.scale(&par.scaler)?);
        let q = d.ctx().modulus().clone();
        let t = BigUint::from(par.plaintext());

        let mut w = Vec::with_capacity(par.degree());
        for vi in Vec::<BigUint>::from(d.as_ref()).iter().take(par.degree()) {
            w.push((((vi + &t) % &q) % &t).to_u64().unwrap());
        }

        let mut poly = Poly::try_convert_from(
            w.as_slice(),
            &par.ctx,
            false,
            Representation::PowerBasis,
        )?;
        poly.change_representation(Representation::Ntt);

        Ok(Self {
            par: par.clone(),
            value: w.into_boxed_slice(),
            encoding: None,
            poly_ntt: poly,
        })
    }

    /// Generate a zero plaintext.
    pub fn zero(encoding: Encoding, par: &Arc<RlweParameters>) -> Result<Self> {
        let value = vec![0u64; par.degree()];
        let poly_ntt = Poly::zero(&par.ctx, Representation::Ntt);
        Ok(Self {
            par: par.clone(),
            value: value.into_boxed_slice(),
            encoding: Some(encoding),
            poly_ntt,
        })
    }

    /// The number of ring coefficients carried by this plaintext.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Whether the plaintext is empty. Always false for valid plaintexts.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

// Two plaintexts are equal even if only one of them remembers its encoding.
impl PartialEq for Plaintext {
    fn eq(&self, other: &Self) -> bool {
        let mut eq = self.par == other.par;
        eq &= self.value == other.value;
        if self.encoding.is_some() && other.encoding.is_some() {
            eq &= self.encoding.as_ref().unwrap() == other.encoding.as_ref().unwrap()
        }
        eq
    }
}

impl<'a, const N: usize, T> FheEncoder<&'a [T; N]> for Plaintext
where
    Plaintext: FheEncoder<&'a [T], Error = Error>,
{
    type Error = Error;
    fn try_encode(
        value: &'a [T; N],
        encoding: Encoding,
        par: &Arc<RlweParameters>,
    ) -> Result<Self> {
        Plaintext::try_encode(value.as_ref(), encoding, par)
    }
}

impl<'a, T> FheEncoder<&'a Vec<T>> for Plaintext
where
    Plaintext: FheEncoder<&'a [T], Error = Error>,
{
    type Error = Error;
    fn try_encode(
        value: &'a Vec<T>,
        encoding: Encoding,
        par: &Arc<RlweParameters>,
    ) -> Result<Self> {
        Plaintext::try_encode(value.as_ref(), encoding, par)
    }
}

impl<'a> FheEncoder<&'a [u64]> for Plaintext {
    type Error = Error;
    fn try_encode(value: &'a [u64], encoding: Encoding, par: &Arc<RlweParameters>) -> Result<Self> {
        let mut v = vec![0u64; par.degree()];
        match encoding {
            Encoding::Poly => {
                if value.len() > par.degree() {
                    return Err(Error::TooManyValues(value.len(), par.degree()));
                }
                v[..value.len()].copy_from_slice(value);
            }
            Encoding::Simd => {
                if value.len() > par.batch_size() {
                    return Err(Error::TooManyValues(value.len(), par.batch_size()));
                }
                let op = par
                    .op
                    .as_ref()
                    .ok_or(Error::EncodingNotSupported(Encoding::Simd.to_string()))?;
                let batch = par.batch_size();
                let mut padded = Zeroizing::new(vec![0u64; batch]);
                padded[..value.len()].copy_from_slice(value);
                for i in 0..par.degree() {
                    v[par.slot_index_map[i]] = padded[i % batch];
                }
                op.backward(&mut v);
            }
        };

        let mut poly = Poly::try_convert_from(&v, &par.ctx, false, Representation::PowerBasis)?;
        poly.change_representation(Representation::Ntt);

        Ok(Self {
            par: par.clone(),
            value: v.into(),
            encoding: Some(encoding),
            poly_ntt: poly,
        })
    }
}

impl<'a> FheEncoder<&'a [i64]> for Plaintext {
    type Error = Error;
    fn try_encode(value: &'a [i64], encoding: Encoding, par: &Arc<RlweParameters>) -> Result<Self> {
        let w = Zeroizing::new(par.plaintext.reduce_vec_i64(value));
        Plaintext::try_encode(w.as_ref() as &[u64], encoding, par)
    }
}

impl FheDecoder<Plaintext> for Vec<u64> {
    type Error = Error;

    fn try_decode<O>(pt: &Plaintext, encoding: O) -> Result<Vec<u64>>
    where
        O: Into<Option<Encoding>>,
    {
        let encoding = encoding.into();
        let enc: Encoding;
        if pt.encoding.is_none() && encoding.is_none() {
            return Err(Error::UnspecifiedInput("No encoding specified".to_string()));
        } else if pt.encoding.is_some() {
            enc = pt.encoding.as_ref().unwrap().clone();
            if let Some(arg_enc) = encoding {
                if arg_enc != enc {
                    return Err(Error::EncodingMismatch(arg_enc.into(), enc.into()));
                }
            }
        } else {
            enc = encoding.unwrap();
        }

        let mut w = pt.value.to_vec();

        match enc {
            Encoding::Poly => Ok(w),
            Encoding::Simd => {
                if let Some(op) = &pt.par.op {
                    op.forward(&mut w);
                    let mut slots = vec![0u64; pt.par.batch_size()];
                    for i in 0..slots.len() {
                        slots[i] = w[pt.par.slot_index_map[i]];
                    }
                    w.zeroize();
                    Ok(slots)
                } else {
                    Err(Error::EncodingNotSupported(Encoding::Simd.to_string()))
                }
            }
        }
    }
}

impl FheDecoder<Plaintext> for Vec<i64> {
    type Error = Error;

    fn try_decode<E>(pt: &Plaintext, encoding: E) -> Result<Vec<i64>>
    where
        E: Into<Option<Encoding>>,
    {
        let v = Vec::<u64>::try_decode(pt, encoding)?;
        Ok(unsafe { pt.par.plaintext.center_vec_vt(&v) })
    }
}

#[cfg(test)]
mod tests {
    use super::{Encoding, Plaintext};
    use crate::bfv::RlweParameters;
    use fhe_traits::{FheDecoder, FheEncoder};
    use rand::rng;
    use std::error::Error;

    #[test]
    fn try_encode() -> Result<(), Box<dyn Error>> {
        let mut rng = rng();
        let params = RlweParameters::default_arc(2, 16);
        let a = params.plaintext.random_vec(params.degree(), &mut rng);

        let plaintext = Plaintext::try_encode(&[0u64; 17], Encoding::Poly, &params);
        assert!(plaintext.is_err());

        let plaintext = Plaintext::try_encode(&a, Encoding::Poly, &params);
        assert!(plaintext.is_ok());

        // Simd encoding accepts at most batch_size values.
        let plaintext = Plaintext::try_encode(&a, Encoding::Simd, &params);
        assert!(plaintext.is_err());

        let b = params.plaintext.random_vec(params.batch_size(), &mut rng);
        let plaintext = Plaintext::try_encode(&b, Encoding::Simd, &params);
        assert!(plaintext.is_ok());

        let plaintext = Plaintext::try_encode(&[1u64], Encoding::Poly, &params);
        assert!(plaintext.is_ok());

        Ok(())
    }

    #[test]
    fn encode_decode_roundtrip() -> Result<(), Box<dyn Error>> {
        let mut rng = rng();
        let params = RlweParameters::default_arc(2, 16);

        let a = params.plaintext.random_vec(params.degree(), &mut rng);
        let pt = Plaintext::try_encode(&a, Encoding::Poly, &params)?;
        assert_eq!(Vec::<u64>::try_decode(&pt, Encoding::Poly)?, a);

        let b = params.plaintext.random_vec(params.batch_size(), &mut rng);
        let pt = Plaintext::try_encode(&b, Encoding::Simd, &params)?;
        assert_eq!(Vec::<u64>::try_decode(&pt, Encoding::Simd)?, b);

        // Shorter vectors are padded with zeros up to the batch size.
        let pt = Plaintext::try_encode(&[1u64, 2, 3], Encoding::Simd, &params)?;
        let mut expected = vec![0u64; params.batch_size()];
        expected[..3].copy_from_slice(&[1, 2, 3]);
        assert_eq!(Vec::<u64>::try_decode(&pt, Encoding::Simd)?, expected);

        Ok(())
    }

    #[test]
    fn encode_decode_signed() -> Result<(), Box<dyn Error>> {
        let params = RlweParameters::default_arc(2, 16);
        let a: Vec<i64> = vec![-1, 0, 1, -2, 2, 0, 0, 0];
        let pt = Plaintext::try_encode(&a, Encoding::Simd, &params)?;
        assert_eq!(Vec::<i64>::try_decode(&pt, Encoding::Simd)?, a);
        Ok(())
    }
}
