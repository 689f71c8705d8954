//! Operations over ciphertexts.

use crate::bfv::{Ciphertext, KeySwitchingKey, RlweParameters};
use crate::{Error, Result};
use fhe_math::rq::Representation;
use itertools::izip;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::sync::Arc;

impl AddAssign<&Ciphertext> for Ciphertext {
    fn add_assign(&mut self, rhs: &Ciphertext) {
        assert_eq!(self.par, rhs.par, "Incompatible parameters");
        assert_eq!(self.c.len(), rhs.c.len(), "Incompatible number of parts");
        izip!(self.c.iter_mut(), rhs.c.iter()).for_each(|(c1i, c2i)| *c1i += c2i);
        self.seed = None;
    }
}

impl Add<&Ciphertext> for &Ciphertext {
    type Output = Ciphertext;

    fn add(self, rhs: &Ciphertext) -> Ciphertext {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl SubAssign<&Ciphertext> for Ciphertext {
    fn sub_assign(&mut self, rhs: &Ciphertext) {
        assert_eq!(self.par, rhs.par, "Incompatible parameters");
        assert_eq!(self.c.len(), rhs.c.len(), "Incompatible number of parts");
        izip!(self.c.iter_mut(), rhs.c.iter()).for_each(|(c1i, c2i)| *c1i -= c2i);
        self.seed = None;
    }
}

impl Sub<&Ciphertext> for &Ciphertext {
    type Output = Ciphertext;

    fn sub(self, rhs: &Ciphertext) -> Ciphertext {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

/// Multiplier of two degree-1 ciphertexts.
///
/// The tensor product is computed over an extended RNS basis roughly 60
/// bits larger than the ciphertext modulus, then scaled back by `t/Q`.
/// When a relinearization key is attached, the degree-2 component is key
/// switched back onto the joint secret.
#[derive(Debug)]
pub struct Multiplicator {
    par: Arc<RlweParameters>,
    rk: Option<KeySwitchingKey>,
}

impl Multiplicator {
    /// Create a multiplicator without relinearization; products keep their
    /// degree-2 component.
    pub fn new(par: &Arc<RlweParameters>) -> Self {
        Self {
            par: par.clone(),
            rk: None,
        }
    }

    /// Attach a relinearization key. The key must switch the square of the
    /// (joint) secret back onto the secret itself.
    pub fn enable_relinearization(&mut self, rk: KeySwitchingKey) -> Result<()> {
        if rk.par != self.par {
            return Err(Error::ParameterMismatch(
                "The relinearization key uses different parameters".to_string(),
            ));
        }
        self.rk = Some(rk);
        Ok(())
    }

    /// Multiply two ciphertexts.
    pub fn multiply(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<Ciphertext> {
        if lhs.par != self.par || rhs.par != self.par {
            return Err(Error::ParameterMismatch(
                "Ciphertexts do not have the same parameters".to_string(),
            ));
        }
        if lhs.c.len() != 2 || rhs.c.len() != 2 {
            return Err(Error::UnspecifiedInput(
                "Multiplication can only be performed on ciphertexts of size 2".to_string(),
            ));
        }

        let mul = &self.par.mul_params;

        // Extend to the multiplication basis.
        let c00 = lhs.c[0].scale(&mul.extender)?;
        let c01 = lhs.c[1].scale(&mul.extender)?;
        let c10 = rhs.c[0].scale(&mul.extender)?;
        let c11 = rhs.c[1].scale(&mul.extender)?;

        // Tensor product.
        let mut c0 = &c00 * &c10;
        let mut c1 = &c00 * &c11;
        c1 += &(&c01 * &c10);
        let mut c2 = &c01 * &c11;
        c0.change_representation(Representation::PowerBasis);
        c1.change_representation(Representation::PowerBasis);
        c2.change_representation(Representation::PowerBasis);

        // Scale by t/Q back to the ciphertext basis.
        let mut c0 = c0.scale(&mul.down_scaler)?;
        let mut c1 = c1.scale(&mul.down_scaler)?;
        let c2 = c2.scale(&mul.down_scaler)?;

        c0.change_representation(Representation::Ntt);
        c1.change_representation(Representation::Ntt);

        let mut c = vec![c0, c1];
        if let Some(rk) = self.rk.as_ref() {
            let (c0r, c1r) = rk.key_switch(&c2)?;
            c[0] += &c0r;
            c[1] += &c1r;
        } else {
            let mut c2 = c2;
            c2.change_representation(Representation::Ntt);
            c.push(c2);
        }

        Ok(Ciphertext {
            par: self.par.clone(),
            seed: None,
            c,
        })
    }
}
