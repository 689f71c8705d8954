//! The encoding type for plaintexts.

use std::fmt::Display;

use fhe_traits::FhePlaintextEncoding;

/// An encoding for the plaintext.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Encoding {
    /// A Poly encoding encodes a vector as coefficients of a polynomial;
    /// homomorphic operations are therefore polynomial operations.
    Poly,
    /// A Simd encoding encodes a vector of at most `batch_size` values so
    /// that homomorphic operations are component-wise operations on the
    /// slots. The Simd encoding requires that the plaintext modulus is
    /// congruent to 1 modulo twice the degree of the underlying polynomial.
    Simd,
}

impl Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<Encoding> for String {
    fn from(e: Encoding) -> Self {
        String::from(&e)
    }
}

impl From<&Encoding> for String {
    fn from(e: &Encoding) -> Self {
        format!("{e:?}")
    }
}

impl FhePlaintextEncoding for Encoding {}
