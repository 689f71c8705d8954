//! Wire-format messages for parameters, keys and ciphertexts.
//!
//! The byte layout of individual ring elements is delegated to the
//! `fhe-math` polynomial codec; these messages only fix the ordering
//! contracts: public keys serialize `(b, a)` in that order, key-switching
//! keys a leading digit count followed by the `a` and `b` vectors, and
//! automorphism key maps their entries in ascending index order.

/// Scheme parameters.
#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct Parameters {
    #[prost(uint32, tag = "1")]
    pub degree: u32,
    #[prost(uint64, tag = "2")]
    pub plaintext: u64,
    #[prost(uint64, repeated, tag = "3")]
    pub moduli: ::prost::alloc::vec::Vec<u64>,
    #[prost(uint32, tag = "4")]
    pub variance: u32,
    #[prost(uint64, tag = "5")]
    pub noise_scale: u64,
    #[prost(uint64, tag = "6")]
    pub smudging_deviation: u64,
    #[prost(uint32, tag = "7")]
    pub batch_size: u32,
    #[prost(uint32, tag = "8")]
    pub secret_distribution: u32,
    #[prost(uint32, tag = "9")]
    pub scheme: u32,
}

/// A public key, as the pair `(b, a)`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct PublicKey {
    #[prost(bytes = "vec", tag = "1")]
    pub b: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub a: ::prost::alloc::vec::Vec<u8>,
}

/// A key-switching key: digit count, then the `a` and `b` digit vectors.
///
/// When the `a` vector was derived from a seed, the seed is transmitted
/// instead of the vector.
#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct KeySwitchingKey {
    #[prost(uint32, tag = "1")]
    pub len: u32,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub a: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub b: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", tag = "4")]
    pub seed: ::prost::alloc::vec::Vec<u8>,
}

/// A ciphertext, as its list of components.
#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct Ciphertext {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub c: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

/// One entry of an automorphism key map.
#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct RotationKeyEntry {
    #[prost(uint32, tag = "1")]
    pub index: u32,
    #[prost(message, optional, tag = "2")]
    pub key: ::core::option::Option<KeySwitchingKey>,
}

/// An automorphism key map, entries ascending by index.
#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct RotationKeyMap {
    #[prost(message, repeated, tag = "1")]
    pub keys: ::prost::alloc::vec::Vec<RotationKeyEntry>,
}
