#![warn(missing_docs, unused_imports)]

//! The single-party RLWE substrate the multiparty protocols operate on: a
//! single-level, BFV-flavoured scheme over the `fhe-math` polynomial ring.

mod ciphertext;
mod encoding;
mod keys;
mod ops;
mod parameters;
mod plaintext;

pub mod traits;

pub use ciphertext::Ciphertext;
pub use encoding::Encoding;
pub use keys::{KeySwitchingKey, PublicKey, SecretKey};
pub use ops::Multiplicator;
pub use parameters::{RlweParameters, RlweParametersBuilder, SchemeId, SecretDistribution};
pub use plaintext::Plaintext;
