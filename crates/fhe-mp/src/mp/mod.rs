#![warn(missing_docs, unused_imports)]

//! The threshold multiparty protocol layer.
//!
//! These protocols turn the single-party scheme of [`crate::bfv`] into an
//! N-party threshold scheme in the style of [AJL+12](https://eprint.iacr.org/2011/613):
//! every party holds a local secret share, joint keys are valid under the
//! never-materialized sum of the shares, and decryption requires one *lead*
//! and any number of *follower* partial decryptions to be fused.
//!
//! Joint key material composes additively because all parties reuse the
//! same public randomness `a`: the RLWE equation is linear in the secret,
//! so `Σ (ns·eᵢ − a·sᵢ) = ns·Σeᵢ − a·Σsᵢ` is again a valid key, with noise
//! growing only with the square root of the number of parties. Addition of
//! shares and of evaluation keys is commutative and associative under the
//! same `a`, so callers may reduce contributions in any order.

mod crp;
mod decrypt;
mod eval_key;
mod keygen;
mod rotation;

pub use crp::CommonRandomPoly;
pub use decrypt::{follower_partial, fuse, lead_partial, PartialDecryption, PartyRole};
pub use eval_key::{
    add_eval_keys, add_eval_mult_keys, add_public_keys, linear_key_share, linear_key_share_from,
    mult_eval_key,
};
pub use keygen::{aggregate_keygen, extend_keygen, KeyPair};
pub use rotation::RotationKeyMap;
