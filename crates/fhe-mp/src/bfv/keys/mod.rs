//! Keys for the threshold RLWE scheme.

mod key_switching_key;
mod public_key;
mod secret_key;

pub use key_switching_key::KeySwitchingKey;
pub use public_key::PublicKey;
pub use secret_key::SecretKey;
