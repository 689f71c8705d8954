#![crate_name = "fhe_mp"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]
#![doc = include_str!("../README.md")]

mod errors;
mod proto;
mod sampling;

pub mod bfv;
pub mod mp;

pub use errors::{Error, ParametersError, Result};
