//! Traits for conversions parametrized by the scheme parameters.

use crate::bfv::RlweParameters;
use crate::Result;
use std::sync::Arc;

/// Conversions that need the scheme parameters.
pub trait TryConvertFrom<T>
where
    Self: Sized,
{
    /// Attempt to convert `value` under the given parameters.
    fn try_convert_from(value: T, par: &Arc<RlweParameters>) -> Result<Self>;
}
