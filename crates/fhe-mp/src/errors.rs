use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Indicates that an error from the underlying mathematical library was
    /// encountered.
    #[error("{0}")]
    MathError(#[from] fhe_math::Error),

    /// Indicates a serialization error.
    #[error("Serialization error")]
    SerializationError,

    /// Indicates that inputs carry incompatible ring parameters.
    #[error("Mismatched parameters: {0}")]
    ParameterMismatch(String),

    /// Indicates that a rotation index list exceeds the ring dimension.
    #[error("Too many rotation indices: {0} exceeds limit {1}")]
    DimensionOverflow(usize, usize),

    /// Indicates an invalid set of partial decryptions.
    #[error("Malformed partial decryption: {0}")]
    MalformedPartial(String),

    /// Indicates that an operation received no inputs.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Indicates that an underlying sampler failed.
    #[error("Sampler failure: {0}")]
    SamplerFailure(String),

    /// Indicates that too many values were provided.
    #[error("Too many values provided: {0} exceeds limit {1}")]
    TooManyValues(usize, usize),

    /// Indicates a mismatch in the encodings.
    #[error("Encoding mismatch: found {0}, expected {1}")]
    EncodingMismatch(String, String),

    /// Indicates that the encoding is not supported.
    #[error("Does not support {0} encoding")]
    EncodingNotSupported(String),

    /// Indicates a parameter error.
    #[error("{0}")]
    ParametersError(ParametersError),

    /// Indicates that an input is invalid.
    #[error("{0}")]
    UnspecifiedInput(String),
}

/// Separate enum to indicate parameters-related errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParametersError {
    /// Indicates that the degree is invalid.
    #[error("Invalid degree: {0} is not a power of 2 larger than 8")]
    InvalidDegree(usize),

    /// Indicates that the moduli sizes are invalid.
    #[error("Invalid modulus size: {0}, expected an integer between {1} and {2}")]
    InvalidModulusSize(usize, usize, usize),

    /// Indicates that there exists not enough primes of this size.
    #[error("Not enough primes of size {0} for polynomials of degree {1}")]
    NotEnoughPrimes(usize, usize),

    /// Indicates that the plaintext is invalid.
    #[error("{0}")]
    InvalidPlaintext(String),

    /// Indicates that the batch size is invalid.
    #[error("Invalid batch size: {0}, expected a power of 2 at most half the degree")]
    InvalidBatchSize(usize),

    /// Indicates that the noise scale is invalid.
    #[error("Invalid noise scale: {0}, expected a small positive integer")]
    InvalidNoiseScale(u64),

    /// Indicates that too many parameters were specified.
    #[error("{0}")]
    TooManySpecified(String),

    /// Indicates that too few parameters were specified.
    #[error("{0}")]
    TooFewSpecified(String),
}
