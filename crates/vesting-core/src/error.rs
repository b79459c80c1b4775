use thiserror::Error;

/// Failures of the fixed-width integer codec.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The value needs more bytes than the fixed width provides.
    #[error("value needs {needed} bytes but the field is {width} bytes wide")]
    OutOfRange { width: usize, needed: usize },

    /// The buffer handed to the decoder is not exactly the field width.
    #[error("expected a {expected}-byte buffer, got {actual} bytes")]
    InvalidLength { expected: usize, actual: usize },
}

/// Canonical error type exposed by the core primitives.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VestingError {
    /// Numeric field could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Every bump seed produced an on-curve address.
    #[error("unable to find a viable program address bump seed")]
    NoViableBump,

    /// Instruction payload could not be packed or unpacked.
    #[error("invalid instruction: {0}")]
    InvalidInstruction(&'static str),

    /// Account data does not match the expected layout.
    #[error("invalid account data: {0}")]
    AccountData(&'static str),
}
