// Path: crates/crypto/src/error.rs
//! Errors from this crate's hashing and HD key derivation primitives.

use thiserror::Error;

/// Errors raised by [`crate::algorithms::content_hash`] or [`crate::algorithms::hd`].
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The provided key material is malformed or invalid for the specified algorithm.
    #[error("invalid cryptographic key: {0}")]
    InvalidKey(String),
    /// The provided signature material is malformed or invalid for the specified algorithm.
    #[error("invalid signature format: {0}")]
    InvalidSignature(String),
    /// A hash digest had an unexpected length.
    #[error("invalid hash length: expected {expected}, got {got}")]
    InvalidHashLength {
        /// The expected length in bytes.
        expected: usize,
        /// The actual length in bytes.
        got: usize,
    },
    /// A generic failure in an underlying cryptographic library.
    #[error("cryptographic operation failed: {0}")]
    OperationFailed(String),
    /// The requested cryptographic operation or parameter is not supported by the current context.
    #[error("unsupported cryptographic operation or parameter: {0}")]
    Unsupported(String),
    /// An input to a cryptographic operation was invalid.
    #[error("invalid input for operation: {0}")]
    InvalidInput(String),
}
