//! Error types for hashing and encryption.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while hashing, deriving keys, or encrypting.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Caller-supplied input was empty, malformed, or too short.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The envelope could not be decrypted (wrong entropy, tampering, corrupt padding).
    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("random generator failure: {0}")]
    Random(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),
}

impl CryptoError {
    /// Whether the error is a caller mistake rather than a cryptographic failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            CryptoError::InvalidArgument(_) | CryptoError::UnknownAlgorithm(_)
        )
    }
}
