//! Crypto session error types

use thiserror::Error;

/// Cryptographic operation error
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Invalid peer public key: key agreement produced a degenerate shared secret")]
    InvalidPeerKey,

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Stream cipher key must not be empty")]
    EmptyCipherKey,

    #[error("Invalid KDF parameters: {0}")]
    InvalidKdfParameters(String),

    #[error("Key storage error: {0}")]
    Storage(String),
}

impl From<hex::FromHexError> for CryptoError {
    fn from(e: hex::FromHexError) -> Self {
        CryptoError::Decode(e.to_string())
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
