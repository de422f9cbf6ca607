//! Error types for the protocol

use thiserror::Error;

/// Protocol error
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid identity: {0:?}")]
    InvalidIdentity(String),

    #[error("Invalid public key: {0:?}")]
    InvalidPublicKey(String),

    #[error("Ciphertext is not a hex string")]
    InvalidCiphertext,

    #[error("Message too large: {size} hex chars (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type alias for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
