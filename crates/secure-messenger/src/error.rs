//! Messenger error types

use crypto_session::CryptoError;
use shared_protocol::Identity;
use thiserror::Error;

/// Errors surfaced by send/receive. None of them are retried internally.
#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Private key not found for {0}")]
    KeyNotFound(Identity),

    #[error("Peer {0} has not published a public key")]
    PeerKeyUnavailable(Identity),

    #[error("Invalid peer public key")]
    InvalidPeerKey,

    #[error("Ciphertext is not valid hex: {0}")]
    DecodeError(String),

    #[error("Crypto error: {0}")]
    Crypto(CryptoError),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<CryptoError> for MessengerError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::EntropyUnavailable(reason) => MessengerError::EntropyUnavailable(reason),
            CryptoError::InvalidPeerKey => MessengerError::InvalidPeerKey,
            CryptoError::Decode(reason) => MessengerError::DecodeError(reason),
            CryptoError::Storage(reason) => MessengerError::Storage(reason),
            other => MessengerError::Crypto(other),
        }
    }
}

pub type MessengerResult<T> = Result<T, MessengerError>;
