//! Ledger records and the HTTP bodies used to exchange them

use serde::{Deserialize, Serialize};

use crate::{Identity, PUBLIC_KEY_HEX_LEN, ProtocolError, ProtocolResult};

/// A ciphertext record as stored by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Identity,
    pub recipient: Identity,
    /// Hex-encoded ciphertext
    pub ciphertext: String,
    /// Seconds since the Unix epoch, assigned by the ledger
    pub timestamp: u64,
}

impl Message {
    /// Whether `identity` sent or received this message
    pub fn involves(&self, identity: &Identity) -> bool {
        &self.sender == identity || &self.recipient == identity
    }

    /// Whether this message was exchanged between `a` and `b`, in either direction
    pub fn is_between(&self, a: &Identity, b: &Identity) -> bool {
        (&self.sender == a && &self.recipient == b) || (&self.sender == b && &self.recipient == a)
    }

    /// The other party from the point of view of `identity`
    pub fn counterparty(&self, identity: &Identity) -> Option<&Identity> {
        if &self.sender == identity {
            Some(&self.recipient)
        } else if &self.recipient == identity {
            Some(&self.sender)
        } else {
            None
        }
    }

    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(data)?)
    }
}

/// Body of `PUT /identities/{identity}/public-key`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishKeyRequest {
    /// Hex-encoded X25519 public key
    pub public_key: String,
}

impl PublishKeyRequest {
    pub fn validate(&self) -> ProtocolResult<()> {
        validate_public_key_hex(&self.public_key)
    }
}

/// Response of `GET /identities/{identity}/public-key`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    pub identity: Identity,
    pub public_key: String,
}

/// Body of `POST /messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub sender: Identity,
    pub recipient: Identity,
    pub ciphertext: String,
}

impl SendMessageRequest {
    pub fn validate(&self, max_hex_len: usize) -> ProtocolResult<()> {
        if self.ciphertext.len() > max_hex_len {
            return Err(ProtocolError::MessageTooLarge {
                size: self.ciphertext.len(),
                max: max_hex_len,
            });
        }
        if !is_hex(&self.ciphertext) {
            return Err(ProtocolError::InvalidCiphertext);
        }
        Ok(())
    }
}

/// Response of `POST /messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub timestamp: u64,
}

/// Response of `GET /stats`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerStats {
    pub identities: usize,
    pub messages: usize,
}

/// Error body returned by the ledger server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Even-length string of hex digits (either case)
/// Even-length string of hex digits, either case
pub fn is_hex(s: &str) -> bool {
    hex::decode(s).is_ok()
}

pub fn validate_public_key_hex(s: &str) -> ProtocolResult<()> {
    if s.len() != PUBLIC_KEY_HEX_LEN || !is_hex(s) {
        return Err(ProtocolError::InvalidPublicKey(s.to_string()));
    }
    Ok(())
}
