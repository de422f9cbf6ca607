//! Hex envelope for ciphertext stored on the ledger.
//!
//! The envelope is the bare ciphertext as lowercase hex. There is no framing
//! and no key material travels with it.

use crate::{CryptoError, CryptoResult};

pub fn encode(ciphertext: &[u8]) -> String {
    hex::encode(ciphertext)
}

/// Decode an envelope. Accepts either case; rejects odd lengths and non-hex
/// characters before any decryption is attempted.
pub fn decode(envelope: &str) -> CryptoResult<Vec<u8>> {
    hex::decode(envelope).map_err(|e| CryptoError::Decode(e.to_string()))
}
