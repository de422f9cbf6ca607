//! Crypto Session - End-to-End Encryption for Ledgerchat
//!
//! X25519 key agreement, a BLAKE2b subkey KDF compatible with libsodium's
//! `crypto_kdf`, an RC4 stream cipher and the hex envelope written to the
//! ledger.

mod agreement;
mod cache;
mod error;
mod keys;

#[cfg(test)]
mod proptests;

pub mod envelope;
pub mod kdf;
pub mod rc4;

pub use agreement::*;
pub use cache::*;
pub use error::*;
pub use keys::*;

/// Public key size (256 bits / 32 bytes)
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Private key size (256 bits / 32 bytes)
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Session key size (256 bits / 32 bytes)
pub const SESSION_KEY_SIZE: usize = 32;

/// Domain-separation context for session key derivation
pub const KDF_CONTEXT: &str = "encryption";

/// Subkey id for session key derivation
pub const KDF_SUBKEY_ID: u64 = 1;
