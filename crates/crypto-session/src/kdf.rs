//! BLAKE2b subkey derivation.
//!
//! Byte-compatible with libsodium's `crypto_kdf_derive_from_key`:
//!
//! ```text
//! subkey = BLAKE2b(key      = master_key,
//!                  message  = "",
//!                  salt     = LE64(subkey_id) || 0^8,
//!                  personal = context[..8] || 0^8,
//!                  outlen   = subkey_len)
//! ```
//!
//! Only the first [`KDF_CONTEXT_BYTES`] bytes of the context take part in
//! the derivation; shorter contexts are zero padded.

use zeroize::Zeroizing;

use crate::{CryptoError, CryptoResult};

/// Context bytes that reach the BLAKE2b personalisation block
pub const KDF_CONTEXT_BYTES: usize = 8;

/// Required master key length
pub const KDF_MASTER_KEY_BYTES: usize = 32;

pub const KDF_SUBKEY_MIN_BYTES: usize = 16;
pub const KDF_SUBKEY_MAX_BYTES: usize = 64;

const BLAKE2B_SALT_BYTES: usize = 16;
const BLAKE2B_PERSONAL_BYTES: usize = 16;

/// Derive `subkey_len` bytes from `master_key` for `(subkey_id, context)`
pub fn derive_subkey(
    master_key: &[u8],
    subkey_id: u64,
    context: &str,
    subkey_len: usize,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    if master_key.len() != KDF_MASTER_KEY_BYTES {
        return Err(CryptoError::InvalidKeyLength {
            expected: KDF_MASTER_KEY_BYTES,
            actual: master_key.len(),
        });
    }
    if !(KDF_SUBKEY_MIN_BYTES..=KDF_SUBKEY_MAX_BYTES).contains(&subkey_len) {
        return Err(CryptoError::InvalidKdfParameters(format!(
            "subkey length {subkey_len} outside {KDF_SUBKEY_MIN_BYTES}..={KDF_SUBKEY_MAX_BYTES}"
        )));
    }

    let mut salt = [0u8; BLAKE2B_SALT_BYTES];
    salt[..8].copy_from_slice(&subkey_id.to_le_bytes());

    let mut personal = [0u8; BLAKE2B_PERSONAL_BYTES];
    let ctx = context.as_bytes();
    let n = ctx.len().min(KDF_CONTEXT_BYTES);
    personal[..n].copy_from_slice(&ctx[..n]);

    let hash = blake2b_simd::Params::new()
        .hash_length(subkey_len)
        .key(master_key)
        .salt(&salt)
        .personal(&personal)
        .hash(&[]);

    Ok(Zeroizing::new(hash.as_bytes().to_vec()))
}
