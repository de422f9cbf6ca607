//! X25519 key pairs for long-lived identities

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use x25519_dalek::StaticSecret;
use zeroize::Zeroizing;

use crate::{CryptoError, CryptoResult, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};

/// Public half of an identity key pair, safe to publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(x25519_dalek::PublicKey);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(x25519_dalek::PublicKey::from(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; PUBLIC_KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: PUBLIC_KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self::from_bytes(bytes))
    }

    /// Parse the directory representation (lowercase or uppercase hex)
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        self.0.as_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    pub(crate) fn inner(&self) -> &x25519_dalek::PublicKey {
        &self.0
    }
}

/// Private half of an identity key pair.
///
/// Clamping happens inside the scalar multiplication, so the raw bytes are
/// stored as generated. Zeroized on drop.
#[derive(Clone)]
pub struct PrivateKey(StaticSecret);

impl PrivateKey {
    pub fn from_bytes(bytes: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: Zeroizing<[u8; PRIVATE_KEY_SIZE]> =
            Zeroizing::new(bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: PRIVATE_KEY_SIZE,
                actual: bytes.len(),
            })?);
        Ok(Self::from_bytes(*bytes))
    }

    /// Parse the local storage representation
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = Zeroizing::new(hex::decode(s)?);
        Self::from_slice(&bytes)
    }

    pub fn to_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_SIZE]> {
        Zeroizing::new(self.0.to_bytes())
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(*self.to_bytes()))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(x25519_dalek::PublicKey::from(&self.0))
    }

    pub(crate) fn inner(&self) -> &StaticSecret {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// Long-lived key pair owned by a single identity
#[derive(Debug, Clone)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a new key pair from the operating system's CSPRNG
    pub fn generate() -> CryptoResult<Self> {
        Self::generate_with(&mut OsRng)
    }

    /// Generate a new key pair from a caller-supplied CSPRNG.
    ///
    /// Fails with [`CryptoError::EntropyUnavailable`] when the source cannot
    /// produce bytes; there is no fallback.
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> CryptoResult<Self> {
        let mut bytes = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        rng.try_fill_bytes(bytes.as_mut())
            .map_err(|e| CryptoError::EntropyUnavailable(e.to_string()))?;
        Ok(Self::from_private(PrivateKey::from_bytes(*bytes)))
    }

    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    pub fn into_parts(self) -> (PrivateKey, PublicKey) {
        (self.private, self.public)
    }
}
