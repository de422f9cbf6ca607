//! X25519 key agreement and session key derivation

use std::sync::Arc;

use shared_protocol::{Identity, PairId};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::kdf::derive_subkey;
use crate::{
    CryptoError, CryptoResult, KDF_CONTEXT, KDF_SUBKEY_ID, PrivateKey, PublicKey,
    SESSION_KEY_SIZE, SessionKeyStore,
};

/// Symmetric key shared by the two identities of a pair
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_SIZE]);

impl SessionKey {
    pub fn from_bytes(bytes: [u8; SESSION_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = Zeroizing::new(hex::decode(s)?);
        let key: [u8; SESSION_KEY_SIZE] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: SESSION_KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.0
    }

    /// Lowercase hex, the form in which the key is stored and fed to RC4
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.0))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Derive the session key for `(self, peer)` with the protocol-wide subkey id.
///
/// Both sides of a pair derive the same key: `derive(skA, pkB) == derive(skB, pkA)`.
pub fn derive_session_key(
    self_private: &PrivateKey,
    peer_public: &PublicKey,
    context: &str,
) -> CryptoResult<SessionKey> {
    derive_session_key_with_subkey(self_private, peer_public, context, KDF_SUBKEY_ID)
}

pub fn derive_session_key_with_subkey(
    self_private: &PrivateKey,
    peer_public: &PublicKey,
    context: &str,
    subkey_id: u64,
) -> CryptoResult<SessionKey> {
    let raw_secret = self_private.inner().diffie_hellman(peer_public.inner());

    // All-zero output means a low-order peer point
    if !raw_secret.was_contributory() {
        warn!("Rejected non-contributory peer public key");
        return Err(CryptoError::InvalidPeerKey);
    }

    let subkey = derive_subkey(raw_secret.as_bytes(), subkey_id, context, SESSION_KEY_SIZE)?;

    let mut key = [0u8; SESSION_KEY_SIZE];
    key.copy_from_slice(&subkey);
    Ok(SessionKey(key))
}

/// Derives session keys and records them in a [`SessionKeyStore`].
///
/// The store is only written after a successful derivation, so abandoning a
/// call part-way leaves no trace.
#[derive(Clone)]
pub struct KeyAgreement {
    store: Arc<dyn SessionKeyStore>,
    context: String,
    subkey_id: u64,
}

impl KeyAgreement {
    pub fn new(store: Arc<dyn SessionKeyStore>) -> Self {
        Self::with_params(store, KDF_CONTEXT, KDF_SUBKEY_ID)
    }

    pub fn with_params(
        store: Arc<dyn SessionKeyStore>,
        context: impl Into<String>,
        subkey_id: u64,
    ) -> Self {
        Self {
            store,
            context: context.into(),
            subkey_id,
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn subkey_id(&self) -> u64 {
        self.subkey_id
    }

    /// Previously established key for the pair, if any
    pub fn cached(&self, local: &Identity, peer: &Identity) -> CryptoResult<Option<SessionKey>> {
        let pair = PairId::new(local, peer);
        let key = self.store.get(&pair)?;
        if key.is_some() {
            debug!("Session key cache hit for {}", pair);
        }
        Ok(key)
    }

    /// Derive the pair's key and store it under the canonical pair id
    pub fn establish(
        &self,
        local: &Identity,
        local_private: &PrivateKey,
        peer: &Identity,
        peer_public: &PublicKey,
    ) -> CryptoResult<SessionKey> {
        let key =
            derive_session_key_with_subkey(local_private, peer_public, &self.context, self.subkey_id)?;

        let pair = PairId::new(local, peer);
        self.store.put(&pair, &key)?;
        debug!("Established session key for {}", pair);

        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyPair, SessionKeyCache};

    #[test]
    fn test_both_sides_derive_same_key() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();

        let ab = derive_session_key(alice.private_key(), bob.public_key(), KDF_CONTEXT).unwrap();
        let ba = derive_session_key(bob.private_key(), alice.public_key(), KDF_CONTEXT).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_rfc7748_shared_secret_feeds_kdf() {
        // RFC 7748 section 6.1
        let alice = PrivateKey::from_hex(
            "77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a",
        )
        .unwrap();
        let bob_public = PublicKey::from_hex(
            "de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f",
        )
        .unwrap();
        let shared =
            hex::decode("4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742")
                .unwrap();

        let expected = derive_subkey(&shared, KDF_SUBKEY_ID, KDF_CONTEXT, SESSION_KEY_SIZE).unwrap();
        let key = derive_session_key(&alice, &bob_public, KDF_CONTEXT).unwrap();
        assert_eq!(key.as_bytes().as_slice(), expected.as_slice());
    }

    #[test]
    fn test_rejects_all_zero_peer_key() {
        let alice = KeyPair::generate().unwrap();
        let zero = PublicKey::from_bytes([0u8; 32]);
        assert!(matches!(
            derive_session_key(alice.private_key(), &zero, KDF_CONTEXT),
            Err(CryptoError::InvalidPeerKey)
        ));
    }

    #[test]
    fn test_rejects_low_order_peer_key() {
        // u = 1 has order 4 on Curve25519
        let mut one = [0u8; 32];
        one[0] = 1;
        let alice = KeyPair::generate().unwrap();
        assert!(matches!(
            derive_session_key(alice.private_key(), &PublicKey::from_bytes(one), KDF_CONTEXT),
            Err(CryptoError::InvalidPeerKey)
        ));
    }

    #[test]
    fn test_different_peers_different_keys() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let carol = KeyPair::generate().unwrap();

        let ab = derive_session_key(alice.private_key(), bob.public_key(), KDF_CONTEXT).unwrap();
        let ac = derive_session_key(alice.private_key(), carol.public_key(), KDF_CONTEXT).unwrap();
        assert_ne!(ab, ac);
    }

    #[test]
    fn test_context_changes_key() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();

        let a = derive_session_key(alice.private_key(), bob.public_key(), "encryption").unwrap();
        let b = derive_session_key(alice.private_key(), bob.public_key(), "messages").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_establish_stores_for_both_sides() {
        let cache = Arc::new(SessionKeyCache::new());
        let agreement = KeyAgreement::new(cache.clone());

        let alice_id = Identity::from("alice");
        let bob_id = Identity::from("bob");
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();

        assert!(agreement.cached(&alice_id, &bob_id).unwrap().is_none());

        let key = agreement
            .establish(&alice_id, alice.private_key(), &bob_id, bob.public_key())
            .unwrap();

        assert_eq!(agreement.cached(&alice_id, &bob_id).unwrap(), Some(key.clone()));
        assert_eq!(agreement.cached(&bob_id, &alice_id).unwrap(), Some(key));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_establish_leaves_store_untouched() {
        let cache = Arc::new(SessionKeyCache::new());
        let agreement = KeyAgreement::new(cache.clone());
        let alice = KeyPair::generate().unwrap();

        let result = agreement.establish(
            &Identity::from("alice"),
            alice.private_key(),
            &Identity::from("mallory"),
            &PublicKey::from_bytes([0u8; 32]),
        );
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_session_key_hex_roundtrip() {
        let key = SessionKey::from_bytes([0xab; 32]);
        let hex = key.to_hex();
        assert_eq!(hex.as_str(), "ab".repeat(32));
        assert_eq!(SessionKey::from_hex(&hex).unwrap(), key);
        assert!(SessionKey::from_hex("abab").is_err());
    }
}
