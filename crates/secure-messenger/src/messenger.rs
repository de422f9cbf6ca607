//! End-to-end encrypted messaging over an untrusted ledger

use std::sync::Arc;

use crypto_session::{KeyAgreement, KeyPair, SessionKey, SessionKeyStore, envelope, rc4};
use serde::{Deserialize, Serialize};
use shared_protocol::{Identity, Message};
use tracing::{debug, info, warn};

use crate::{Ledger, MessengerConfig, MessengerError, MessengerResult, PrivateKeyStore};

/// Which side of a conversation a message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Sent,
    Received,
}

/// A ledger message after decryption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedMessage {
    pub sender: Identity,
    pub recipient: Identity,
    pub timestamp: u64,
    pub direction: Direction,
    pub content: String,
}

/// Client-side messenger.
///
/// Owns no ledger state. Private keys come from a [`PrivateKeyStore`], session
/// keys are cached in a [`SessionKeyStore`], and ciphertext goes through the
/// [`Ledger`].
pub struct SecureMessenger {
    ledger: Arc<dyn Ledger>,
    private_keys: Arc<dyn PrivateKeyStore>,
    agreement: KeyAgreement,
}

impl SecureMessenger {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        private_keys: Arc<dyn PrivateKeyStore>,
        session_keys: Arc<dyn SessionKeyStore>,
        config: MessengerConfig,
    ) -> Self {
        Self {
            ledger,
            private_keys,
            agreement: KeyAgreement::with_params(
                session_keys,
                config.kdf_context,
                config.kdf_subkey_id,
            ),
        }
    }

    /// Generate and store a key pair for `identity` and publish its public key.
    ///
    /// An identity keeps its first key pair: if a private key is already
    /// stored, its public key is republished and returned instead.
    pub async fn register_identity(&self, identity: &Identity) -> MessengerResult<String> {
        let public = match self.private_keys.private_key(identity)? {
            Some(existing) => {
                debug!("Identity {} already has a key pair, republishing", identity);
                existing.public_key()
            }
            None => {
                let pair = KeyPair::generate()?;
                self.private_keys
                    .store_private_key(identity, pair.private_key())?;
                *pair.public_key()
            }
        };

        self.ledger.publish_public_key(identity, &public).await?;
        info!("Registered identity {}", identity);

        Ok(public.to_hex())
    }

    /// Cached session key for the pair, deriving and caching it on first use
    pub async fn session_key(&self, local: &Identity, peer: &Identity) -> MessengerResult<SessionKey> {
        if let Some(key) = self.agreement.cached(local, peer)? {
            return Ok(key);
        }

        let peer_public = self
            .ledger
            .public_key(peer)
            .await?
            .ok_or_else(|| MessengerError::PeerKeyUnavailable(peer.clone()))?;

        let local_private = self
            .private_keys
            .private_key(local)?
            .ok_or_else(|| MessengerError::KeyNotFound(local.clone()))?;

        Ok(self
            .agreement
            .establish(local, &local_private, peer, &peer_public)?)
    }

    /// Encrypt `plaintext` for `peer` and return the hex envelope, without
    /// touching the ledger
    pub async fn encrypt_for(
        &self,
        local: &Identity,
        peer: &Identity,
        plaintext: &[u8],
    ) -> MessengerResult<String> {
        let key = self.session_key(local, peer).await?;
        let ciphertext = rc4::encrypt(cipher_key(&key).as_bytes(), plaintext)?;
        Ok(envelope::encode(&ciphertext))
    }

    /// Encrypt `plaintext` for `peer`, hand it to the ledger and return the
    /// hex ciphertext that was stored
    pub async fn send_secure_message(
        &self,
        local: &Identity,
        peer: &Identity,
        plaintext: &str,
    ) -> MessengerResult<String> {
        let envelope = self.encrypt_for(local, peer, plaintext.as_bytes()).await?;
        self.ledger.send_ciphertext(local, peer, &envelope).await?;
        info!("Sent {} byte message {} -> {}", plaintext.len(), local, peer);
        Ok(envelope)
    }

    /// Decrypt a hex envelope exchanged with `peer` into raw bytes.
    ///
    /// Valid hex under the wrong key yields wrong bytes, not an error.
    pub async fn receive_secure_bytes(
        &self,
        local: &Identity,
        peer: &Identity,
        hex_ciphertext: &str,
    ) -> MessengerResult<Vec<u8>> {
        let ciphertext = envelope::decode(hex_ciphertext)?;
        let key = self.session_key(local, peer).await?;
        Ok(rc4::decrypt(cipher_key(&key).as_bytes(), &ciphertext)?)
    }

    /// Decrypt a hex envelope exchanged with `peer` into text.
    ///
    /// Invalid UTF-8 is replaced rather than reported.
    pub async fn receive_secure_message(
        &self,
        local: &Identity,
        peer: &Identity,
        hex_ciphertext: &str,
    ) -> MessengerResult<String> {
        let bytes = self.receive_secure_bytes(local, peer, hex_ciphertext).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Decrypted history between `local` and `peer`, oldest first
    pub async fn conversation(
        &self,
        local: &Identity,
        peer: &Identity,
    ) -> MessengerResult<Vec<DecryptedMessage>> {
        let mut messages: Vec<Message> = self
            .ledger
            .fetch_messages(local)
            .await?
            .into_iter()
            .filter(|m| m.is_between(local, peer))
            .collect();

        if messages.is_empty() {
            return Ok(Vec::new());
        }

        // Stable sort keeps ledger order for equal timestamps
        messages.sort_by_key(|m| m.timestamp);

        let key = self.session_key(local, peer).await?;
        let cipher_key = cipher_key(&key);

        let mut decrypted = Vec::with_capacity(messages.len());
        for message in messages {
            let ciphertext = match envelope::decode(&message.ciphertext) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(
                        "Skipping undecodable message {} -> {} at {}: {}",
                        message.sender, message.recipient, message.timestamp, e
                    );
                    continue;
                }
            };
            let plaintext = rc4::decrypt(cipher_key.as_bytes(), &ciphertext)?;

            let direction = if &message.sender == local {
                Direction::Sent
            } else {
                Direction::Received
            };

            decrypted.push(DecryptedMessage {
                direction,
                content: String::from_utf8_lossy(&plaintext).into_owned(),
                sender: message.sender,
                recipient: message.recipient,
                timestamp: message.timestamp,
            });
        }

        Ok(decrypted)
    }

    /// Distinct counterparties of every message involving `local`, in order
    /// of first appearance
    pub async fn contacts(&self, local: &Identity) -> MessengerResult<Vec<Identity>> {
        let messages = self.ledger.fetch_messages(local).await?;

        let mut contacts: Vec<Identity> = Vec::new();
        for message in &messages {
            if let Some(other) = message.counterparty(local) {
                if !contacts.contains(other) {
                    contacts.push(other.clone());
                }
            }
        }
        Ok(contacts)
    }

    /// Every registered identity except `local`
    pub async fn directory(&self, local: &Identity) -> MessengerResult<Vec<Identity>> {
        Ok(self
            .ledger
            .registered_identities()
            .await?
            .into_iter()
            .filter(|id| id != local)
            .collect())
    }
}

/// RC4 is keyed with the hex text of the session key, which keeps ciphertext
/// readable by clients that store and pass the key as a hex string
fn cipher_key(key: &SessionKey) -> zeroize::Zeroizing<String> {
    key.to_hex()
}

#[cfg(test)]
mod tests {
    use crypto_session::{PublicKey, SessionKeyCache, derive_session_key};
    use shared_protocol::PairId;

    use super::*;
    use crate::{MemoryKeyStore, MemoryLedger, PeerDirectory};

    struct Fixture {
        ledger: Arc<MemoryLedger>,
        alice: SecureMessenger,
        bob: SecureMessenger,
        alice_keys: Arc<MemoryKeyStore>,
        bob_keys: Arc<MemoryKeyStore>,
        alice_cache: Arc<SessionKeyCache>,
    }

    fn messenger(
        ledger: &Arc<MemoryLedger>,
        keys: &Arc<MemoryKeyStore>,
        cache: &Arc<SessionKeyCache>,
    ) -> SecureMessenger {
        SecureMessenger::new(
            ledger.clone(),
            keys.clone(),
            cache.clone(),
            MessengerConfig::default(),
        )
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(MemoryLedger::new());
        let alice_keys = Arc::new(MemoryKeyStore::new());
        let bob_keys = Arc::new(MemoryKeyStore::new());
        let alice_cache = Arc::new(SessionKeyCache::new());
        let bob_cache = Arc::new(SessionKeyCache::new());

        Fixture {
            alice: messenger(&ledger, &alice_keys, &alice_cache),
            bob: messenger(&ledger, &bob_keys, &bob_cache),
            ledger,
            alice_keys,
            bob_keys,
            alice_cache,
        }
    }

    fn ids() -> (Identity, Identity) {
        (Identity::from("0xA11CE"), Identity::from("0xB0B"))
    }

    #[tokio::test]
    async fn test_rc4_keyed_with_session_key_hex_text() {
        let ledger = Arc::new(MemoryLedger::new());
        let keys = Arc::new(MemoryKeyStore::new());
        let cache = Arc::new(SessionKeyCache::new());
        let (a, b) = ids();
        cache
            .put(&PairId::new(&a, &b), &SessionKey::from_bytes([0xab; 32]))
            .unwrap();
        let alice = messenger(&ledger, &keys, &cache);

        let envelope = alice.encrypt_for(&a, &b, b"hello").await.unwrap();

        // RC4 over the 64 ASCII bytes "abab...ab", not the raw 0xab bytes
        assert_eq!(envelope, "4619b41f7a");
        assert_eq!(
            envelope,
            envelope::encode(&rc4::encrypt("ab".repeat(32).as_bytes(), b"hello").unwrap())
        );
        assert_ne!(
            envelope,
            envelope::encode(&rc4::encrypt(&[0xab; 32], b"hello").unwrap())
        );

        assert_eq!(
            alice.receive_secure_message(&b, &a, "4619b41f7a").await.unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn test_hello_roundtrip() {
        let f = fixture();
        let (a, b) = ids();
        f.alice.register_identity(&a).await.unwrap();
        f.bob.register_identity(&b).await.unwrap();

        let c = f.alice.send_secure_message(&a, &b, "hello").await.unwrap();
        assert_eq!(c.len(), 10);
        assert_eq!(f.bob.receive_secure_message(&b, &a, &c).await.unwrap(), "hello");

        let stored = f.ledger.all_messages();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].ciphertext, c);
    }

    #[tokio::test]
    async fn test_register_returns_published_key() {
        let f = fixture();
        let (a, _) = ids();

        let public_hex = f.alice.register_identity(&a).await.unwrap();
        let private = f.alice_keys.private_key(&a).unwrap().unwrap();

        assert_eq!(public_hex, private.public_key().to_hex());
        assert_eq!(
            f.ledger.public_key(&a).await.unwrap(),
            Some(PublicKey::from_hex(&public_hex).unwrap())
        );
    }

    #[tokio::test]
    async fn test_register_twice_keeps_key_pair() {
        let f = fixture();
        let (a, _) = ids();

        let first = f.alice.register_identity(&a).await.unwrap();
        let second = f.alice.register_identity(&a).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_both_sides_agree_on_session_key() {
        let f = fixture();
        let (a, b) = ids();
        f.alice.register_identity(&a).await.unwrap();
        f.bob.register_identity(&b).await.unwrap();

        let from_alice = f.alice.session_key(&a, &b).await.unwrap();
        let from_bob = f.bob.session_key(&b, &a).await.unwrap();
        assert_eq!(from_alice, from_bob);

        let direct = derive_session_key(
            &f.alice_keys.private_key(&a).unwrap().unwrap(),
            &f.bob_keys.private_key(&b).unwrap().unwrap().public_key(),
            "encryption",
        )
        .unwrap();
        assert_eq!(from_alice, direct);
    }

    #[tokio::test]
    async fn test_session_key_is_cached() {
        let f = fixture();
        let (a, b) = ids();
        f.alice.register_identity(&a).await.unwrap();
        f.bob.register_identity(&b).await.unwrap();

        assert!(f.alice_cache.is_empty());
        f.alice.send_secure_message(&a, &b, "one").await.unwrap();
        assert_eq!(f.alice_cache.len(), 1);
        f.alice.send_secure_message(&a, &b, "two").await.unwrap();
        assert_eq!(f.alice_cache.len(), 1);
    }

    #[tokio::test]
    async fn test_cached_key_used_without_directory() {
        let ledger = Arc::new(MemoryLedger::new());
        let keys = Arc::new(MemoryKeyStore::new());
        let cache = Arc::new(SessionKeyCache::new());
        let (a, b) = ids();

        let key = SessionKey::from_bytes([3u8; 32]);
        cache
            .put(&PairId::new(&a, &b), &key)
            .unwrap();

        // Neither identity has keys anywhere; the cache alone suffices
        let m = messenger(&ledger, &keys, &cache);
        let c = m.send_secure_message(&a, &b, "cached").await.unwrap();
        assert_eq!(m.receive_secure_message(&b, &a, &c).await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn test_peer_without_key() {
        let f = fixture();
        let (a, b) = ids();
        f.alice.register_identity(&a).await.unwrap();

        let err = f.alice.send_secure_message(&a, &b, "hi").await.unwrap_err();
        assert!(matches!(err, MessengerError::PeerKeyUnavailable(ref id) if id == &b));
        assert!(f.ledger.all_messages().is_empty());
    }

    #[tokio::test]
    async fn test_missing_own_private_key() {
        let f = fixture();
        let (a, b) = ids();
        f.bob.register_identity(&b).await.unwrap();

        let err = f.alice.send_secure_message(&a, &b, "hi").await.unwrap_err();
        assert!(matches!(err, MessengerError::KeyNotFound(ref id) if id == &a));
    }

    #[tokio::test]
    async fn test_degenerate_peer_key() {
        let f = fixture();
        let (a, b) = ids();
        f.alice.register_identity(&a).await.unwrap();
        f.ledger
            .publish_public_key(&b, &PublicKey::from_bytes([0u8; 32]))
            .await
            .unwrap();

        let err = f.alice.send_secure_message(&a, &b, "hi").await.unwrap_err();
        assert!(matches!(err, MessengerError::InvalidPeerKey));
        assert!(f.alice_cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_hex_rejected_before_derivation() {
        let f = fixture();
        let (a, b) = ids();

        // No keys registered: decoding must fail first
        let err = f.bob.receive_secure_message(&b, &a, "not-hex").await.unwrap_err();
        assert!(matches!(err, MessengerError::DecodeError(_)));
    }

    #[tokio::test]
    async fn test_empty_message() {
        let f = fixture();
        let (a, b) = ids();
        f.alice.register_identity(&a).await.unwrap();
        f.bob.register_identity(&b).await.unwrap();

        let c = f.alice.send_secure_message(&a, &b, "").await.unwrap();
        assert_eq!(c, "");
        assert_eq!(f.bob.receive_secure_message(&b, &a, "").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_wrong_pair_yields_garbage_not_error() {
        let f = fixture();
        let (a, b) = ids();
        let carol = Identity::from("0xCA201");
        let carol_keys = Arc::new(MemoryKeyStore::new());
        let carol_m = messenger(&f.ledger, &carol_keys, &Arc::new(SessionKeyCache::new()));

        f.alice.register_identity(&a).await.unwrap();
        f.bob.register_identity(&b).await.unwrap();
        carol_m.register_identity(&carol).await.unwrap();

        let c = f.alice.send_secure_message(&a, &b, "for bob only").await.unwrap();
        let bytes = carol_m.receive_secure_bytes(&carol, &a, &c).await.unwrap();
        assert_eq!(bytes.len(), "for bob only".len());
        assert_ne!(bytes, b"for bob only");
    }

    #[tokio::test]
    async fn test_conversation_and_contacts() {
        let f = fixture();
        let (a, b) = ids();
        let carol = Identity::from("0xCA201");
        let carol_m = messenger(
            &f.ledger,
            &Arc::new(MemoryKeyStore::new()),
            &Arc::new(SessionKeyCache::new()),
        );

        f.alice.register_identity(&a).await.unwrap();
        f.bob.register_identity(&b).await.unwrap();
        carol_m.register_identity(&carol).await.unwrap();

        f.alice.send_secure_message(&a, &b, "hi bob").await.unwrap();
        carol_m.send_secure_message(&carol, &a, "hi alice").await.unwrap();
        f.bob.send_secure_message(&b, &a, "hi alice, bob here").await.unwrap();
        f.ledger.send_ciphertext(&b, &a, "zz").await.unwrap();

        let history = f.alice.conversation(&a, &b).await.unwrap();
        let lines: Vec<_> = history
            .iter()
            .map(|m| (m.direction, m.content.as_str()))
            .collect();
        assert_eq!(
            lines,
            vec![
                (Direction::Sent, "hi bob"),
                (Direction::Received, "hi alice, bob here"),
            ]
        );

        let bob_view = f.bob.conversation(&b, &a).await.unwrap();
        assert_eq!(bob_view[0].direction, Direction::Received);
        assert_eq!(bob_view[0].content, "hi bob");

        assert_eq!(f.alice.contacts(&a).await.unwrap(), vec![b.clone(), carol.clone()]);
        assert_eq!(f.alice.directory(&a).await.unwrap(), vec![b, carol]);
    }

    #[tokio::test]
    async fn test_empty_conversation_needs_no_keys() {
        let f = fixture();
        let (a, b) = ids();
        assert!(f.alice.conversation(&a, &b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_context_breaks_decryption() {
        let ledger = Arc::new(MemoryLedger::new());
        let (a, b) = ids();
        let alice = messenger(
            &ledger,
            &Arc::new(MemoryKeyStore::new()),
            &Arc::new(SessionKeyCache::new()),
        );
        let bob = SecureMessenger::new(
            ledger.clone(),
            Arc::new(MemoryKeyStore::new()),
            Arc::new(SessionKeyCache::new()),
            MessengerConfig {
                kdf_context: "other".to_string(),
                ..MessengerConfig::default()
            },
        );
        alice.register_identity(&a).await.unwrap();
        bob.register_identity(&b).await.unwrap();

        let c = alice.send_secure_message(&a, &b, "hello").await.unwrap();
        assert_ne!(bob.receive_secure_message(&b, &a, &c).await.unwrap(), "hello");
    }
}
