//! External ledger and peer directory interfaces

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use crypto_session::PublicKey;
use parking_lot::RwLock;
use shared_protocol::{Identity, LedgerStats, Message};

use crate::MessengerResult;

/// Read-only lookup from identity to published public key
#[async_trait]
pub trait PeerDirectory: Send + Sync {
    /// `Ok(None)` when the identity has not published a key
    async fn public_key(&self, identity: &Identity) -> MessengerResult<Option<PublicKey>>;
}

/// Untrusted storage for public keys and ciphertext.
///
/// Every call may fail or stall; callers own retry and timeout policy.
#[async_trait]
pub trait Ledger: PeerDirectory {
    async fn publish_public_key(&self, identity: &Identity, key: &PublicKey) -> MessengerResult<()>;

    /// Store a ciphertext and return the timestamp the ledger assigned
    async fn send_ciphertext(
        &self,
        sender: &Identity,
        recipient: &Identity,
        ciphertext: &str,
    ) -> MessengerResult<u64>;

    /// All messages where `identity` is sender or recipient, in ledger order
    async fn fetch_messages(&self, identity: &Identity) -> MessengerResult<Vec<Message>>;

    async fn registered_identities(&self) -> MessengerResult<Vec<Identity>>;
}

/// In-process ledger
#[derive(Default)]
pub struct MemoryLedger {
    keys: RwLock<HashMap<Identity, PublicKey>>,
    /// Registration order, for `registered_identities`
    registrations: RwLock<Vec<Identity>>,
    messages: RwLock<Vec<Message>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            identities: self.keys.read().len(),
            messages: self.messages.read().len(),
        }
    }

    /// Every stored message, in insertion order
    pub fn all_messages(&self) -> Vec<Message> {
        self.messages.read().clone()
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[async_trait]
impl PeerDirectory for MemoryLedger {
    async fn public_key(&self, identity: &Identity) -> MessengerResult<Option<PublicKey>> {
        Ok(self.keys.read().get(identity).copied())
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn publish_public_key(&self, identity: &Identity, key: &PublicKey) -> MessengerResult<()> {
        let previous = self.keys.write().insert(identity.clone(), *key);
        if previous.is_none() {
            self.registrations.write().push(identity.clone());
        }
        Ok(())
    }

    async fn send_ciphertext(
        &self,
        sender: &Identity,
        recipient: &Identity,
        ciphertext: &str,
    ) -> MessengerResult<u64> {
        let timestamp = unix_now();
        self.messages.write().push(Message {
            sender: sender.clone(),
            recipient: recipient.clone(),
            ciphertext: ciphertext.to_string(),
            timestamp,
        });
        Ok(timestamp)
    }

    async fn fetch_messages(&self, identity: &Identity) -> MessengerResult<Vec<Message>> {
        Ok(self
            .messages
            .read()
            .iter()
            .filter(|m| m.involves(identity))
            .cloned()
            .collect())
    }

    async fn registered_identities(&self) -> MessengerResult<Vec<Identity>> {
        Ok(self.registrations.read().clone())
    }
}
