//! Session key storage keyed by unordered identity pair

use std::collections::HashMap;

use parking_lot::RwLock;
use shared_protocol::PairId;

use crate::{CryptoResult, SessionKey};

/// Storage for derived session keys.
///
/// Implementations may be in-memory or persisted. `put` for an existing pair
/// overwrites; callers only ever write the output of the same deterministic
/// derivation, so last-writer-wins is harmless.
pub trait SessionKeyStore: Send + Sync {
    fn get(&self, pair: &PairId) -> CryptoResult<Option<SessionKey>>;

    fn put(&self, pair: &PairId, key: &SessionKey) -> CryptoResult<()>;
}

/// In-memory session key cache. Unbounded; entries live until the process exits.
#[derive(Default)]
pub struct SessionKeyCache {
    entries: RwLock<HashMap<PairId, SessionKey>>,
}

impl SessionKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, pair: &PairId) -> bool {
        self.entries.read().contains_key(pair)
    }
}

impl SessionKeyStore for SessionKeyCache {
    fn get(&self, pair: &PairId) -> CryptoResult<Option<SessionKey>> {
        Ok(self.entries.read().get(pair).cloned())
    }

    fn put(&self, pair: &PairId, key: &SessionKey) -> CryptoResult<()> {
        self.entries.write().insert(pair.clone(), key.clone());
        Ok(())
    }
}
