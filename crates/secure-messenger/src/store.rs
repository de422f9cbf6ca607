//! Local key storage.
//!
//! Private keys never leave these stores. [`FileKeyStore`] persists both
//! private keys and derived session keys to a single JSON document so that a
//! restarted client does not need to re-derive anything.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crypto_session::{CryptoError, CryptoResult, PrivateKey, SessionKey, SessionKeyStore};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_protocol::{Identity, PairId};
use tracing::debug;
use zeroize::Zeroize;

use crate::{MessengerError, MessengerResult};

/// Storage for identity private keys
pub trait PrivateKeyStore: Send + Sync {
    fn private_key(&self, identity: &Identity) -> MessengerResult<Option<PrivateKey>>;

    fn store_private_key(&self, identity: &Identity, key: &PrivateKey) -> MessengerResult<()>;
}

/// Process-local private key store
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<Identity, PrivateKey>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrivateKeyStore for MemoryKeyStore {
    fn private_key(&self, identity: &Identity) -> MessengerResult<Option<PrivateKey>> {
        Ok(self.keys.read().get(identity).cloned())
    }

    fn store_private_key(&self, identity: &Identity, key: &PrivateKey) -> MessengerResult<()> {
        self.keys.write().insert(identity.clone(), key.clone());
        Ok(())
    }
}

/// On-disk document; all key material is lowercase hex
#[derive(Clone, Default, Serialize, Deserialize)]
struct KeyFile {
    #[serde(default)]
    private_keys: BTreeMap<Identity, String>,
    /// Indexed by the pair's low identity, then its high identity
    #[serde(default)]
    session_keys: BTreeMap<Identity, BTreeMap<Identity, String>>,
}

impl Drop for KeyFile {
    fn drop(&mut self) {
        for value in self.private_keys.values_mut() {
            value.zeroize();
        }
        for inner in self.session_keys.values_mut() {
            for value in inner.values_mut() {
                value.zeroize();
            }
        }
    }
}

/// JSON file-backed store for private keys and session keys
pub struct FileKeyStore {
    path: PathBuf,
    state: RwLock<KeyFile>,
}

impl FileKeyStore {
    /// Open the store at `path`, creating an empty one if it does not exist
    pub fn open(path: impl AsRef<Path>) -> MessengerResult<Self> {
        let path = path.as_ref().to_path_buf();

        let state = if path.exists() {
            let data = fs::read_to_string(&path)
                .map_err(|e| MessengerError::Storage(format!("{}: {}", path.display(), e)))?;
            serde_json::from_str(&data)
                .map_err(|e| MessengerError::Storage(format!("{}: {}", path.display(), e)))?
        } else {
            KeyFile::default()
        };

        debug!("Opened key store at {}", path.display());

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write to a sibling temp file, then rename over the target.
    ///
    /// Blocks on file I/O and `fsync`; the caller holds the state write lock
    /// for the duration so concurrent updates cannot interleave on disk.
    fn persist(&self, state: &KeyFile) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut data = serde_json::to_vec_pretty(state).map_err(std::io::Error::other)?;
        let tmp = self.path.with_extension("tmp");
        let result = (|| {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&data)?;
            file.sync_all()
        })()
        .map_err(|e| std::io::Error::new(e.kind(), format!("{}: {}", tmp.display(), e)))
        .and_then(|()| {
            fs::rename(&tmp, &self.path).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("{} -> {}: {}", tmp.display(), self.path.display(), e),
                )
            })
        });
        data.zeroize();
        result
    }

    /// Apply `update` to a copy of the document, persist it, and only then
    /// replace the in-memory state. A failed write leaves the store as it was.
    fn update(&self, update: impl FnOnce(&mut KeyFile)) -> std::io::Result<()> {
        let mut state = self.state.write();
        let mut next = state.clone();
        update(&mut next);
        self.persist(&next)?;
        *state = next;
        Ok(())
    }
}

impl PrivateKeyStore for FileKeyStore {
    fn private_key(&self, identity: &Identity) -> MessengerResult<Option<PrivateKey>> {
        let state = self.state.read();
        match state.private_keys.get(identity) {
            Some(hex) => Ok(Some(PrivateKey::from_hex(hex).map_err(|e| {
                MessengerError::Storage(format!("corrupt private key for {identity}: {e}"))
            })?)),
            None => Ok(None),
        }
    }

    fn store_private_key(&self, identity: &Identity, key: &PrivateKey) -> MessengerResult<()> {
        self.update(|doc| {
            doc.private_keys
                .insert(identity.clone(), key.to_hex().to_string());
        })
        .map_err(|e| MessengerError::Storage(e.to_string()))
    }
}

impl SessionKeyStore for FileKeyStore {
    fn get(&self, pair: &PairId) -> CryptoResult<Option<SessionKey>> {
        let state = self.state.read();
        match state
            .session_keys
            .get(pair.low())
            .and_then(|inner| inner.get(pair.high()))
        {
            Some(hex) => SessionKey::from_hex(hex)
                .map(Some)
                .map_err(|e| CryptoError::Storage(format!("corrupt session key for {pair}: {e}"))),
            None => Ok(None),
        }
    }

    fn put(&self, pair: &PairId, key: &SessionKey) -> CryptoResult<()> {
        self.update(|doc| {
            doc.session_keys
                .entry(pair.low().clone())
                .or_default()
                .insert(pair.high().clone(), key.to_hex().to_string());
        })
        .map_err(|e| CryptoError::Storage(e.to_string()))
    }
}
