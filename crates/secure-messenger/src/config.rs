//! Messenger configuration

use crypto_session::{KDF_CONTEXT, KDF_SUBKEY_ID};
use serde::{Deserialize, Serialize};

/// Protocol parameters for session key derivation.
///
/// Both parties of a conversation must use the same values or their session
/// keys will not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessengerConfig {
    /// KDF domain-separation context
    pub kdf_context: String,
    /// KDF subkey id
    pub kdf_subkey_id: u64,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            kdf_context: KDF_CONTEXT.to_string(),
            kdf_subkey_id: KDF_SUBKEY_ID,
        }
    }
}
