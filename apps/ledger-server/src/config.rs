//! Server configuration

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use shared_protocol::MAX_MESSAGE_HEX_LEN;

/// Ledger server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerServerConfig {
    /// Listen address
    pub bind_addr: SocketAddr,
    /// Largest accepted ciphertext, in hex characters
    pub max_message_hex_len: usize,
}

impl Default for LedgerServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_message_hex_len: MAX_MESSAGE_HEX_LEN,
        }
    }
}

impl LedgerServerConfig {
    /// Defaults overridden by `LEDGER_BIND_ADDR` and `LEDGER_MAX_MESSAGE_HEX_LEN`
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("LEDGER_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|e| anyhow::anyhow!("LEDGER_BIND_ADDR={addr:?}: {e}"))?;
        }
        if let Some(max) = lookup("LEDGER_MAX_MESSAGE_HEX_LEN") {
            config.max_message_hex_len = max
                .parse()
                .map_err(|e| anyhow::anyhow!("LEDGER_MAX_MESSAGE_HEX_LEN={max:?}: {e}"))?;
        }

        Ok(config)
    }
}
