//! Identity handles and the order-independent pair id

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, ProtocolResult};

/// Separator used when a pair id is rendered as a single string
pub const PAIR_SEPARATOR: char = '_';

/// Opaque identity handle (an account address on the ledger)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap a handle without validation
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Parse user input, trimming surrounding whitespace
    pub fn parse(input: &str) -> ProtocolResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ProtocolError::InvalidIdentity(input.to_string()));
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control() || c == '/') {
            return Err(ProtocolError::InvalidIdentity(input.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(handle: &str) -> Self {
        Self::new(handle)
    }
}

impl From<String> for Identity {
    fn from(handle: String) -> Self {
        Self(handle)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonical id for an unordered pair of identities.
///
/// The two handles are stored sorted, so `PairId::new(a, b)` and
/// `PairId::new(b, a)` compare, hash and render identically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairId {
    low: Identity,
    high: Identity,
}

impl PairId {
    pub fn new(a: &Identity, b: &Identity) -> Self {
        if a <= b {
            Self {
                low: a.clone(),
                high: b.clone(),
            }
        } else {
            Self {
                low: b.clone(),
                high: a.clone(),
            }
        }
    }

    /// The lexicographically smaller identity
    pub fn low(&self) -> &Identity {
        &self.low
    }

    /// The lexicographically larger identity
    pub fn high(&self) -> &Identity {
        &self.high
    }

    /// Whether `identity` is one of the two participants
    pub fn contains(&self, identity: &Identity) -> bool {
        &self.low == identity || &self.high == identity
    }

    /// The participant that is not `identity`
    pub fn other(&self, identity: &Identity) -> Option<&Identity> {
        if &self.low == identity {
            Some(&self.high)
        } else if &self.high == identity {
            Some(&self.low)
        } else {
            None
        }
    }
}

impl std::fmt::Display for PairId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.low, PAIR_SEPARATOR, self.high)
    }
}
