//! Secure Messenger - client side of Ledgerchat
//!
//! Registers identities, sends and receives end-to-end encrypted messages
//! through an external ledger, and keeps private and session keys in local
//! storage.

mod config;
mod error;
mod http_ledger;
mod ledger;
mod messenger;
mod store;

pub use config::*;
pub use error::*;
#[cfg(feature = "http-ledger")]
pub use http_ledger::*;
pub use ledger::*;
pub use messenger::*;
pub use store::*;

pub use crypto_session::{PublicKey, SessionKey, SessionKeyCache, SessionKeyStore};
pub use shared_protocol::{Identity, Message, PairId};
