//! Shared Protocol Definitions for Ledgerchat
//!
//! Identity handles, ledger records and the request/response bodies
//! shared by the messenger, the ledger server and the CLI.

mod error;
mod identity;
mod messages;

pub use error::*;
pub use identity::*;
pub use messages::*;

/// Length of a hex-encoded X25519 public key
pub const PUBLIC_KEY_HEX_LEN: usize = 64;

/// Default cap on a stored ciphertext, in hex characters
pub const MAX_MESSAGE_HEX_LEN: usize = 64 * 1024;
