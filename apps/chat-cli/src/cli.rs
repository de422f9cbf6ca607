//! Command line definitions

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use secure_messenger::{
    Direction, FileKeyStore, HttpLedger, Identity, MessengerConfig, SecureMessenger,
};

/// Ledgerchat - end-to-end encrypted chat over a shared ledger
#[derive(Parser, Debug)]
#[command(name = "ledgerchat", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Ledger server base URL
    #[arg(long, env = "LEDGERCHAT_URL", default_value = "http://127.0.0.1:8080", global = true)]
    pub ledger_url: String,

    /// Key store file
    #[arg(long, env = "LEDGERCHAT_STORE", default_value = "ledgerchat-keys.json", global = true)]
    pub store: PathBuf,

    /// Local identity (account address)
    #[arg(long, env = "LEDGERCHAT_IDENTITY", global = true)]
    pub identity: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate (or reuse) a key pair and publish the public key
    Register,
    /// Encrypt a message for a peer and store it on the ledger
    Send { peer: String, text: String },
    /// Show the decrypted conversation with a peer
    Read { peer: String },
    /// List everyone you have exchanged messages with
    Inbox,
    /// List every registered identity except yourself
    Contacts,
}

impl Cli {
    pub async fn execute(self) -> anyhow::Result<()> {
        let raw = self
            .identity
            .as_deref()
            .context("no identity given (use --identity or LEDGERCHAT_IDENTITY)")?;
        let local = Identity::parse(raw)?;

        let store = Arc::new(
            FileKeyStore::open(&self.store)
                .with_context(|| format!("opening key store {}", self.store.display()))?,
        );
        let ledger = Arc::new(HttpLedger::new(&self.ledger_url)?);
        let messenger =
            SecureMessenger::new(ledger, store.clone(), store, MessengerConfig::default());

        match self.command {
            Command::Register => {
                let public_key = messenger.register_identity(&local).await?;
                println!("{public_key}");
            }
            Command::Send { peer, text } => {
                let peer = Identity::parse(&peer)?;
                let ciphertext = messenger.send_secure_message(&local, &peer, &text).await?;
                println!("{ciphertext}");
            }
            Command::Read { peer } => {
                let peer = Identity::parse(&peer)?;
                for message in messenger.conversation(&local, &peer).await? {
                    let arrow = match message.direction {
                        Direction::Sent => ">",
                        Direction::Received => "<",
                    };
                    println!("[{}] {} {}", message.timestamp, arrow, message.content);
                }
            }
            Command::Inbox => {
                for contact in messenger.contacts(&local).await? {
                    println!("{contact}");
                }
            }
            Command::Contacts => {
                for identity in messenger.directory(&local).await? {
                    println!("{identity}");
                }
            }
        }

        Ok(())
    }
}
