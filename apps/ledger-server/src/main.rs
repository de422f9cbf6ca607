//! Ledgerchat Ledger Server
//!
//! HTTP stand-in for the external ledger: stores published public keys and
//! hex ciphertext. It never sees plaintext or private keys.

mod config;
mod error;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use shared_protocol::{
    Identity, LedgerStats, Message, PublicKeyResponse, PublishKeyRequest, SendMessageRequest,
    SendMessageResponse,
};

use config::LedgerServerConfig;
use error::{ApiError, ApiResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ledger_server=debug".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    info!("Starting Ledgerchat Ledger Server");

    let config = LedgerServerConfig::from_env()?;
    let app = app(AppState::new(&config));

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/identities", get(list_identities_handler))
        .route(
            "/identities/{identity}/public-key",
            put(publish_key_handler).get(public_key_handler),
        )
        .route("/messages", post(send_message_handler))
        .route("/messages/{identity}", get(fetch_messages_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application state
#[derive(Clone)]
struct AppState {
    /// Published keys: identity -> hex public key
    public_keys: Arc<DashMap<Identity, String>>,
    /// Identities in registration order
    registrations: Arc<RwLock<Vec<Identity>>>,
    /// Append-only message log
    messages: Arc<RwLock<Vec<Message>>>,
    max_message_hex_len: usize,
}

impl AppState {
    fn new(config: &LedgerServerConfig) -> Self {
        Self {
            public_keys: Arc::new(DashMap::new()),
            registrations: Arc::new(RwLock::new(Vec::new())),
            messages: Arc::new(RwLock::new(Vec::new())),
            max_message_hex_len: config.max_message_hex_len,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Stats endpoint
async fn stats_handler(State(state): State<AppState>) -> Json<LedgerStats> {
    Json(LedgerStats {
        identities: state.public_keys.len(),
        messages: state.messages.read().len(),
    })
}

async fn list_identities_handler(State(state): State<AppState>) -> Json<Vec<Identity>> {
    Json(state.registrations.read().clone())
}

/// Publish a public key. Republishing the same key is a no-op; replacing a
/// published key is refused.
async fn publish_key_handler(
    State(state): State<AppState>,
    Path(identity): Path<String>,
    Json(body): Json<PublishKeyRequest>,
) -> ApiResult<StatusCode> {
    let identity = Identity::parse(&identity)?;
    body.validate()?;
    let public_key = body.public_key.to_lowercase();

    match state.public_keys.entry(identity.clone()) {
        Entry::Occupied(existing) => {
            if existing.get() != &public_key {
                return Err(ApiError::KeyConflict(identity));
            }
            debug!("Public key republished for {}", identity);
        }
        Entry::Vacant(slot) => {
            slot.insert(public_key);
            state.registrations.write().push(identity.clone());
            info!("Identity registered: {}", identity);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn public_key_handler(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> ApiResult<Json<PublicKeyResponse>> {
    let identity = Identity::parse(&identity)?;
    let public_key = state
        .public_keys
        .get(&identity)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| ApiError::NotFound(identity.clone()))?;

    Ok(Json(PublicKeyResponse {
        identity,
        public_key,
    }))
}

async fn send_message_handler(
    State(state): State<AppState>,
    Json(body): Json<SendMessageRequest>,
) -> ApiResult<Json<SendMessageResponse>> {
    body.validate(state.max_message_hex_len)?;
    let sender = Identity::parse(body.sender.as_str())?;
    let recipient = Identity::parse(body.recipient.as_str())?;

    let timestamp = unix_now();
    info!(
        "Message stored: {} -> {} ({} hex chars)",
        sender,
        recipient,
        body.ciphertext.len()
    );

    state.messages.write().push(Message {
        sender,
        recipient,
        ciphertext: body.ciphertext,
        timestamp,
    });

    Ok(Json(SendMessageResponse { timestamp }))
}

async fn fetch_messages_handler(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let identity = Identity::parse(&identity)?;
    let messages: Vec<Message> = state
        .messages
        .read()
        .iter()
        .filter(|m| m.involves(&identity))
        .cloned()
        .collect();

    debug!("Fetched {} messages for {}", messages.len(), identity);
    Ok(Json(messages))
}
