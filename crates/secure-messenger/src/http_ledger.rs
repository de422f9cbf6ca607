#![cfg(feature = "http-ledger")]

//! HTTP client for the ledger server

use async_trait::async_trait;
use crypto_session::PublicKey;
use reqwest::{StatusCode, Url};
use shared_protocol::{
    Identity, Message, PublicKeyResponse, PublishKeyRequest, SendMessageRequest,
    SendMessageResponse,
};
use tracing::debug;

use crate::{Ledger, MessengerError, MessengerResult, PeerDirectory};

#[derive(Clone)]
pub struct HttpLedger {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpLedger {
    pub fn new(base_url: &str) -> MessengerResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| MessengerError::Ledger(format!("invalid ledger url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(MessengerError::Ledger(format!(
                "invalid ledger url {base_url}: cannot be a base"
            )));
        }

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| MessengerError::Ledger(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    /// Base URL with `segments` appended, each percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    async fn bad_response(resp: reqwest::Response) -> MessengerError {
        let status = resp.status();
        MessengerError::Ledger(format!(
            "status={} body={:?}",
            status,
            resp.text().await.ok()
        ))
    }
}

fn http_error(e: reqwest::Error) -> MessengerError {
    MessengerError::Ledger(e.to_string())
}

#[async_trait]
impl PeerDirectory for HttpLedger {
    async fn public_key(&self, identity: &Identity) -> MessengerResult<Option<PublicKey>> {
        let url = self.url(&["identities", identity.as_str(), "public-key"]);
        let resp = self.client.get(url).send().await.map_err(http_error)?;

        match resp.status() {
            StatusCode::OK => {
                let body: PublicKeyResponse = resp.json().await.map_err(http_error)?;
                let key = PublicKey::from_hex(&body.public_key).map_err(|e| {
                    MessengerError::Ledger(format!("malformed public key for {identity}: {e}"))
                })?;
                Ok(Some(key))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(Self::bad_response(resp).await),
        }
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn publish_public_key(&self, identity: &Identity, key: &PublicKey) -> MessengerResult<()> {
        let url = self.url(&["identities", identity.as_str(), "public-key"]);
        let body = PublishKeyRequest {
            public_key: key.to_hex(),
        };
        let resp = self
            .client
            .put(url)
            .json(&body)
            .send()
            .await
            .map_err(http_error)?;

        if resp.status().is_success() {
            debug!("Published public key for {}", identity);
            Ok(())
        } else {
            Err(Self::bad_response(resp).await)
        }
    }

    async fn send_ciphertext(
        &self,
        sender: &Identity,
        recipient: &Identity,
        ciphertext: &str,
    ) -> MessengerResult<u64> {
        let body = SendMessageRequest {
            sender: sender.clone(),
            recipient: recipient.clone(),
            ciphertext: ciphertext.to_string(),
        };
        let resp = self
            .client
            .post(self.url(&["messages"]))
            .json(&body)
            .send()
            .await
            .map_err(http_error)?;

        if resp.status().is_success() {
            let body: SendMessageResponse = resp.json().await.map_err(http_error)?;
            Ok(body.timestamp)
        } else {
            Err(Self::bad_response(resp).await)
        }
    }

    async fn fetch_messages(&self, identity: &Identity) -> MessengerResult<Vec<Message>> {
        let url = self.url(&["messages", identity.as_str()]);
        let resp = self.client.get(url).send().await.map_err(http_error)?;

        if resp.status().is_success() {
            resp.json().await.map_err(http_error)
        } else {
            Err(Self::bad_response(resp).await)
        }
    }

    async fn registered_identities(&self) -> MessengerResult<Vec<Identity>> {
        let resp = self
            .client
            .get(self.url(&["identities"]))
            .send()
            .await
            .map_err(http_error)?;

        if resp.status().is_success() {
            resp.json().await.map_err(http_error)
        } else {
            Err(Self::bad_response(resp).await)
        }
    }
}
