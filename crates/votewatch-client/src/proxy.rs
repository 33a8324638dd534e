//! HTTP client for the proxy's `/api/nominee` endpoint.

use std::time::Duration;

use reqwest::header::CACHE_CONTROL;
use thiserror::Error;
use tracing::{debug, info};
use votewatch_core::{EnvelopeError, VoteEnvelope};

const NOMINEE_PATH: &str = "/api/nominee";
const MAX_ERROR_SUMMARY: usize = 200;

/// Per-request bound, above the proxy's own 12s upstream timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("proxy returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("payload error: {0}")]
    Payload(#[from] EnvelopeError),
}

/// Optional overrides forwarded to the upstream query.
#[derive(Debug, Clone, Default)]
pub struct UpstreamQuery {
    pub key_category: Option<String>,
    pub type_sort: Option<String>,
    pub type_period: Option<String>,
}

/// Client for a running votewatch proxy.
pub struct ProxyClient {
    client: reqwest::Client,
    base_url: String,
}

impl ProxyClient {
    /// `base_url` should be like `http://127.0.0.1:3000` (no trailing slash).
    pub fn new(base_url: String) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, NOMINEE_PATH)
    }

    /// Fetch the current leaderboard through the proxy.
    ///
    /// `bust` is sent as `b=<n>`; bumping it forces a fresh network call past
    /// any intermediate cache.
    pub async fn fetch_board(
        &self,
        query: &UpstreamQuery,
        bust: u64,
    ) -> Result<VoteEnvelope, ClientError> {
        let url = self.endpoint();
        let params = query_params(query, bust);

        debug!(url = %url, bust, "fetching leaderboard");
        let resp = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-cache")
            .query(&params)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                body: summarize_error_body(&body),
            });
        }

        let text = resp.text().await?;
        let envelope = VoteEnvelope::from_json(&text)?;
        info!(rows = envelope.nominee.len(), "fetched leaderboard");
        Ok(envelope)
    }
}

fn query_params(query: &UpstreamQuery, bust: u64) -> Vec<(&'static str, String)> {
    let mut params = Vec::with_capacity(4);
    if let Some(v) = &query.key_category {
        params.push(("keyCategory", v.clone()));
    }
    if let Some(v) = &query.type_sort {
        params.push(("typeSort", v.clone()));
    }
    if let Some(v) = &query.type_period {
        params.push(("typePeriod", v.clone()));
    }
    params.push(("b", bust.to_string()));
    params
}

/// Reduce a proxy error body to a one-line message for the error panel.
fn summarize_error_body(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = value.get("error").and_then(|v| v.as_str()) {
            return msg.to_string();
        }
        if let Some(status) = value.get("status").and_then(|v| v.as_u64()) {
            let text = value
                .get("statusText")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            return format!("upstream {status} {text}").trim_end().to_string();
        }
    }
    body.chars().take(MAX_ERROR_SUMMARY).collect()
}
