use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::CACHE_CONTROL},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Missing required configuration: {}", .missing.join(", "))]
    MissingConfig { missing: Vec<&'static str> },

    #[error("Upstream timeout ({})", format_timeout(.timeout))]
    UpstreamTimeout { upstream: String, timeout: Duration },

    #[error("Upstream returned {status} {status_text}")]
    UpstreamStatus {
        status: u16,
        status_text: String,
        upstream: String,
        body_sample: String,
    },

    #[error("{message}")]
    InvalidShape {
        message: &'static str,
        upstream: String,
        body_sample: String,
    },

    #[error("Upstream request failed")]
    Network { upstream: String },
}

impl From<ConfigError> for ProxyError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Missing(missing) => ProxyError::MissingConfig { missing },
        }
    }
}

impl ProxyError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MissingConfig { .. } => "missing-config",
            ProxyError::UpstreamTimeout { .. } => "upstream-timeout",
            ProxyError::UpstreamStatus { .. } => "upstream-error",
            ProxyError::InvalidShape { .. } => "invalid-shape",
            ProxyError::Network { .. } => "network-failure",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MissingConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::UpstreamStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ProxyError::InvalidShape { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::Network { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn body(&self) -> Value {
        let kind = self.kind();
        match self {
            ProxyError::MissingConfig { missing } => json!({
                "ok": false,
                "kind": kind,
                "error": self.to_string(),
                "missing": missing,
            }),
            ProxyError::UpstreamTimeout { upstream, .. } | ProxyError::Network { upstream } => {
                json!({
                    "ok": false,
                    "kind": kind,
                    "error": self.to_string(),
                    "upstream": upstream,
                })
            }
            ProxyError::UpstreamStatus {
                status,
                status_text,
                upstream,
                body_sample,
            } => json!({
                "ok": false,
                "kind": kind,
                "status": status,
                "statusText": status_text,
                "upstream": upstream,
                "bodySample": body_sample,
            }),
            ProxyError::InvalidShape {
                message,
                upstream,
                body_sample,
            } => json!({
                "ok": false,
                "kind": kind,
                "error": message,
                "upstream": upstream,
                "bodySample": body_sample,
            }),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = (self.status_code(), Json(self.body())).into_response();
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

fn format_timeout(timeout: &Duration) -> String {
    let ms = timeout.as_millis();
    if ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{ms}ms")
    }
}
