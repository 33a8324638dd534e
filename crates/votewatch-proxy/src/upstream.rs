//! Outbound call to the nominee API, impersonating the mobile client.
//!
//! Only the headers built here are sent upstream. Nothing from the inbound
//! request (`host`, `connection`, cookies, ...) is forwarded; the HTTP client
//! derives `host` from the URL and negotiates gzip itself.

use std::sync::Arc;

use axum::body::Bytes;
use reqwest::{
    Url,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{ENV_API_TOKEN, ENV_BASE_URL, ENV_FINGERPRINT, ProxyConfig};
use crate::error::ProxyError;

/// Upper bound on the upstream body excerpt included in error responses.
pub const BODY_SAMPLE_CHARS: usize = 800;

const INVALID_JSON: &str = "Invalid JSON from upstream";
const UNEXPECTED_SHAPE: &str = "Unexpected payload shape";

/// Caller-supplied query overrides. Unknown parameters are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NomineeParams {
    pub key_category: Option<String>,
    pub type_sort: Option<String>,
    pub type_period: Option<String>,
}

impl NomineeParams {
    /// Collect overrides from decoded query pairs. The first occurrence of a
    /// repeated key wins.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "keyCategory" => &mut params.key_category,
                "typeSort" => &mut params.type_sort,
                "typePeriod" => &mut params.type_period,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

/// Merge caller parameters over the configured defaults.
pub fn build_upstream_url(config: &ProxyConfig, params: &NomineeParams) -> Result<Url, ProxyError> {
    let pick = |given: &Option<String>, fallback: &str| {
        given
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(fallback)
            .to_string()
    };

    let mut url = Url::parse(&config.base_url).map_err(|_| ProxyError::MissingConfig {
        missing: vec![ENV_BASE_URL],
    })?;
    url.query_pairs_mut()
        .append_pair("keyCategory", &pick(&params.key_category, &config.key_category))
        .append_pair("typeSort", &pick(&params.type_sort, &config.type_sort))
        .append_pair("typePeriod", &pick(&params.type_period, &config.type_period));
    Ok(url)
}

/// The mobile-client header set.
///
/// A value that is not a legal header value is reported as a configuration
/// error naming its env var.
pub fn build_headers(config: &ProxyConfig) -> Result<HeaderMap, ProxyError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut invalid = Vec::new();
    let mut put = |name: &'static str, env: &'static str, value: &str| {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                headers.insert(HeaderName::from_static(name), v);
            }
            Err(_) => invalid.push(env),
        }
    };

    for header in &config.profile {
        put(header.name, header.env, &header.value);
    }
    if let Some(token) = &config.api_token {
        put("x-api-token", ENV_API_TOKEN, token);
    }
    if let Some(fingerprint) = &config.fingerprint {
        put("fingerprint", ENV_FINGERPRINT, fingerprint);
    }

    if invalid.is_empty() {
        Ok(headers)
    } else {
        Err(ProxyError::MissingConfig { missing: invalid })
    }
}

/// First `max_chars` characters of `text`, never splitting a character.
pub fn truncate_sample(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Error-body excerpt of raw upstream bytes; invalid UTF-8 is replaced.
fn body_sample(body: &[u8]) -> String {
    truncate_sample(&String::from_utf8_lossy(body), BODY_SAMPLE_CHARS)
}

/// JavaScript truthiness of a JSON value.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Minimal contract check: JSON with a truthy `status` and an array `nominee`.
///
/// Returns the error message on failure. Invalid UTF-8 inside the body is
/// tolerated here; only the relayed bytes must stay exact.
pub fn validate_shape(body: &[u8]) -> Result<(), &'static str> {
    let text = String::from_utf8_lossy(body);
    let json: Value = serde_json::from_str(&text).map_err(|_| INVALID_JSON)?;
    let status_ok = json.get("status").is_some_and(is_truthy);
    let nominee_ok = json.get("nominee").is_some_and(Value::is_array);
    if status_ok && nominee_ok {
        Ok(())
    } else {
        Err(UNEXPECTED_SHAPE)
    }
}

/// Shared, read-only upstream caller.
pub struct Upstream {
    client: reqwest::Client,
    config: Arc<ProxyConfig>,
}

impl Upstream {
    /// The client aborts every call after `config.timeout`, body included.
    pub fn new(config: Arc<ProxyConfig>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .gzip(true)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Fetch the leaderboard and return the upstream body bytes untouched.
    pub async fn fetch(&self, params: &NomineeParams) -> Result<Bytes, ProxyError> {
        self.config.validate()?;

        let url = build_upstream_url(&self.config, params)?;
        let headers = build_headers(&self.config)?;
        let upstream = url.to_string();

        info!(upstream = %upstream, "requesting upstream leaderboard");
        let resp = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| self.transport_error(e, &upstream))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| self.transport_error(e, &upstream))?;

        if !status.is_success() {
            warn!(upstream = %upstream, status = status.as_u16(), "upstream returned an error status");
            return Err(ProxyError::UpstreamStatus {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                upstream,
                body_sample: body_sample(&body),
            });
        }

        if let Err(message) = validate_shape(&body) {
            warn!(upstream = %upstream, reason = message, "upstream payload failed validation");
            return Err(ProxyError::InvalidShape {
                message,
                upstream,
                body_sample: body_sample(&body),
            });
        }

        Ok(body)
    }

    fn transport_error(&self, err: reqwest::Error, upstream: &str) -> ProxyError {
        if err.is_timeout() {
            warn!(upstream = %upstream, timeout_ms = self.config.timeout.as_millis() as u64, "upstream timed out");
            ProxyError::UpstreamTimeout {
                upstream: upstream.to_string(),
                timeout: self.config.timeout,
            }
        } else {
            warn!(upstream = %upstream, error = %err, "upstream transport failure");
            ProxyError::Network {
                upstream: upstream.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_TIMEOUT_MS;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> ProxyConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProxyConfig::from_lookup(move |key| map.get(key).cloned())
    }

    #[test]
    fn upstream_url_uses_defaults() {
        let cfg = config(&[(ENV_API_TOKEN, "tok")]);
        let url = build_upstream_url(&cfg, &NomineeParams::default()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.fanca.io/event/nominee?keyCategory=627&typeSort=1&typePeriod=1"
        );
    }

    #[test]
    fn upstream_url_prefers_caller_params_and_encodes_them() {
        let cfg = config(&[(ENV_API_TOKEN, "tok")]);
        let params = NomineeParams {
            key_category: Some("700".into()),
            type_sort: Some("a b&c".into()),
            type_period: Some("  ".into()),
        };
        let url = build_upstream_url(&cfg, &params).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.fanca.io/event/nominee?keyCategory=700&typeSort=a+b%26c&typePeriod=1"
        );
    }

    #[test]
    fn params_from_pairs_keep_first_and_ignore_unknown() {
        let pairs = [
            ("keyCategory", "1"),
            ("b", "9"),
            ("keyCategory", "2"),
            ("typePeriod", "3"),
        ]
        .map(|(k, v)| (k.to_string(), v.to_string()));
        let params = NomineeParams::from_pairs(pairs);
        assert_eq!(
            params,
            NomineeParams {
                key_category: Some("1".into()),
                type_sort: None,
                type_period: Some("3".into()),
            }
        );
    }

    #[test]
    fn headers_mimic_mobile_client_without_hop_by_hop() {
        let cfg = config(&[(ENV_API_TOKEN, "tok"), (ENV_FINGERPRINT, "fp")]);
        let headers = build_headers(&cfg).unwrap();
        assert_eq!(headers["x-api-token"], "tok");
        assert_eq!(headers["fingerprint"], "fp");
        assert_eq!(headers["user-agent"], "Dart/3.7 (dart:io)");
        assert_eq!(headers["package"], "com.contentsmadang.fancast");
        assert_eq!(headers["content-type"], "application/json");
        assert!(!headers.contains_key("host"));
        assert!(!headers.contains_key("connection"));
    }

    #[test]
    fn fingerprint_header_omitted_when_unset() {
        let cfg = config(&[(ENV_API_TOKEN, "tok")]);
        let headers = build_headers(&cfg).unwrap();
        assert!(!headers.contains_key("fingerprint"));
    }

    #[test]
    fn illegal_header_value_names_its_env_var() {
        let cfg = config(&[(ENV_API_TOKEN, "tok"), ("FANCA_UA", "bad\u{7f}agent")]);
        match build_headers(&cfg) {
            Err(ProxyError::MissingConfig { missing }) => assert_eq!(missing, vec!["FANCA_UA"]),
            other => panic!("expected MissingConfig, got {other:?}"),
        }
    }

    #[test]
    fn truncate_sample_counts_characters() {
        let text = "é".repeat(1000);
        let sample = truncate_sample(&text, BODY_SAMPLE_CHARS);
        assert_eq!(sample.chars().count(), 800);
        assert_eq!(truncate_sample("short", BODY_SAMPLE_CHARS), "short");
    }

    #[test]
    fn validate_shape_cases() {
        assert!(validate_shape(r#"{"status":{"code":200},"nominee":[]}"#.as_bytes()).is_ok());
        assert_eq!(validate_shape("<html>".as_bytes()), Err(INVALID_JSON));
        assert_eq!(validate_shape(r#"{"status":{"code":200}}"#.as_bytes()), Err(UNEXPECTED_SHAPE));
        assert_eq!(
            validate_shape(r#"{"status":{"code":200},"nominee":{}}"#.as_bytes()),
            Err(UNEXPECTED_SHAPE)
        );
        assert_eq!(validate_shape(r#"{"status":null,"nominee":[]}"#.as_bytes()), Err(UNEXPECTED_SHAPE));
        assert_eq!(validate_shape(r#"{"status":0,"nominee":[]}"#.as_bytes()), Err(UNEXPECTED_SHAPE));
        assert_eq!(validate_shape("[]".as_bytes()), Err(UNEXPECTED_SHAPE));
    }

    #[test]
    fn shape_check_accepts_non_utf8_inside_strings() {
        let mut body = br#"{"status":{"code":200},"nominee":[],"x":""#.to_vec();
        body.push(0xff);
        body.extend_from_slice(br#""}"#);
        assert_eq!(validate_shape(&body), Ok(()));
        assert_eq!(body_sample(&body).chars().last(), Some('}'));
        assert!(body_sample(&body).contains('\u{fffd}'));
    }

    #[tokio::test]
    async fn fetch_without_token_fails_before_network() {
        // Port 9 on loopback: any attempted connection would surface as a network failure.
        let cfg = config(&[(ENV_BASE_URL, "http://127.0.0.1:9/event/nominee"), (ENV_TIMEOUT_MS, "200")]);
        let upstream = Upstream::new(Arc::new(cfg)).unwrap();
        match upstream.fetch(&NomineeParams::default()).await {
            Err(ProxyError::MissingConfig { missing }) => assert_eq!(missing, vec![ENV_API_TOKEN]),
            other => panic!("expected MissingConfig, got {other:?}"),
        }
    }
}
