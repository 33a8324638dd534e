//! Proxy configuration: one environment schema with production-observed
//! fallbacks for every value except the API token.

use std::{env, fmt, time::Duration};

use reqwest::Url;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.fanca.io/event/nominee";
pub const DEFAULT_TIMEOUT_MS: u64 = 12_000;

pub const ENV_BASE_URL: &str = "FANCA_BASE_URL";
pub const ENV_KEY_CATEGORY: &str = "FANCA_KEY_CATEGORY";
pub const ENV_TYPE_SORT: &str = "FANCA_TYPE_SORT";
pub const ENV_TYPE_PERIOD: &str = "FANCA_TYPE_PERIOD";
pub const ENV_API_TOKEN: &str = "FANCA_X_API_TOKEN";
pub const ENV_FINGERPRINT: &str = "FANCA_FINGERPRINT";
pub const ENV_TIMEOUT_MS: &str = "FANCA_TIMEOUT_MS";

/// A mobile-client header and the env var that overrides its default.
struct ProfileField {
    header: &'static str,
    env: &'static str,
    default: &'static str,
}

const PROFILE_FIELDS: &[ProfileField] = &[
    ProfileField { header: "user-agent", env: "FANCA_UA", default: "Dart/3.7 (dart:io)" },
    ProfileField { header: "accept-language", env: "FANCA_ACCEPT_LANGUAGE", default: "en-US" },
    ProfileField { header: "community-tab-index", env: "FANCA_COMMUNITY_TAB_INDEX", default: "0" },
    ProfileField { header: "system-language", env: "FANCA_SYSTEM_LANGUAGE", default: "en-US" },
    ProfileField { header: "community-translate-type", env: "FANCA_COMMUNITY_TRANSLATE_TYPE", default: "true" },
    ProfileField { header: "app-ver", env: "FANCA_APP_VER", default: "1.0.35" },
    ProfileField { header: "device-model", env: "FANCA_DEVICE_MODEL", default: "2107113SI" },
    ProfileField { header: "flavor", env: "FANCA_FLAVOR", default: "product" },
    ProfileField { header: "build-mode", env: "FANCA_BUILD_MODE", default: "release" },
    ProfileField { header: "version", env: "FANCA_VERSION", default: "1.0.35" },
    ProfileField { header: "device", env: "FANCA_DEVICE", default: "1" },
    ProfileField { header: "package", env: "FANCA_PACKAGE", default: "com.contentsmadang.fancast" },
    ProfileField { header: "os-ver", env: "FANCA_OS_VER", default: "9" },
    ProfileField { header: "brightness", env: "FANCA_BRIGHTNESS", default: "light" },
    ProfileField { header: "community-display-type", env: "FANCA_COMMUNITY_DISPLAY_TYPE", default: "list" },
    ProfileField { header: "select-language", env: "FANCA_SELECT_LANGUAGE", default: "en" },
];

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("missing or invalid configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// One header of the mobile-client fingerprint.
#[derive(Clone)]
pub struct ProfileHeader {
    pub name: &'static str,
    /// Env var the value came from, reported when the value is not a valid header.
    pub env: &'static str,
    pub value: String,
}

#[derive(Clone)]
pub struct ProxyConfig {
    pub base_url: String,
    pub key_category: String,
    pub type_sort: String,
    pub type_period: String,
    pub api_token: Option<String>,
    pub fingerprint: Option<String>,
    pub profile: Vec<ProfileHeader>,
    pub timeout: Duration,
    invalid: Vec<&'static str>,
}

impl ProxyConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or_default = |key: &str, default: &str| {
            get(key).unwrap_or_else(|| {
                debug!("{key} not set, using default: {default}");
                default.to_string()
            })
        };

        let mut invalid = Vec::new();

        let base_url = or_default(ENV_BASE_URL, DEFAULT_BASE_URL);
        if Url::parse(&base_url).is_err() {
            warn!("Invalid {ENV_BASE_URL} value: {base_url}");
            invalid.push(ENV_BASE_URL);
        }

        let timeout = match get(ENV_TIMEOUT_MS) {
            None => Duration::from_millis(DEFAULT_TIMEOUT_MS),
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    warn!("Invalid {ENV_TIMEOUT_MS} value: {raw}");
                    invalid.push(ENV_TIMEOUT_MS);
                    Duration::from_millis(DEFAULT_TIMEOUT_MS)
                }
            },
        };

        let api_token = get(ENV_API_TOKEN);
        if api_token.is_none() {
            warn!("{ENV_API_TOKEN} not set; nominee requests will fail until it is configured");
        }

        let profile = PROFILE_FIELDS
            .iter()
            .map(|field| ProfileHeader {
                name: field.header,
                env: field.env,
                value: or_default(field.env, field.default),
            })
            .collect();

        Self {
            base_url,
            key_category: or_default(ENV_KEY_CATEGORY, "627"),
            type_sort: or_default(ENV_TYPE_SORT, "1"),
            type_period: or_default(ENV_TYPE_PERIOD, "1"),
            api_token,
            fingerprint: get(ENV_FINGERPRINT),
            profile,
            timeout,
            invalid,
        }
    }

    /// Names of required keys that are absent or unusable, in a stable order.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_token.is_none() {
            missing.push(ENV_API_TOKEN);
        }
        missing.extend(self.invalid.iter().copied());
        missing
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = self.missing_keys();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("base_url", &self.base_url)
            .field("key_category", &self.key_category)
            .field("type_sort", &self.type_sort)
            .field("type_period", &self.type_period)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("fingerprint", &self.fingerprint.as_ref().map(|_| "<redacted>"))
            .field("profile_headers", &self.profile.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}
