//! Client and store configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::{SecretsError, SecretsResult};
use crate::types::{NameTransformer, SecretsFormat};

/// Base URL override.
pub const BASE_URL_ENV: &str = "DOPPLER_BASE_URL";

/// TLS verification override (`true`/`false`/`1`/`0`).
pub const VERIFY_TLS_ENV: &str = "DOPPLER_VERIFY_TLS";

pub const DEFAULT_BASE_URL: &str = "https://api.doppler.com";

/// Per-call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const USER_AGENT: &str = concat!("doppler-secrets/", env!("CARGO_PKG_VERSION"));

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL for the API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Verify server certificates.
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_verify_tls() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            verify_tls: default_verify_tls(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `DOPPLER_BASE_URL` | API base URL |
    /// | `DOPPLER_VERIFY_TLS` | Set to `false` to skip certificate verification |
    ///
    /// An unparseable `DOPPLER_VERIFY_TLS` is ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            config.base_url = url;
        }

        if let Ok(raw) = std::env::var(VERIFY_TLS_ENV) {
            match parse_bool(&raw) {
                Some(verify) => config.verify_tls = verify,
                None => warn!(value = %raw, "ignoring unparseable {}", VERIFY_TLS_ENV),
            }
        }

        config
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Normalized base URL: trailing `/` trimmed, `https` assumed when no
    /// scheme is given.
    pub fn parsed_base_url(&self) -> SecretsResult<Url> {
        let raw = self.base_url.trim();
        if raw.is_empty() {
            return Err(SecretsError::Config {
                message: "base URL is empty".to_string(),
            });
        }

        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        };
        let candidate = candidate.trim_end_matches('/');

        let url = Url::parse(candidate).map_err(|e| SecretsError::Config {
            message: format!("invalid base URL '{}': {}", self.base_url, e),
        })?;

        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(SecretsError::Config {
                message: format!("invalid base URL '{}': missing host", self.base_url),
            });
        }

        Ok(url)
    }
}

/// Parse the boolean spellings accepted for environment overrides.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

/// Cache settings of a backing store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub enable: Option<bool>,

    /// Entry TTL in seconds.
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl CacheSettings {
    pub fn enabled(&self) -> bool {
        self.enable == Some(true)
    }
}

/// Configuration of one backing store, as supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    #[serde(default)]
    pub project: String,

    #[serde(default)]
    pub config: String,

    #[serde(default)]
    pub name_transformer: Option<NameTransformer>,

    #[serde(default)]
    pub format: Option<SecretsFormat>,

    #[serde(default)]
    pub cache: Option<CacheSettings>,
}

impl StoreConfig {
    pub fn new(project: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            config: config.into(),
            ..Default::default()
        }
    }

    pub fn with_cache(mut self, ttl_secs: Option<u64>) -> Self {
        self.cache = Some(CacheSettings {
            enable: Some(true),
            ttl: ttl_secs,
        });
        self
    }

    pub fn with_format(mut self, format: SecretsFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_name_transformer(mut self, transformer: NameTransformer) -> Self {
        self.name_transformer = Some(transformer);
        self
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.as_ref().map(CacheSettings::enabled).unwrap_or(false)
    }
}
