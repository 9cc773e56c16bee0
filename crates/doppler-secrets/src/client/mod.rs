//! API client for the secrets endpoints.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, IF_NONE_MATCH, USER_AGENT};
use reqwest::Method;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{SecretsError, SecretsResult};
use crate::types::{SecretsRequest, UpdateSecretsRequest};

mod helpers;
mod http;

use http::{HttpBackend, Outcome};

pub const PROJECTS_PATH: &str = "/v3/projects";
pub const DOWNLOAD_PATH: &str = "/v3/configs/config/secrets/download";
pub const SECRETS_PATH: &str = "/v3/configs/config/secrets";

/// Result of a secrets download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Download {
    /// 304: the content behind the supplied ETag is unchanged.
    NotModified,

    /// Fresh body and its ETag.
    Fetched { body: Vec<u8>, etag: Option<String> },
}

/// Authenticated client for one token.
///
/// Connections are not pooled: every call opens its own connection and the
/// client is cheap to build per operation.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpBackend,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(token: impl Into<String>, config: ClientConfig) -> SecretsResult<Self> {
        let base_url = config
            .parsed_base_url()?
            .as_str()
            .trim_end_matches('/')
            .to_string();

        let user_agent =
            HeaderValue::from_str(&config.user_agent).map_err(|e| SecretsError::Config {
                message: format!("invalid user agent: {}", e),
            })?;
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, user_agent);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .pool_max_idle_per_host(0)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| SecretsError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http: HttpBackend {
                client,
                base_url,
                token: token.into(),
            },
            config,
        })
    }

    /// Client configured from `DOPPLER_BASE_URL` / `DOPPLER_VERIFY_TLS`.
    pub fn from_env(token: impl Into<String>) -> SecretsResult<Self> {
        Self::new(token, ClientConfig::from_env())
    }

    /// Probe the token against a lightweight endpoint.
    pub async fn authenticate(&self) -> SecretsResult<()> {
        debug!("probing authentication");
        self.http
            .perform_request(Method::GET, PROJECTS_PATH, HeaderMap::new(), &[], None)
            .await?;
        Ok(())
    }

    /// Download secrets, conditionally when `if_none_match` is set.
    pub async fn download_secrets(
        &self,
        request: &SecretsRequest,
        if_none_match: Option<&str>,
    ) -> SecretsResult<Download> {
        let mut headers = HeaderMap::new();

        if let Some(etag) = if_none_match.filter(|e| !e.is_empty()) {
            let value = HeaderValue::from_str(etag).map_err(|e| SecretsError::Config {
                message: format!("invalid ETag header value: {}", e),
            })?;
            headers.insert(IF_NONE_MATCH, value);
        }

        if request.wants_raw_body() {
            headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));
        }

        let params = request.query_params();
        match self
            .http
            .perform_request(Method::GET, DOWNLOAD_PATH, headers, &params, None)
            .await?
        {
            Outcome::NotModified => Ok(Download::NotModified),
            Outcome::Success(response) => {
                debug!(status = response.status, "secrets downloaded");
                Ok(Download::Fetched {
                    etag: response.etag(),
                    body: response.body,
                })
            }
        }
    }

    /// Push a change set as-is. Diffing happens in the service.
    pub async fn push_secrets(&self, request: &UpdateSecretsRequest) -> SecretsResult<()> {
        let body = serde_json::to_vec(request)
            .map_err(|e| SecretsError::decode("unable to encode update secrets payload", e))?;

        self.http
            .perform_request(Method::POST, SECRETS_PATH, HeaderMap::new(), &[], Some(body))
            .await?;
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn token(&self) -> &str {
        &self.http.token
    }
}
