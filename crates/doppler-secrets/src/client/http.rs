//! HTTP layer: request assembly, status classification.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes.

use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::error::{SecretsError, SecretsResult};

use super::helpers::{error_from_body, is_success};

/// Classified response (exact parity: NotModified only for 304).
#[derive(Debug)]
pub(crate) enum Outcome {
    NotModified,
    Success(ApiResponse),
}

/// Successful response with its body fully read.
#[derive(Debug)]
pub(crate) struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub(crate) fn etag(&self) -> Option<String> {
        self.headers
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }
}

/// HTTP backend (holds reqwest client, base URL and token).
#[derive(Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) token: String,
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl HttpBackend {
    /// Perform one authenticated request. No retries.
    ///
    /// `accept: application/json` and, for POST, `content-type:
    /// application/json` are set unless `headers` overrides them.
    pub(crate) async fn perform_request(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
    ) -> SecretsResult<Outcome> {
        let url = format!("{}{}", self.base_url, path);

        let mut request_headers = HeaderMap::new();
        request_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if method == Method::POST {
            request_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (name, value) in headers.iter() {
            request_headers.insert(name.clone(), value.clone());
        }

        debug!(
            method = %method,
            url = %url,
            conditional = request_headers.contains_key(reqwest::header::IF_NONE_MATCH),
            "sending request"
        );

        let mut request = self
            .client
            .request(method, &url)
            .headers(request_headers)
            .basic_auth(&self.token, Some(""));

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SecretsError::transport("unable to load response", e))?;

        let status = response.status();
        let response_headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| SecretsError::transport("unable to read entire response body", e))?
            .to_vec();

        if status == StatusCode::NOT_MODIFIED {
            debug!(url = %url, "not modified (304)");
            return Ok(Outcome::NotModified);
        }

        if !is_success(status.as_u16()) {
            let content_type = response_headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            return Err(error_from_body(status.as_u16(), content_type, &body));
        }

        debug!(url = %url, status = status.as_u16(), bytes = body.len(), "response received");

        Ok(Outcome::Success(ApiResponse {
            status: status.as_u16(),
            headers: response_headers,
            body,
        }))
    }
}
