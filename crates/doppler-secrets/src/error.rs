//! Error types for the secrets client.

/// Secrets client errors.
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    /// Network, DNS, TLS or body-read failure.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Remote answered with status >= 400.
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Payload could not be decoded or encoded.
    #[error("decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Secret absent from an otherwise successful response.
    #[error("secret '{name}' not found")]
    NotFound { name: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SecretsError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => 1,
            Self::Config { .. } => 1,

            Self::HttpStatus { status, .. } if *status == 401 || *status == 403 => 2,
            Self::HttpStatus { .. } => 3,

            Self::Transport { .. } => 5,
            Self::Decode { .. } => 6,
        }
    }

    /// Whether a caller-side retry could plausibly succeed.
    ///
    /// The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// HTTP status for `HttpStatus` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn transport(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source),
        }
    }

    pub(crate) fn decode(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            message: message.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for SecretsError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Result type for secrets operations.
pub type SecretsResult<T> = Result<T, SecretsError>;
