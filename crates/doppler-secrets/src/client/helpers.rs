//! Pure helpers: status ranges and error bodies (no I/O).

use tracing::warn;

use crate::error::SecretsError;
use crate::types::ApiErrorBody;

/// 2xx and 3xx count as success. 304 is singled out by the caller.
pub(crate) fn is_success(status: u16) -> bool {
    (200..=399).contains(&status)
}

/// Build the error for a status >= 400.
///
/// JSON bodies of shape `{"messages": [...], "success": false}` surface the
/// joined messages. Anything else, including JSON without messages, gets a
/// synthesized status/size message.
pub(crate) fn error_from_body(status: u16, content_type: Option<&str>, body: &[u8]) -> SecretsError {
    let is_json = content_type
        .map(|ct| ct.trim_start().starts_with("application/json"))
        .unwrap_or(false);

    if is_json {
        match serde_json::from_slice::<ApiErrorBody>(body) {
            Ok(parsed) if !parsed.messages.is_empty() => {
                return SecretsError::HttpStatus {
                    status,
                    message: parsed.messages.join("\n"),
                };
            }
            Ok(parsed) => {
                warn!(status, success = parsed.success, "error payload carried no messages");
            }
            Err(e) => {
                warn!(status, error = %e, "unable to parse error JSON payload");
            }
        }
    }

    SecretsError::HttpStatus {
        status,
        message: format!("{} status code; {} bytes", status, body.len()),
    }
}
