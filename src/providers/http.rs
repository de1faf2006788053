//! HTTP helpers shared by the vendor clients.

use std::time::Duration;

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{OrchestratorError, Result};

/// Timeout applied to vendor calls when no shared client is supplied.
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the HTTP client used by the vendor clients.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| OrchestratorError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Map a non-success vendor response to an error.
///
/// Reads the body so the vendor's own message ends up in the error.
pub(crate) async fn check_status(response: Response, model: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();
    let (kind, message) = vendor_error(&body);

    Err(match status.as_u16() {
        401 | 403 => OrchestratorError::AuthenticationFailed,
        404 => OrchestratorError::ModelNotFound(model.to_string()),
        429 => OrchestratorError::RateLimited { retry_after },
        _ if kind.as_deref() == Some("not_found_error") => {
            OrchestratorError::ModelNotFound(model.to_string())
        }
        code => OrchestratorError::Api {
            status: code,
            message: message.unwrap_or_else(|| format!("HTTP {status}")),
        },
    })
}

/// Decode a successful response body.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Pull `error.type`/`error.status` and `error.message` out of a vendor error body.
///
/// OpenAI, Anthropic and Google all nest their errors under `error`.
fn vendor_error(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        let trimmed = body.trim();
        return (None, (!trimmed.is_empty()).then(|| trimmed.to_string()));
    };
    let error = value.get("error").unwrap_or(&value);
    let kind = error
        .get("type")
        .or_else(|| error.get("status"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);
    (kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_nested_error() {
        let body = r#"{"type":"error","error":{"type":"not_found_error","message":"model: claude-2"}}"#;
        let (kind, message) = vendor_error(body);
        assert_eq!(kind.as_deref(), Some("not_found_error"));
        assert_eq!(message.as_deref(), Some("model: claude-2"));
    }

    #[test]
    fn plain_text_body_becomes_message() {
        let (kind, message) = vendor_error("upstream overloaded\n");
        assert!(kind.is_none());
        assert_eq!(message.as_deref(), Some("upstream overloaded"));
    }
}
