//! HTTP client wrapper for the Zafaran REST backend.
//!
//! # Architecture
//!
//! - `reqwest` for HTTP, JSON bodies on every request
//! - Bearer token attached automatically once a session is established
//! - Non-2xx responses and transport failures are normalized into
//!   [`ApiError`] carrying a message suitable for direct display
//! - No retry logic: a single failed call surfaces immediately to the
//!   caller, which decides whether to notify, redirect, or roll back
//!   optimistic state
//!
//! # Envelopes
//!
//! The backend speaks three response shapes:
//!
//! - cart/order endpoints: `{ "success": bool, "data": ..., "message": ... }`
//! - auth endpoints: `{ "data": { "user": ..., "token": ... } }` (no
//!   `success` flag; its absence means success)
//! - career endpoints: `{ "status": "success", "message": ... }`
//!
//! [`Envelope`] covers the first two (a missing flag defaults to `true`);
//! [`StatusEnvelope`] covers the last.

use std::sync::{Arc, Mutex, MutexGuard};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::ClientConfig;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network/transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-2xx status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body, or the status reason.
        message: String,
    },

    /// Backend answered 2xx but flagged the operation unsuccessful.
    #[error("{0}")]
    Rejected(String),

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response carried neither data nor an error message.
    #[error("Empty response from backend")]
    EmptyResponse,
}

impl ApiError {
    /// A human-readable message suitable for direct display.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Http(_) => "Network error, please check your connection".to_string(),
            Self::Api { message, .. } => message.clone(),
            Self::Rejected(message) => message.clone(),
            Self::Parse(_) | Self::EmptyResponse => {
                "Unexpected response from the server".to_string()
            }
        }
    }
}

/// Standard response envelope for cart, order, and auth endpoints.
///
/// Auth endpoints omit the `success` flag entirely; a missing flag is
/// treated as success.
#[derive(Debug, serde::Deserialize)]
pub struct Envelope<T> {
    /// Whether the backend accepted the operation.
    #[serde(default = "default_true")]
    pub success: bool,
    /// Payload, present on success.
    pub data: Option<T>,
    /// Human-readable message, usually present on failure.
    pub message: Option<String>,
}

const fn default_true() -> bool {
    true
}

impl<T> Envelope<T> {
    /// Unwrap the envelope into its payload.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] when the backend flagged failure, and
    /// [`ApiError::EmptyResponse`] when a successful envelope has no data.
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(
                self.message
                    .unwrap_or_else(|| "Request was not successful".to_string()),
            ));
        }
        self.data.ok_or(ApiError::EmptyResponse)
    }

    /// Unwrap an envelope whose payload is optional even on success.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] when the backend flagged failure.
    pub fn into_optional(self) -> Result<Option<T>, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(
                self.message
                    .unwrap_or_else(|| "Request was not successful".to_string()),
            ));
        }
        Ok(self.data)
    }
}

/// Response envelope used by the career endpoints.
#[derive(Debug, serde::Deserialize)]
pub struct StatusEnvelope {
    /// `"success"` when the backend accepted the submission.
    pub status: String,
    /// Human-readable message.
    pub message: Option<String>,
}

impl StatusEnvelope {
    /// Whether the backend reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Zafaran REST backend.
///
/// Cheaply cloneable via `Arc`. Holds the bearer token for the current
/// session; the session store installs and clears it.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base: String,
    token: Mutex<Option<SecretString>>,
}

impl ApiClient {
    /// Create a new API client from configuration.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let base = config.api_url.as_str().trim_end_matches('/').to_string();

        Self {
            inner: Arc::new(ApiClientInner {
                http: reqwest::Client::new(),
                base,
                token: Mutex::new(None),
            }),
        }
    }

    /// Install the bearer token attached to subsequent requests.
    pub fn set_token(&self, token: &str) {
        *self.lock_token() = Some(SecretString::from(token.to_owned()));
    }

    /// Remove the bearer token.
    pub fn clear_token(&self) {
        *self.lock_token() = None;
    }

    /// Whether a bearer token is currently installed.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.lock_token().is_some()
    }

    fn lock_token(&self) -> MutexGuard<'_, Option<SecretString>> {
        match self.inner.token.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base)
    }

    /// Issue a GET request and parse the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or an
    /// unparseable body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.inner.http.get(self.endpoint(path));
        self.send(path, request).await
    }

    /// Issue a POST request with a JSON body and parse the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or an
    /// unparseable body.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.inner.http.post(self.endpoint(path)).json(body);
        self.send(path, request).await
    }

    /// Issue a POST request without a body and parse the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or an
    /// unparseable body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.inner.http.post(self.endpoint(path));
        self.send(path, request).await
    }

    /// Issue a DELETE request and parse the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or an
    /// unparseable body.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.inner.http.delete(self.endpoint(path));
        self.send(path, request).await
    }

    /// Attach headers, send, and normalize the response.
    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let mut request = request.header("Content-Type", "application/json");

        if let Some(token) = self.lock_token().as_ref() {
            request = request.bearer_auth(token.expose_secret());
        }

        debug!(path, "backend request");

        let response = request.send().await?;
        let status = response.status();

        // Read the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let message = extract_error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_owned());
            error!(path, status = status.as_u16(), %message, "backend request failed");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        match serde_json::from_str(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                error!(
                    path,
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "failed to parse backend response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }
}

/// Pull a display message out of an error body, if it is the standard shape.
fn extract_error_message(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_defaults_success_when_flag_absent() {
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"data": {"user": {}}}"#).unwrap();
        assert!(envelope.success);
    }

    #[test]
    fn test_envelope_into_result_success() {
        let envelope: Envelope<i64> =
            serde_json::from_str(r#"{"success": true, "data": 7}"#).unwrap();
        assert_eq!(envelope.into_result().unwrap(), 7);
    }

    #[test]
    fn test_envelope_into_result_rejected_uses_message() {
        let envelope: Envelope<i64> =
            serde_json::from_str(r#"{"success": false, "message": "Out of stock"}"#).unwrap();
        match envelope.into_result() {
            Err(ApiError::Rejected(message)) => assert_eq!(message, "Out of stock"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_success_without_data_is_empty_response() {
        let envelope: Envelope<i64> = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(matches!(
            envelope.into_result(),
            Err(ApiError::EmptyResponse)
        ));
    }

    #[test]
    fn test_status_envelope() {
        let ok: StatusEnvelope = serde_json::from_str(r#"{"status": "success"}"#).unwrap();
        assert!(ok.is_success());

        let failed: StatusEnvelope =
            serde_json::from_str(r#"{"status": "error", "message": "nope"}"#).unwrap();
        assert!(!failed.is_success());
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"message": "Invalid credentials"}"#),
            Some("Invalid credentials".to_string())
        );
        assert_eq!(extract_error_message(r#"{"message": ""}"#), None);
        assert_eq!(extract_error_message("not json"), None);
    }

    #[test]
    fn test_display_messages_are_presentable() {
        let err = ApiError::Api {
            status: 422,
            message: "Quantity unavailable".to_string(),
        };
        assert_eq!(err.display_message(), "Quantity unavailable");

        let err = ApiError::Rejected("Cart is empty".to_string());
        assert_eq!(err.display_message(), "Cart is empty");
    }

    #[test]
    fn test_token_lifecycle() {
        let config = ClientConfig::new(
            url::Url::parse("http://localhost:5000/api").unwrap(),
            std::path::PathBuf::from("/tmp/zafaran-test"),
        );
        let api = ApiClient::new(&config);
        assert!(!api.has_token());

        api.set_token("abc123");
        assert!(api.has_token());

        api.clear_token();
        assert!(!api.has_token());
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = ClientConfig::new(
            url::Url::parse("http://localhost:5000/api/").unwrap(),
            std::path::PathBuf::from("/tmp/zafaran-test"),
        );
        let api = ApiClient::new(&config);
        assert_eq!(api.endpoint("/cart"), "http://localhost:5000/api/cart");
    }
}
