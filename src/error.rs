use reqwest::header::InvalidHeaderValue;
// src/error.rs
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmelocError {
    #[error("HTTP request failed: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("URL parsing failed: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("JSON deserialization failed: {0}")]
    JsonDeserializationFailed(String),

    #[error("Backend error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session token is missing")]
    SessionTokenMissing,

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),

    #[error("Dispatch service URL not configured: {0}")]
    DispatchUnconfigured(String),

    #[error("Location access denied: {0}")]
    GeolocationDenied(String),

    #[error("Location request timed out after {0} seconds")]
    GeolocationTimeout(u64),

    #[error("Geolocation is not supported on this device: {0}")]
    GeolocationUnsupported(String),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(InvalidHeaderValue),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("SDK error: {0}")]
    SdkError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl EmelocError {
    /// Creates an `EmelocError` from an HTTP status code and a JSON response body.
    ///
    /// The EmeLoc services report failures as `{"error": "..."}`; anything else
    /// is folded into a generic message so a malformed error body never masks
    /// the status code.
    pub(crate) fn from_response(status_code: u16, response_body: Value) -> Self {
        let error_message = response_body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown error")
            .to_string();

        if status_code >= 500 {
            EmelocError::InternalServerError(format!(
                "Server error (HTTP {}): {}",
                status_code, error_message
            ))
        } else if status_code == 401 || status_code == 403 {
            EmelocError::AuthenticationError(format!(
                "Auth error (HTTP {}): {}",
                status_code, error_message
            ))
        } else if status_code == 404 {
            EmelocError::NotFound(format!("Not found (HTTP {}): {}", status_code, error_message))
        } else {
            EmelocError::ApiError {
                status: status_code,
                message: error_message,
            }
        }
    }

    /// True for the error classes a caller should surface to the user as a
    /// blocking, actionable message (device permission and timeout failures).
    /// Everything else is expected to degrade locally.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            EmelocError::GeolocationDenied(_)
                | EmelocError::GeolocationTimeout(_)
                | EmelocError::GeolocationUnsupported(_)
        )
    }
}
