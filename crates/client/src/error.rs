//! Error types for the Tableside client.
//!
//! Every fallible client operation returns [`ApiError`]. Callers that need to
//! decide how to react (redirect to sign-in, show a field message, offer a
//! retry) use [`ApiError::kind`]; callers that only need text for a person use
//! [`ApiError::user_message`].

use thiserror::Error;

use crate::http::ApiResponse;
use crate::storage::StorageError;

/// Why a credential refresh did not produce a new access token.
///
/// Cloneable because one failure is delivered to every request that was
/// waiting on the refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshFailure {
    /// There was no refresh token to exchange.
    #[error("no refresh token held")]
    MissingRefreshToken,

    /// The backend refused the refresh token.
    #[error("refresh token rejected (HTTP {0})")]
    Rejected(u16),

    /// The refresh call never got a response.
    #[error("refresh request failed: {0}")]
    Transport(String),

    /// The backend answered 2xx without a usable access token.
    #[error("refresh response malformed: {0}")]
    Malformed(String),

    /// The task driving the refresh was dropped before it settled.
    #[error("refresh abandoned before it settled")]
    Aborted,
}

/// Errors that can occur when talking to the Tableside backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// No usable credentials; the user must sign in again.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Credential refresh failed; the user must sign in again.
    #[error("Token refresh failed: {0}")]
    Refresh(#[from] RefreshFailure),

    /// The backend rejected submitted fields (400 / 422).
    #[error("Validation failed: {message}")]
    Validation {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Still unauthorized after the one permitted retry.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend failure (5xx).
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Any other non-success status.
    #[error("Unexpected status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input rejected before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Coarse classification used to decide how to surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials are gone or invalid; send the user to sign-in.
    AuthenticationRequired,
    /// Submitted data was rejected; show the message, do not retry.
    Validation,
    /// The user lacks the privilege; show the message, do not retry.
    AuthorizationDenied,
    /// Network or server trouble; a later attempt may succeed.
    Transient,
    /// Anything we cannot classify.
    Unknown,
}

impl ApiError {
    /// Build an error from a non-success response.
    #[must_use]
    pub fn from_response(response: &ApiResponse) -> Self {
        let status = response.status().as_u16();
        let message = extract_error_message(response.body());

        match status {
            400 | 422 => Self::Validation { status, message },
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            500..=599 => Self::Server { status, message },
            _ => Self::Status { status, message },
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthenticationRequired | Self::Refresh(_) | Self::Unauthorized(_) => {
                ErrorKind::AuthenticationRequired
            }
            Self::Validation { .. } | Self::InvalidInput(_) => ErrorKind::Validation,
            Self::Forbidden(_) => ErrorKind::AuthorizationDenied,
            Self::Http(_) | Self::Server { .. } => ErrorKind::Transient,
            Self::Parse(_)
            | Self::Url(_)
            | Self::NotFound(_)
            | Self::Status { .. }
            | Self::Storage(_) => ErrorKind::Unknown,
        }
    }

    /// Text suitable for showing to the person using the client.
    ///
    /// Validation messages come from the backend; everything else is a fixed
    /// message so internal details are not leaked.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } if !message.is_empty() => message.clone(),
            Self::InvalidInput(message) => message.clone(),
            Self::NotFound(_) => "The requested item no longer exists.".to_string(),
            _ => match self.kind() {
                ErrorKind::AuthenticationRequired => "Please sign in to continue.".to_string(),
                ErrorKind::Validation => {
                    "Invalid data. Please check the fields and try again.".to_string()
                }
                ErrorKind::AuthorizationDenied => {
                    "You do not have permission to perform this action.".to_string()
                }
                ErrorKind::Transient => {
                    if matches!(self, Self::Http(_)) {
                        "Could not connect to the server.".to_string()
                    } else {
                        "Server error. Please try again later.".to_string()
                    }
                }
                ErrorKind::Unknown => "An unexpected error occurred.".to_string(),
            },
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Preference order: an `error` field, a `message` field, a `detail` field,
/// a bare JSON string, the compact JSON of whatever object came back (field
/// validation maps), and finally the raw text.
#[must_use]
pub fn extract_error_message(body: &[u8]) -> String {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return String::from_utf8_lossy(body).trim().to_string();
    };

    for field in ["error", "message", "detail"] {
        if let Some(text) = value.get(field).and_then(serde_json::Value::as_str) {
            return text.to_string();
        }
    }

    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse::new(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body.as_bytes().to_vec(),
        )
    }

    #[test]
    fn test_extract_error_message_preference() {
        assert_eq!(
            extract_error_message(br#"{"error": "Coupon expired", "message": "x"}"#),
            "Coupon expired"
        );
        assert_eq!(extract_error_message(br#"{"message": "Dish sold out"}"#), "Dish sold out");
        assert_eq!(
            extract_error_message(br#"{"detail": "Given token not valid"}"#),
            "Given token not valid"
        );
        assert_eq!(extract_error_message(br#""plain""#), "plain");
        assert_eq!(
            extract_error_message(br#"{"delivery_zip":["This field is required."]}"#),
            r#"{"delivery_zip":["This field is required."]}"#
        );
        assert_eq!(extract_error_message(b"<html>Bad Gateway</html>"), "<html>Bad Gateway</html>");
    }

    #[test]
    fn test_classification_by_status() {
        let cases = [
            (400, ErrorKind::Validation),
            (422, ErrorKind::Validation),
            (401, ErrorKind::AuthenticationRequired),
            (403, ErrorKind::AuthorizationDenied),
            (404, ErrorKind::Unknown),
            (409, ErrorKind::Unknown),
            (500, ErrorKind::Transient),
            (503, ErrorKind::Transient),
        ];
        for (status, kind) in cases {
            let err = ApiError::from_response(&response(status, "{}"));
            assert_eq!(err.kind(), kind, "status {status}");
        }
    }

    #[test]
    fn test_user_messages() {
        let validation = ApiError::from_response(&response(400, r#"{"error": "Minimum order is 2000"}"#));
        assert_eq!(validation.user_message(), "Minimum order is 2000");

        let empty_validation = ApiError::Validation {
            status: 422,
            message: String::new(),
        };
        assert!(empty_validation.user_message().starts_with("Invalid data"));

        let forbidden = ApiError::from_response(&response(403, r#"{"detail": "staff only"}"#));
        assert_eq!(
            forbidden.user_message(),
            "You do not have permission to perform this action."
        );

        let server = ApiError::from_response(&response(502, "upstream"));
        assert_eq!(server.user_message(), "Server error. Please try again later.");

        assert_eq!(
            ApiError::Refresh(RefreshFailure::Rejected(401)).user_message(),
            "Please sign in to continue."
        );
    }

    #[test]
    fn test_refresh_failure_display() {
        assert_eq!(
            RefreshFailure::Rejected(401).to_string(),
            "refresh token rejected (HTTP 401)"
        );
        assert_eq!(
            ApiError::from(RefreshFailure::MissingRefreshToken).to_string(),
            "Token refresh failed: no refresh token held"
        );
    }
}
