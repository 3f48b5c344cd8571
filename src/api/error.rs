//! Error types for the remote chat service.

use thiserror::Error;

/// Failures reported by a [`ChatService`](super::ChatService) or [`AuthApi`](super::AuthApi) call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response reached the client (connection refused, DNS, TLS...).
    #[error("network error: {0}")]
    Transport(String),

    /// The request did not settle within the allotted time.
    #[error("request timed out")]
    Timeout,

    /// The service answered and rejected the operation.
    #[error("service rejected request ({status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Human-readable detail supplied by the service, if any.
        detail: Option<String>,
    },

    /// The service answered with a payload that could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),

    /// Client-side configuration prevented the request (bad URL, header...).
    #[error("client error: {0}")]
    Client(String),
}

/// Coarse classification used to pick user-facing wording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// Nothing came back from the service.
    Transport,
    /// The service rejected the operation.
    Business,
}

impl ApiError {
    /// Build a business failure from a status and optional detail.
    #[must_use]
    pub const fn status(status: u16, detail: Option<String>) -> Self {
        Self::Status { status, detail }
    }

    /// Whether no response reached the client.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }

    /// Classify the failure.
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        if self.is_transport() {
            FailureClass::Transport
        } else {
            FailureClass::Business
        }
    }

    /// HTTP status when the service answered.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the service rejected the credentials.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }

    /// The service-provided detail, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref().filter(|d| !d.trim().is_empty()),
            _ => None,
        }
    }

    /// Text to show the user: the service detail when present, else `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::Client(err.to_string())
        } else if let Some(status) = err.status() {
            Self::status(status.as_u16(), None)
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        Self::Client(err.to_string())
    }
}

/// Convenience result alias for remote calls.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_timeout_are_transport_failures() {
        assert!(ApiError::Transport("refused".into()).is_transport());
        assert!(ApiError::Timeout.is_transport());
        assert_eq!(ApiError::Timeout.class(), FailureClass::Transport);
        assert!(!ApiError::status(500, None).is_transport());
    }

    #[test]
    fn user_message_prefers_service_detail() {
        let err = ApiError::status(400, Some("Conversation not found".to_string()));
        assert_eq!(err.user_message("Failed"), "Conversation not found");
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn blank_detail_falls_back() {
        let err = ApiError::status(500, Some("  ".to_string()));
        assert_eq!(err.user_message("Failed to send message"), "Failed to send message");
        assert_eq!(
            ApiError::Transport("x".into()).user_message("fallback"),
            "fallback"
        );
    }

    #[test]
    fn unauthorized_is_detected() {
        assert!(ApiError::status(401, None).is_unauthorized());
        assert!(!ApiError::status(403, None).is_unauthorized());
    }
}
