//! Handler-level error taxonomy.
//!
//! Handlers return `PortalError`. The `Http` constructor is reserved for
//! business errors that know their intended wire status; everything else is
//! fault-class and surfaces to the client as an opaque 500.

use axum::http::StatusCode;

/// Error returned by a portal handler.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// A business failure with a known HTTP status. The message becomes
    /// the response body.
    #[error("{message}")]
    Http { status: StatusCode, message: String },

    /// An unexpected failure. Logged by the dispatcher; the client only
    /// ever sees a generic 500.
    #[error("{0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl PortalError {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        PortalError::Http {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::http(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::http(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::http(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::http(StatusCode::CONFLICT, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::http(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }

    /// The intended wire status, when this error carries one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PortalError::Http { status, .. } => Some(*status),
            PortalError::Internal(_) => None,
        }
    }
}

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self {
        PortalError::Internal(Box::new(err))
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Internal(Box::new(err))
    }
}

impl From<axum::http::header::InvalidHeaderValue> for PortalError {
    fn from(err: axum::http::header::InvalidHeaderValue) -> Self {
        PortalError::Internal(Box::new(err))
    }
}
