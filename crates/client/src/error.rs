//! Request failure taxonomy.

use thiserror::Error;
use tims_events::FailureKind;

pub const MSG_NETWORK: &str = "network connection failed, please check your network";
pub const MSG_TIMEOUT: &str = "request timed out, please try again";
pub const MSG_BAD_REQUEST: &str = "request parameter error";
pub const MSG_UNAUTHORIZED: &str = "login expired, please log in again";
pub const MSG_FORBIDDEN: &str = "permission denied";
pub const MSG_NOT_FOUND: &str = "requested resource not found";
pub const MSG_SERVER: &str = "internal server error";
pub const MSG_BAD_GATEWAY: &str = "gateway error";
pub const MSG_UNAVAILABLE: &str = "service unavailable";
pub const MSG_BUSINESS: &str = "request failed";
pub const MSG_MALFORMED: &str = "unexpected response from server";

/// Every way a request can fail. `Display` is the user-facing message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// No response reached the client.
    #[error("{message}")]
    Network { message: String },

    /// 401/403; the session has been cleared.
    #[error("{message}")]
    Auth { status: u16, message: String },

    /// Envelope code other than 200/401/403. The session is untouched.
    #[error("{message}")]
    Business { code: i32, message: String },

    /// HTTP 400.
    #[error("{message}")]
    Validation { message: String },

    /// HTTP 404.
    #[error("{message}")]
    NotFound { message: String },

    /// HTTP 5xx.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Any other non-2xx status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// A 2xx body that is not an envelope, or `data` of the wrong shape.
    #[error("{message}")]
    Malformed { message: String },
}

impl RequestError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RequestError::Network { .. } => FailureKind::Network,
            RequestError::Auth { .. } => FailureKind::Auth,
            RequestError::Business { .. } => FailureKind::Business,
            RequestError::Validation { .. } => FailureKind::Validation,
            RequestError::NotFound { .. } => FailureKind::NotFound,
            RequestError::Server { .. } => FailureKind::Server,
            RequestError::Http { .. } => FailureKind::Http,
            RequestError::Malformed { .. } => FailureKind::Malformed,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RequestError::Network { message }
            | RequestError::Auth { message, .. }
            | RequestError::Business { message, .. }
            | RequestError::Validation { message }
            | RequestError::NotFound { message }
            | RequestError::Server { message, .. }
            | RequestError::Http { message, .. }
            | RequestError::Malformed { message } => message,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, RequestError::Auth { .. })
    }

    pub fn network(message: impl Into<String>) -> Self {
        RequestError::Network { message: message.into() }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        RequestError::Malformed { message: message.into() }
    }
}

impl From<tims_core::DomainError> for RequestError {
    fn from(err: tims_core::DomainError) -> Self {
        RequestError::Validation {
            message: err.message().to_string(),
        }
    }
}
