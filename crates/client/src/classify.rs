//! Pure response classification.
//!
//! Turns whatever the transport produced into success data or a
//! [`RequestError`]. No session access, no signals, no IO; the pipeline
//! acts on the result.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::{
    MSG_BAD_GATEWAY, MSG_BAD_REQUEST, MSG_BUSINESS, MSG_FORBIDDEN, MSG_MALFORMED, MSG_NETWORK, MSG_NOT_FOUND,
    MSG_SERVER, MSG_TIMEOUT, MSG_UNAUTHORIZED, MSG_UNAVAILABLE, RequestError,
};

/// What came back from the wire.
#[derive(Debug, Clone, Copy)]
pub enum RawOutcome<'a> {
    /// An HTTP response was received.
    Response { status: u16, body: &'a [u8] },
    /// Nothing was received.
    NoResponse { timed_out: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Success {
        data: Value,
        trace_id: Option<String>,
    },
    Failure {
        error: RequestError,
        trace_id: Option<String>,
    },
}

impl Classified {
    fn failure(error: RequestError, trace_id: Option<String>) -> Self {
        Classified::Failure { error, trace_id }
    }
}

pub fn classify(raw: RawOutcome<'_>) -> Classified {
    match raw {
        RawOutcome::NoResponse { timed_out } => {
            let message = if timed_out { MSG_TIMEOUT } else { MSG_NETWORK };
            Classified::failure(RequestError::network(message), None)
        }
        RawOutcome::Response { status, body } if (200..300).contains(&status) => classify_envelope(body),
        RawOutcome::Response { status, body } => {
            let envelope = Envelope::parse(body);
            let trace_id = envelope.as_ref().and_then(|e| e.trace_id.clone());
            let backend_message = envelope.as_ref().and_then(|e| e.message()).map(str::to_string);
            Classified::failure(classify_status(status, backend_message), trace_id)
        }
    }
}

fn classify_envelope(body: &[u8]) -> Classified {
    let Some(envelope) = Envelope::parse(body) else {
        return Classified::failure(RequestError::malformed(MSG_MALFORMED), None);
    };

    let trace_id = envelope.trace_id.clone();
    if envelope.is_success() {
        return Classified::Success {
            data: envelope.data,
            trace_id,
        };
    }

    let message = envelope.message().map(str::to_string);
    let error = match envelope.code {
        401 => RequestError::Auth {
            status: 401,
            message: message.unwrap_or_else(|| MSG_UNAUTHORIZED.to_string()),
        },
        403 => RequestError::Auth {
            status: 403,
            message: message.unwrap_or_else(|| MSG_FORBIDDEN.to_string()),
        },
        code => RequestError::Business {
            code,
            message: message.unwrap_or_else(|| MSG_BUSINESS.to_string()),
        },
    };
    Classified::failure(error, trace_id)
}

/// Fixed status table for non-2xx responses.
///
/// The backend's own message is preferred for 400 and 5xx, where it is
/// usually more specific than the generic text.
pub fn classify_status(status: u16, backend_message: Option<String>) -> RequestError {
    let or = |fallback: &str| backend_message.clone().unwrap_or_else(|| fallback.to_string());
    match status {
        400 => RequestError::Validation {
            message: or(MSG_BAD_REQUEST),
        },
        401 => RequestError::Auth {
            status,
            message: MSG_UNAUTHORIZED.to_string(),
        },
        403 => RequestError::Auth {
            status,
            message: MSG_FORBIDDEN.to_string(),
        },
        404 => RequestError::NotFound {
            message: MSG_NOT_FOUND.to_string(),
        },
        500 => RequestError::Server {
            status,
            message: or(MSG_SERVER),
        },
        502 => RequestError::Server {
            status,
            message: or(MSG_BAD_GATEWAY),
        },
        503 => RequestError::Server {
            status,
            message: or(MSG_UNAVAILABLE),
        },
        500..=599 => RequestError::Server {
            status,
            message: or(&format!("request failed (status {status})")),
        },
        _ => RequestError::Http {
            status,
            message: format!("request failed (status {status})"),
        },
    }
}

/// Decode success data into the caller's type.
pub fn decode<T: DeserializeOwned>(data: Value) -> Result<T, RequestError> {
    serde_json::from_value(data).map_err(|e| {
        tracing::error!(error = %e, "response data has unexpected shape");
        RequestError::malformed(MSG_MALFORMED)
    })
}
