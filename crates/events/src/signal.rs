//! Signals emitted by the client core.
//!
//! These are facts about what already happened (a session was revoked, a
//! request failed). Presentation is the subscriber's business.

use serde::{Deserialize, Serialize};
use tims_core::WorkId;

/// Coarse classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No response reached the client.
    Network,
    /// 401/403 at transport or envelope level.
    Auth,
    /// Non-success envelope code other than 401/403.
    Business,
    /// HTTP 400.
    Validation,
    /// HTTP 404.
    NotFound,
    /// HTTP 5xx.
    Server,
    /// Any other non-2xx status.
    Http,
    /// The body was not a recognizable envelope.
    Malformed,
}

/// Why a session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearReason {
    Logout,
    Expired,
    CorruptStorage,
}

/// Session lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    /// A login (or restore) produced a live session.
    SessionEstablished { user_id: WorkId },
    /// The backend rejected the credential; the session has been cleared.
    SessionRevoked { status: u16, message: String },
    /// The session was cleared for a local reason.
    SessionCleared { reason: ClearReason },
    /// The session is gone from memory but its stored copy could not be
    /// removed; it may come back on the next start.
    StorageNotErased { message: String },
}

/// Everything a UI layer may want to react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientSignal {
    Auth(AuthEvent),
    RequestFailed {
        kind: FailureKind,
        message: String,
        trace_id: Option<String>,
    },
    Navigated {
        from: Option<String>,
        to: String,
    },
}

impl ClientSignal {
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientSignal::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signals_are_tagged_for_ui_layers() {
        let revoked = ClientSignal::Auth(AuthEvent::SessionRevoked {
            status: 401,
            message: "login expired".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&revoked).unwrap(),
            json!({"type": "auth", "event": "session_revoked", "status": 401, "message": "login expired"})
        );

        let failed = ClientSignal::RequestFailed {
            kind: FailureKind::NotFound,
            message: "requested resource not found".to_string(),
            trace_id: None,
        };
        assert_eq!(serde_json::to_value(&failed).unwrap()["kind"], "not_found");
        assert!(!failed.is_auth());
        assert!(revoked.is_auth());
    }
}
