//! The backend's uniform response wrapper.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only code the pipeline treats as success.
pub const SUCCESS_CODE: i32 = 200;

/// `{code, msg, data, traceId?, timestamp?}`.
///
/// The backend names the message field `msg`; `message` is accepted too.
/// `data` stays untyped until the code says the call succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub code: i32,
    #[serde(default, alias = "message")]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// The message, if the backend sent a non-blank one.
    pub fn message(&self) -> Option<&str> {
        self.msg.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }

    pub fn success(data: Value) -> Self {
        Self {
            code: SUCCESS_CODE,
            msg: Some("success".to_string()),
            data,
            trace_id: None,
            timestamp: None,
        }
    }

    pub fn failure(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: Some(msg.into()),
            data: Value::Null,
            trace_id: None,
            timestamp: None,
        }
    }

    /// Parse a body that is supposed to be an envelope.
    ///
    /// Anything that is not a JSON object with an integer `code` is `None`.
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }
}
