//! Turns client signals into user-facing notifications.

use serde::Serialize;

use tims_events::{AuthEvent, ClearReason, ClientSignal, EventBus, FailureKind, SignalBus, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl core::fmt::Display for Level {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// What to show for a signal, if anything.
///
/// Auth failures are announced once through `SessionRevoked`, not per request.
pub fn notification_for(signal: &ClientSignal) -> Option<Notification> {
    match signal {
        ClientSignal::Auth(AuthEvent::SessionRevoked { message, .. }) => {
            Some(Notification::new(Level::Warning, message.clone()))
        }
        ClientSignal::Auth(AuthEvent::SessionCleared { reason }) => match reason {
            ClearReason::Expired => Some(Notification::new(Level::Warning, "session expired, please log in again")),
            ClearReason::CorruptStorage => Some(Notification::new(
                Level::Warning,
                "saved session could not be read, please log in again",
            )),
            ClearReason::Logout => None,
        },
        ClientSignal::Auth(AuthEvent::StorageNotErased { message }) => Some(Notification::new(
            Level::Error,
            format!("saved session could not be removed: {message}"),
        )),
        ClientSignal::Auth(AuthEvent::SessionEstablished { user_id }) => {
            Some(Notification::new(Level::Info, format!("logged in as {user_id}")))
        }
        ClientSignal::RequestFailed {
            kind: FailureKind::Auth, ..
        } => None,
        ClientSignal::RequestFailed { kind, message, .. } => {
            let level = match kind {
                FailureKind::Network | FailureKind::Server | FailureKind::Malformed => Level::Error,
                _ => Level::Warning,
            };
            Some(Notification::new(level, message.clone()))
        }
        ClientSignal::Navigated { .. } => None,
    }
}

/// A subscription that yields notifications instead of raw signals.
pub struct Notifier {
    subscription: Subscription<ClientSignal>,
}

impl Notifier {
    pub fn subscribe(signals: &SignalBus) -> Self {
        Self {
            subscription: signals.subscribe(),
        }
    }

    /// Everything queued so far, already filtered.
    pub fn drain(&self) -> Vec<Notification> {
        self.subscription
            .drain()
            .iter()
            .filter_map(notification_for)
            .collect()
    }
}
