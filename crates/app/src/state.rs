//! Application state shared by every command.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use tims_auth::{FileStorage, RestoreOutcome, SessionStorage, SessionStore};
use tims_client::{ClientConfig, RequestPipeline};
use tims_events::{AuthEvent, ClearReason, ClientSignal, EventBus, SignalBus};
use tims_router::{Navigator, RouteTable};

/// Everything wired together once per process.
#[derive(Clone)]
pub struct AppState {
    pub config: ClientConfig,
    pub session: Arc<SessionStore>,
    pub signals: Arc<SignalBus>,
    pub navigator: Arc<Navigator>,
    pub pipeline: Arc<RequestPipeline>,
}

impl AppState {
    /// Wire the app over an explicit storage backend.
    pub fn new(config: ClientConfig, storage: Arc<dyn SessionStorage>) -> anyhow::Result<Self> {
        let session = Arc::new(SessionStore::with_storage(storage));
        let signals = Arc::new(SignalBus::new());
        let navigator = Arc::new(
            Navigator::new(Arc::new(RouteTable::default()), session.clone()).with_signals(signals.clone()),
        );
        let pipeline = RequestPipeline::new(config.clone(), session.clone())
            .context("failed to build request pipeline")?
            .with_navigator(navigator.clone())
            .with_signals(signals.clone());

        Ok(Self {
            config,
            session,
            signals,
            navigator,
            pipeline: Arc::new(pipeline),
        })
    }

    /// Persist the session in `config.session_file`, or the platform default.
    pub fn from_config(config: ClientConfig) -> anyhow::Result<Self> {
        let storage = match config.session_file.as_ref() {
            Some(path) => FileStorage::new(path),
            None => FileStorage::open_default()?,
        };
        tracing::debug!(path = %storage.path().display(), "session storage");
        Self::new(config, Arc::new(storage))
    }

    /// Rehydrate the session from storage and drop it if it has expired.
    pub fn restore(&self) -> RestoreOutcome {
        let outcome = self.session.restore_session();
        match outcome {
            RestoreOutcome::Discarded => self.publish_cleared(ClearReason::CorruptStorage),
            RestoreOutcome::Restored => {
                if self.session.clear_if_expired(Utc::now()) {
                    self.publish_cleared(ClearReason::Expired);
                }
            }
            RestoreOutcome::Empty => {}
        }
        outcome
    }

    fn publish_cleared(&self, reason: ClearReason) {
        if let Err(e) = self
            .signals
            .publish(ClientSignal::Auth(AuthEvent::SessionCleared { reason }))
        {
            tracing::warn!(error = ?e, "failed to publish session signal");
        }
    }
}
