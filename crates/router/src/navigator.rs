//! Current location, history and guarded transitions.

use std::sync::{Arc, RwLock, RwLockWriteGuard};

use chrono::Utc;
use serde::Serialize;
use tims_auth::SessionStore;
use tims_events::{AuthEvent, ClearReason, ClientSignal, EventBus, SignalBus};

use crate::error::NavigationError;
use crate::guard::{GuardDecision, NavigationGuard, login_url};
use crate::route::RouteTable;

/// Redirect chains longer than this are treated as a loop.
pub const MAX_REDIRECTS: usize = 4;

/// Where the client currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub full_path: String,
    pub route_name: String,
    /// Reachable while logged out; see [`Navigator::is_on_public_route`].
    pub public: bool,
}

/// Result of a completed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arrival {
    pub location: Location,
    /// The guard or an alias sent us somewhere other than requested.
    pub redirected: bool,
    /// A history entry was pushed (false when already there).
    pub pushed: bool,
}

/// How a completed transition is recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryMode {
    Push,
    Replace,
}

#[derive(Debug, Default)]
struct NavState {
    current: Option<Location>,
    history: Vec<String>,
}

/// Owns the navigation state and runs the guard on every transition.
pub struct Navigator {
    table: Arc<RouteTable>,
    session: Arc<SessionStore>,
    signals: Option<Arc<SignalBus>>,
    state: RwLock<NavState>,
}

impl core::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

impl Navigator {
    pub fn new(table: Arc<RouteTable>, session: Arc<SessionStore>) -> Self {
        Self {
            table,
            session,
            signals: None,
            state: RwLock::new(NavState::default()),
        }
    }

    pub fn with_signals(mut self, signals: Arc<SignalBus>) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    fn state(&self) -> RwLockWriteGuard<'_, NavState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> Option<Location> {
        self.state.read().unwrap_or_else(|p| p.into_inner()).current.clone()
    }

    pub fn history(&self) -> Vec<String> {
        self.state.read().unwrap_or_else(|p| p.into_inner()).history.clone()
    }

    /// True when the current location needs no login.
    ///
    /// Used to avoid redirecting to login from login (or registration).
    pub fn is_on_public_route(&self) -> bool {
        self.current().is_some_and(|l| l.public)
    }

    /// Navigate to `path`, following guard redirects and aliases.
    pub fn navigate(&self, path: &str) -> Result<Arrival, NavigationError> {
        self.transition(path, HistoryMode::Push)
    }

    /// Like [`Navigator::navigate`], but the arrival overwrites the newest
    /// history entry instead of adding one.
    pub fn replace(&self, path: &str) -> Result<Arrival, NavigationError> {
        self.transition(path, HistoryMode::Replace)
    }

    fn transition(&self, path: &str, mode: HistoryMode) -> Result<Arrival, NavigationError> {
        let mut target = path.to_string();
        let mut redirected = false;

        for _ in 0..=MAX_REDIRECTS {
            if self.session.clear_if_expired(Utc::now()) {
                self.publish(ClientSignal::Auth(AuthEvent::SessionCleared {
                    reason: ClearReason::Expired,
                }));
            }

            let route = self
                .table
                .resolve(&target)
                .ok_or_else(|| NavigationError::NoMatch(target.clone()))?;

            if let Some(alias) = route.redirect.as_ref() {
                target = alias.clone();
                redirected = true;
                continue;
            }

            let decision = NavigationGuard::new(&self.table).evaluate(
                &route,
                self.session.is_logged_in(),
                &self.session.permissions(),
            );

            match decision.target(&self.table) {
                None => {
                    let location = Location {
                        full_path: route.full_path,
                        route_name: route.name,
                        public: route.public || !route.requires_auth,
                    };
                    let pushed = self.commit(location.clone(), mode);
                    return Ok(Arrival {
                        location,
                        redirected,
                        pushed,
                    });
                }
                Some(next) => {
                    if matches!(decision, GuardDecision::RedirectToLogin { .. }) {
                        tracing::info!(from = %route.full_path, "navigation requires login");
                    }
                    target = next;
                    redirected = true;
                }
            }
        }

        Err(NavigationError::TooManyRedirects(path.to_string()))
    }

    /// Send the user to login after an authentication failure.
    ///
    /// Returns `None` when already on a public route, so concurrent failures
    /// cannot bounce the user or stack history entries.
    pub fn redirect_to_login(&self) -> Option<Arrival> {
        let current = self.current();
        if current.as_ref().is_some_and(|l| l.public) {
            tracing::debug!("already on a public route; not redirecting to login");
            return None;
        }

        let target = match current {
            Some(location) => login_url(&self.table, &location.full_path),
            None => self.table.login_path().to_string(),
        };

        match self.navigate(&target) {
            Ok(arrival) => Some(arrival),
            Err(e) => {
                tracing::error!(error = %e, "redirect to login failed");
                None
            }
        }
    }

    fn commit(&self, location: Location, mode: HistoryMode) -> bool {
        let mut state = self.state();
        let from = state.current.as_ref().map(|l| l.full_path.clone());
        let moved = from.as_deref() != Some(location.full_path.as_str());
        let pushed = moved && (mode == HistoryMode::Push || state.history.is_empty());
        if pushed {
            state.history.push(location.full_path.clone());
        } else if moved {
            if let Some(last) = state.history.last_mut() {
                *last = location.full_path.clone();
            }
        }
        state.current = Some(location.clone());
        drop(state);

        if moved {
            self.publish(ClientSignal::Navigated {
                from,
                to: location.full_path,
            });
        }
        pushed
    }

    fn publish(&self, signal: ClientSignal) {
        if let Some(bus) = self.signals.as_ref() {
            if let Err(e) = bus.publish(signal) {
                tracing::warn!(error = ?e, "failed to publish navigation signal");
            }
        }
    }
}
