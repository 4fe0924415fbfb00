//! The session store: the client's single source of authentication state.
//!
//! A session either exists whole (token, identity and permissions together)
//! or does not exist at all. Every mutation goes through [`SessionStore`],
//! which mirrors the value into durable storage when one is attached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tims_core::WorkId;

use crate::permissions::PermissionSet;
use crate::storage::{SESSION_KEY, SessionStorage, StorageError, TOKEN_KEY};

/// Who is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: WorkId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A live authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub expire_at: Option<DateTime<Utc>>,
    pub identity: Identity,
    pub permissions: PermissionSet,
}

impl Session {
    /// A session without a known expiry is treated as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expire_at {
            Some(expire_at) => now >= expire_at,
            None => true,
        }
    }
}

/// Partial update applied by [`SessionStore::update_session`].
///
/// The token is deliberately absent: a new token means a new session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub display_name: Option<String>,
    pub avatar: Option<Option<String>>,
    pub expire_at: Option<DateTime<Utc>>,
    pub permissions: Option<PermissionSet>,
}

impl SessionPatch {
    fn apply(self, session: &mut Session) {
        if let Some(display_name) = self.display_name {
            session.identity.display_name = display_name;
        }
        if let Some(avatar) = self.avatar {
            session.identity.avatar = avatar;
        }
        if let Some(expire_at) = self.expire_at {
            session.expire_at = Some(expire_at);
        }
        if let Some(permissions) = self.permissions {
            session.permissions = permissions;
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session was updated in memory but could not be persisted: {0}")]
    Persist(#[from] StorageError),

    #[error("session was cleared in memory but its stored copy could not be erased: {0}")]
    Erase(StorageError),

    #[error("session could not be serialized: {0}")]
    Serialize(String),
}

/// What [`SessionStore::restore_session`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// A valid session was loaded.
    Restored,
    /// Nothing was persisted.
    Empty,
    /// A persisted payload was malformed and has been cleared.
    Discarded,
}

/// Owner of the current session.
///
/// Share it with `Arc`; every method takes `&self`.
pub struct SessionStore {
    current: RwLock<Option<Session>>,
    storage: Option<Arc<dyn SessionStorage>>,
    tearing_down: AtomicBool,
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStore")
            .field("logged_in", &self.is_logged_in())
            .field("persistent", &self.storage.is_some())
            .finish()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SessionStore {
    /// A store with no durable copy.
    pub fn in_memory() -> Self {
        Self {
            current: RwLock::new(None),
            storage: None,
            tearing_down: AtomicBool::new(false),
        }
    }

    /// A store mirrored into `storage`. Call [`restore_session`] to load.
    ///
    /// [`restore_session`]: SessionStore::restore_session
    pub fn with_storage(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            current: RwLock::new(None),
            storage: Some(storage),
            tearing_down: AtomicBool::new(false),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the whole session.
    ///
    /// Memory is updated even when persisting fails; the error says so.
    pub fn set_session(
        &self,
        identity: Identity,
        token: impl Into<String>,
        expire_at: Option<DateTime<Utc>>,
        permissions: PermissionSet,
    ) -> Result<(), SessionError> {
        let session = Session {
            token: token.into(),
            expire_at,
            identity,
            permissions,
        };

        let mut current = self.write();
        tracing::info!(user_id = %session.identity.id, permissions = session.permissions.len(), "session established");
        let persisted = self.persist(&session);
        *current = Some(session);
        self.tearing_down.store(false, Ordering::SeqCst);
        persisted
    }

    /// Merge `patch` into the current session. No-op without a session.
    pub fn update_session(&self, patch: SessionPatch) -> Result<bool, SessionError> {
        let mut current = self.write();
        let Some(session) = current.as_mut() else {
            return Ok(false);
        };
        patch.apply(session);
        let snapshot = session.clone();
        self.persist(&snapshot)?;
        Ok(true)
    }

    /// Drop the session from memory and storage. Idempotent.
    ///
    /// Memory is always cleared. An error means a stored copy may survive
    /// and the caller must surface it.
    pub fn clear_session(&self) -> Result<(), SessionError> {
        let mut current = self.write();
        if current.take().is_some() {
            tracing::info!("session cleared");
        }
        self.erase_persisted()
    }

    /// Claim the teardown that follows an authentication failure.
    ///
    /// Returns `true` only for the first caller since the last
    /// [`set_session`]; concurrent failures collapse into one teardown.
    /// The caller still clears the session with [`clear_session`].
    ///
    /// [`set_session`]: SessionStore::set_session
    /// [`clear_session`]: SessionStore::clear_session
    pub fn claim_teardown(&self) -> bool {
        self.tearing_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Clear the session if it has expired at `now`.
    pub fn clear_if_expired(&self, now: DateTime<Utc>) -> bool {
        let expired = self.read().as_ref().is_some_and(|s| s.is_expired(now));
        if expired {
            tracing::info!("session expired locally");
            // A surviving stored copy is still expired and gets dropped again on restore.
            if let Err(e) = self.clear_session() {
                tracing::error!(error = %e, "expired session not erased from storage");
            }
        }
        expired
    }

    /// Load the persisted session, failing closed on anything malformed.
    pub fn restore_session(&self) -> RestoreOutcome {
        let Some(storage) = self.storage.as_ref() else {
            return RestoreOutcome::Empty;
        };

        let token = storage.get(TOKEN_KEY);
        let payload = storage.get(SESSION_KEY);

        let (token, payload) = match (token, payload) {
            (Ok(None), Ok(None)) => return RestoreOutcome::Empty,
            (Ok(Some(token)), Ok(Some(payload))) => (token, payload),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "persisted session unreadable; discarding");
                return self.discard();
            }
            _ => {
                tracing::warn!("persisted session incomplete; discarding");
                return self.discard();
            }
        };

        match parse_persisted(&payload) {
            Some(session) if session.token == token => {
                tracing::info!(user_id = %session.identity.id, "session restored");
                *self.write() = Some(session);
                self.tearing_down.store(false, Ordering::SeqCst);
                RestoreOutcome::Restored
            }
            Some(_) => {
                tracing::warn!("persisted session token mismatch; discarding");
                self.discard()
            }
            None => {
                tracing::warn!("persisted session malformed; discarding");
                self.discard()
            }
        }
    }

    fn discard(&self) -> RestoreOutcome {
        if let Err(e) = self.clear_session() {
            tracing::error!(error = %e, "discarded session not erased from storage");
        }
        RestoreOutcome::Discarded
    }

    fn persist(&self, session: &Session) -> Result<(), SessionError> {
        let Some(storage) = self.storage.as_ref() else {
            return Ok(());
        };
        let payload = serde_json::to_string(session).map_err(|e| SessionError::Serialize(e.to_string()))?;
        storage.set(TOKEN_KEY, &session.token)?;
        storage.set(SESSION_KEY, &payload)?;
        Ok(())
    }

    /// Both keys are attempted even if the first removal fails.
    fn erase_persisted(&self) -> Result<(), SessionError> {
        let Some(storage) = self.storage.as_ref() else {
            return Ok(());
        };
        let mut first_failure = None;
        for key in [TOKEN_KEY, SESSION_KEY] {
            if let Err(e) = storage.remove(key) {
                tracing::error!(key, error = %e, "failed to remove persisted session key");
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }
        match first_failure {
            Some(e) => Err(SessionError::Erase(e)),
            None => Ok(()),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.read().is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.read().as_ref().is_none_or(|s| s.is_expired(now))
    }

    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    pub fn identity(&self) -> Option<Identity> {
        self.read().as_ref().map(|s| s.identity.clone())
    }

    /// The granted permissions; empty when logged out.
    pub fn permissions(&self) -> PermissionSet {
        self.read().as_ref().map(|s| s.permissions.clone()).unwrap_or_default()
    }

    pub fn has_permission(&self, tag: &str) -> bool {
        self.read().as_ref().is_some_and(|s| s.permissions.has(tag))
    }

    pub fn snapshot(&self) -> Option<Session> {
        self.read().clone()
    }
}

/// A payload is accepted only if `permissions` is a JSON array.
fn parse_persisted(payload: &str) -> Option<Session> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    if !value.get("permissions").is_some_and(serde_json::Value::is_array) {
        return None;
    }
    serde_json::from_value(value).ok()
}
