//! Login, registration and the user directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tims_auth::{Identity, PermissionSet, SessionError};
use tims_core::{WorkId, validate_email, validate_password, validate_required, validate_work_id};
use tims_events::{AuthEvent, ClearReason, ClientSignal};
use tims_router::BackendRoute;

use super::Ack;
use crate::error::{MSG_MALFORMED, RequestError};
use crate::pipeline::RequestPipeline;

/// Route tree node delivered with the login response.
pub type RouteVo = BackendRoute;

#[derive(Debug, Clone, Serialize)]
pub struct LoginParams {
    pub id: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterParams {
    pub id: String,
    pub username: String,
    pub password: String,
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendCodeParams {
    pub username: String,
    pub email: String,
}

/// Login response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVo {
    pub token: String,
    #[serde(default, deserialize_with = "instant::deserialize")]
    pub expire_at: Option<DateTime<Utc>>,
    /// The backend spells it `wordId`.
    pub word_id: String,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub route: Option<RouteVo>,
}

impl UserVo {
    pub fn identity(&self) -> Result<Identity, RequestError> {
        let id = WorkId::new(&self.word_id).map_err(|_| RequestError::malformed(MSG_MALFORMED))?;
        Ok(Identity {
            id,
            display_name: self.username.clone(),
            avatar: self.avatar.clone().filter(|a| !a.trim().is_empty()),
        })
    }

    pub fn permission_set(&self) -> PermissionSet {
        self.permissions.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleUser {
    pub id: WorkId,
    pub username: String,
}

pub async fn login(pipeline: &RequestPipeline, params: &LoginParams) -> Result<UserVo, RequestError> {
    validate_work_id(&params.id)?;
    validate_required("password", &params.password)?;
    pipeline.post("/user/login", params).await
}

/// Log in and establish the session from the response.
///
/// A failure to persist the session is logged; the in-memory session is
/// live either way.
pub async fn login_and_store(pipeline: &RequestPipeline, params: &LoginParams) -> Result<UserVo, RequestError> {
    let user = login(pipeline, params).await?;
    let identity = user.identity()?;
    let user_id = identity.id.clone();

    if let Err(e) = pipeline
        .session()
        .set_session(identity, user.token.clone(), user.expire_at, user.permission_set())
    {
        tracing::warn!(error = %e, "session established but not persisted");
    }

    pipeline.publish(ClientSignal::Auth(AuthEvent::SessionEstablished { user_id }));
    Ok(user)
}

/// Drop the local session. The backend keeps no logout state.
///
/// The in-memory session is gone even on error; the error means the stored
/// copy survived.
pub fn logout(pipeline: &RequestPipeline) -> Result<(), SessionError> {
    let was_logged_in = pipeline.session().is_logged_in();
    let erased = pipeline.session().clear_session();
    if was_logged_in {
        pipeline.publish(ClientSignal::Auth(AuthEvent::SessionCleared {
            reason: ClearReason::Logout,
        }));
    }
    if let Err(e) = &erased {
        pipeline.publish(ClientSignal::Auth(AuthEvent::StorageNotErased { message: e.to_string() }));
    }
    erased
}

pub async fn register(pipeline: &RequestPipeline, params: &RegisterParams) -> Result<Ack, RequestError> {
    validate_work_id(&params.id)?;
    validate_required("username", &params.username)?;
    validate_password(&params.password)?;
    validate_email(&params.email)?;
    validate_required("verification code", &params.code)?;
    pipeline.post("/user/register", params).await
}

pub async fn send_code(pipeline: &RequestPipeline, params: &SendCodeParams) -> Result<Ack, RequestError> {
    validate_required("username", &params.username)?;
    validate_email(&params.email)?;
    pipeline.post("/user/send-code", params).await
}

/// Users without administrative roles.
pub async fn normal_users(pipeline: &RequestPipeline) -> Result<Vec<SimpleUser>, RequestError> {
    pipeline.get("/user/normal-users").await
}

/// `expireAt` arrives as an ISO-8601 string or as epoch seconds (possibly
/// fractional) depending on the backend's serializer settings.
mod instant {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(f64),
    }

    // Anything larger is milliseconds.
    const MAX_EPOCH_SECONDS: f64 = 100_000_000_000.0;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(Raw::Text(text)) => DateTime::parse_from_rfc3339(text.trim())
                .map(|t| Some(t.with_timezone(&Utc)))
                .map_err(|e| D::Error::custom(format!("invalid expireAt {text:?}: {e}"))),
            Some(Raw::Number(n)) => {
                let millis = if n.abs() < MAX_EPOCH_SECONDS { n * 1000.0 } else { n };
                DateTime::from_timestamp_millis(millis as i64)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("expireAt out of range: {n}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn login_response_accepts_iso_expiry() {
        let vo: UserVo = serde_json::from_value(json!({
            "token": "t1",
            "expireAt": "2030-01-01T00:00:00Z",
            "wordId": "T1001",
            "username": "Alice",
            "avatar": "",
            "permissions": ["table:create"],
            "route": {"path": "/home", "name": "Home", "children": []}
        }))
        .unwrap();

        assert_eq!(vo.expire_at, Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()));
        let identity = vo.identity().unwrap();
        assert_eq!(identity.id.as_str(), "T1001");
        assert_eq!(identity.avatar, None);
        assert!(vo.permission_set().has("table:create"));
        assert_eq!(vo.route.unwrap().name, "Home");
    }

    #[test]
    fn login_response_accepts_epoch_expiry() {
        let seconds: UserVo =
            serde_json::from_value(json!({"token": "t", "expireAt": 1893456000.5, "wordId": "T1", "username": "A"}))
                .unwrap();
        let millis: UserVo =
            serde_json::from_value(json!({"token": "t", "expireAt": 1893456000500i64, "wordId": "T1", "username": "A"}))
                .unwrap();
        assert_eq!(seconds.expire_at, millis.expire_at);
        assert!(seconds.expire_at.is_some());
    }

    #[test]
    fn missing_expiry_is_none() {
        let vo: UserVo = serde_json::from_value(json!({"token": "t", "wordId": "T1", "username": "A"})).unwrap();
        assert_eq!(vo.expire_at, None);
        assert!(vo.permissions.is_empty());
    }

    #[test]
    fn blank_work_id_is_malformed() {
        let vo: UserVo = serde_json::from_value(json!({"token": "t", "wordId": " ", "username": "A"})).unwrap();
        assert!(matches!(vo.identity(), Err(RequestError::Malformed { .. })));
    }

    #[test]
    fn logout_announces_only_a_real_logout() {
        use std::sync::Arc;
        use tims_auth::SessionStore;
        use tims_events::{EventBus, SignalBus};

        let session = Arc::new(SessionStore::in_memory());
        session
            .set_session(
                Identity {
                    id: WorkId::new("T1001").unwrap(),
                    display_name: "Alice".to_string(),
                    avatar: None,
                },
                "t1",
                None,
                PermissionSet::default(),
            )
            .unwrap();
        let signals = Arc::new(SignalBus::new());
        let pipeline = RequestPipeline::new(crate::ClientConfig::default(), session.clone())
            .unwrap()
            .with_signals(signals.clone());
        let subscription = signals.subscribe();

        logout(&pipeline).unwrap();
        logout(&pipeline).unwrap();

        assert!(!session.is_logged_in());
        assert_eq!(
            subscription.drain(),
            vec![ClientSignal::Auth(AuthEvent::SessionCleared {
                reason: ClearReason::Logout
            })]
        );
    }
}
