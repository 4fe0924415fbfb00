//! The request pipeline.
//!
//! Every API call goes through [`RequestPipeline`]: the session token and a
//! trace id are attached on the way out, the response is classified on the
//! way back, and authentication failures tear the session down exactly once.

use std::sync::Arc;

use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use tims_auth::SessionStore;
use tims_events::{AuthEvent, ClientSignal, EventBus, FailureKind, SignalBus};
use tims_router::Navigator;

use crate::classify::{Classified, RawOutcome, classify, decode};
use crate::config::ClientConfig;
use crate::error::RequestError;

pub const TRACE_HEADER: &str = "X-Trace-Id";

pub struct RequestPipeline {
    http: reqwest::Client,
    config: ClientConfig,
    session: Arc<SessionStore>,
    navigator: Option<Arc<Navigator>>,
    signals: Option<Arc<SignalBus>>,
}

impl core::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .field("logged_in", &self.session.is_logged_in())
            .finish_non_exhaustive()
    }
}

impl RequestPipeline {
    pub fn new(config: ClientConfig, session: Arc<SessionStore>) -> Result<Self, RequestError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RequestError::network(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            config,
            session,
            navigator: None,
            signals: None,
        })
    }

    /// Redirect through `navigator` when the session is revoked.
    pub fn with_navigator(mut self, navigator: Arc<Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn with_signals(mut self, signals: Arc<SignalBus>) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        self.send(Method::GET, path, |req| req).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, |req| req.json(body)).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PUT, path, |req| req.json(body)).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PATCH, path, |req| req.json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        self.send(Method::DELETE, path, |req| req).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T, RequestError> {
        self.send(Method::POST, path, |req| req.multipart(form)).await
    }

    async fn send<T, F>(&self, method: Method, path: &str, body: F) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let request = body(self.outbound(method, path));
        let data = self.execute(request).await?;
        decode(data)
    }

    /// Attach the bearer token (when logged in) and a fresh trace id.
    fn outbound(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.config.url(path);
        let trace_id = Uuid::now_v7().simple().to_string();
        tracing::debug!(%method, %url, %trace_id, "outbound request");

        let mut request = self.http.request(method, url).header(TRACE_HEADER, trace_id);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Value, RequestError> {
        let classified = match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.bytes().await {
                    Ok(body) => classify(RawOutcome::Response { status, body: &body }),
                    Err(e) => classify(RawOutcome::NoResponse {
                        timed_out: e.is_timeout(),
                    }),
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "transport failure");
                classify(RawOutcome::NoResponse {
                    timed_out: e.is_timeout(),
                })
            }
        };
        self.act(classified)
    }

    /// Apply the side effects a classification demands.
    fn act(&self, classified: Classified) -> Result<Value, RequestError> {
        let (error, trace_id) = match classified {
            Classified::Success { data, .. } => return Ok(data),
            Classified::Failure { error, trace_id } => (error, trace_id),
        };

        match error.kind() {
            FailureKind::Business | FailureKind::Validation | FailureKind::NotFound | FailureKind::Http => {
                tracing::warn!(kind = ?error.kind(), trace_id = ?trace_id, "{error}")
            }
            FailureKind::Auth => tracing::warn!(trace_id = ?trace_id, "authentication rejected: {error}"),
            FailureKind::Network | FailureKind::Server | FailureKind::Malformed => {
                tracing::error!(kind = ?error.kind(), trace_id = ?trace_id, "{error}")
            }
        }

        if let RequestError::Auth { status, message } = &error {
            self.tear_down(*status, message);
        }

        self.publish(ClientSignal::RequestFailed {
            kind: error.kind(),
            message: error.message().to_string(),
            trace_id,
        });
        Err(error)
    }

    fn tear_down(&self, status: u16, message: &str) {
        let first = self.session.claim_teardown();
        if let Err(e) = self.session.clear_session() {
            self.publish(ClientSignal::Auth(AuthEvent::StorageNotErased { message: e.to_string() }));
        }
        if !first {
            tracing::debug!("session teardown already in progress");
            return;
        }

        self.publish(ClientSignal::Auth(AuthEvent::SessionRevoked {
            status,
            message: message.to_string(),
        }));

        if let Some(navigator) = self.navigator.as_ref() {
            navigator.redirect_to_login();
        }
    }

    pub(crate) fn publish(&self, signal: ClientSignal) {
        if let Some(bus) = self.signals.as_ref() {
            if let Err(e) = bus.publish(signal) {
                tracing::warn!(error = ?e, "failed to publish client signal");
            }
        }
    }
}
