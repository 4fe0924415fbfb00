use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use tims_auth::{Identity, PermissionSet, SessionStore};
use tims_client::api::{Upload, attachment, table, user};
use tims_client::{ClientConfig, RequestError, RequestPipeline, TRACE_HEADER};
use tims_core::{TableId, WorkId};
use tims_events::{AuthEvent, ClientSignal, EventBus, FailureKind, SignalBus};
use tims_router::{Navigator, RouteTable};

#[derive(Clone, Default)]
struct Backend {
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

#[derive(Debug, Clone)]
struct SeenRequest {
    authorization: Option<String>,
    trace_id: Option<String>,
}

impl Backend {
    fn record(&self, headers: &HeaderMap) -> Option<String> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        let authorization = header("authorization");
        self.seen.lock().unwrap().push(SeenRequest {
            authorization: authorization.clone(),
            trace_id: header(TRACE_HEADER),
        });
        authorization
    }

    fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

fn ok(data: Value) -> Json<Value> {
    Json(json!({"code": 200, "msg": "success", "data": data, "traceId": "backend-trace"}))
}

fn fail(code: i32, msg: &str) -> Json<Value> {
    Json(json!({"code": code, "msg": msg, "data": null}))
}

async fn login(State(backend): State<Backend>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    backend.record(&headers);
    if body["id"] == "T1001" && body["password"] == "secret1" {
        ok(json!({
            "token": "t1",
            "expireAt": (Utc::now() + Duration::hours(2)).to_rfc3339(),
            "wordId": "T1001",
            "username": "Alice",
            "avatar": null,
            "permissions": ["table:create"],
            "route": {"path": "/home", "name": "Home", "children": []}
        }))
    } else {
        fail(1002, "wrong work id or password")
    }
}

async fn table_list(State(backend): State<Backend>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match backend.record(&headers).as_deref() {
        Some("Bearer t1") => (
            StatusCode::OK,
            ok(json!([{
                "tableId": 7,
                "tableFullName": "Teaching workload 2026",
                "tableAliasName": "workload",
                "fieldCount": 3,
                "createTime": "2026-03-01T08:00:00"
            }])),
        ),
        Some(_) => (StatusCode::OK, fail(401, "token expired")),
        None => (StatusCode::UNAUTHORIZED, fail(401, "no token")),
    }
}

async fn table_fields(State(backend): State<Backend>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    backend.record(&headers);
    (StatusCode::INTERNAL_SERVER_ERROR, fail(500, "database unavailable"))
}

async fn create_table(State(backend): State<Backend>, headers: HeaderMap) -> Json<Value> {
    backend.record(&headers);
    fail(1001, "table name already exists")
}

async fn my_statistics(State(backend): State<Backend>, headers: HeaderMap) -> Json<Value> {
    backend.record(&headers);
    Json(json!({"totalCount": 3}))
}

async fn upload_attachment(State(backend): State<Backend>, headers: HeaderMap, mut form: Multipart) -> Json<Value> {
    backend.record(&headers);
    let mut file_name = String::new();
    let mut size = 0usize;
    let mut category = String::new();
    while let Some(field) = form.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().unwrap_or_default().to_string();
                size = field.bytes().await.unwrap().len();
            }
            "category" => category = field.text().await.unwrap(),
            _ => {}
        }
    }
    ok(json!({
        "attachmentId": "att-1",
        "fileName": file_name,
        "fileSize": size,
        "filePath": format!("{category}/{file_name}"),
        "fileUrl": format!("/files/{category}/{file_name}"),
        "uploadTime": "2026-03-01T09:30:00"
    }))
}

struct TestServer {
    base_url: String,
    backend: Backend,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let backend = Backend::default();
        let app = Router::new()
            .route("/api/v1/user/login", post(login))
            .route("/api/v1/table/list", get(table_list))
            .route("/api/v1/table/:id/fields", get(table_fields))
            .route("/api/v1/table/create-table", post(create_table))
            .route("/api/v1/table/data/my-statistics", get(my_statistics))
            .route("/api/v1/table/attachment/upload", post(upload_attachment))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}/api/v1");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            backend,
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Client {
    session: Arc<SessionStore>,
    navigator: Arc<Navigator>,
    signals: Arc<SignalBus>,
    pipeline: RequestPipeline,
}

fn client(base_url: &str) -> Client {
    let session = Arc::new(SessionStore::in_memory());
    let signals = Arc::new(SignalBus::new());
    let navigator = Arc::new(
        Navigator::new(Arc::new(RouteTable::default()), session.clone()).with_signals(signals.clone()),
    );
    let pipeline = RequestPipeline::new(ClientConfig::new(base_url), session.clone())
        .unwrap()
        .with_navigator(navigator.clone())
        .with_signals(signals.clone());
    Client {
        session,
        navigator,
        signals,
        pipeline,
    }
}

fn sign_in(session: &SessionStore, token: &str) {
    session
        .set_session(
            Identity {
                id: WorkId::new("T1001").unwrap(),
                display_name: "Alice".to_string(),
                avatar: None,
            },
            token,
            Some(Utc::now() + Duration::hours(1)),
            ["table:create"].into_iter().collect::<PermissionSet>(),
        )
        .unwrap();
}

fn revocations(signals: &[ClientSignal]) -> usize {
    signals
        .iter()
        .filter(|s| matches!(s, ClientSignal::Auth(AuthEvent::SessionRevoked { .. })))
        .count()
}

#[tokio::test]
async fn login_establishes_session_and_later_calls_carry_the_token() {
    let server = TestServer::spawn().await;
    let c = client(&server.base_url);
    let subscription = c.signals.subscribe();

    let params = user::LoginParams {
        id: "T1001".to_string(),
        password: "secret1".to_string(),
    };
    let vo = user::login_and_store(&c.pipeline, &params).await.unwrap();
    assert_eq!(vo.username, "Alice");

    assert!(c.session.is_logged_in());
    assert_eq!(c.session.token().as_deref(), Some("t1"));
    assert!(c.session.has_permission("table:create"));
    assert_eq!(c.session.identity().unwrap().display_name, "Alice");
    assert!(
        subscription
            .drain()
            .iter()
            .any(|s| matches!(s, ClientSignal::Auth(AuthEvent::SessionEstablished { .. })))
    );

    let tables = table::list_tables(&c.pipeline).await.unwrap();
    assert_eq!(tables[0].table_id, TableId::new(7));

    let seen = server.backend.seen();
    assert_eq!(seen[0].authorization, None);
    assert_eq!(seen[1].authorization.as_deref(), Some("Bearer t1"));
    assert!(seen.iter().all(|r| r.trace_id.as_deref().is_some_and(|t| t.len() == 32)));
    assert_ne!(seen[0].trace_id, seen[1].trace_id);
}

#[tokio::test]
async fn wrong_password_is_a_business_error_and_no_session_is_created() {
    let server = TestServer::spawn().await;
    let c = client(&server.base_url);

    let params = user::LoginParams {
        id: "T1001".to_string(),
        password: "nope123".to_string(),
    };
    let err = user::login_and_store(&c.pipeline, &params).await.unwrap_err();

    assert_eq!(
        err,
        RequestError::Business {
            code: 1002,
            message: "wrong work id or password".to_string()
        }
    );
    assert!(!c.session.is_logged_in());
}

#[tokio::test]
async fn expired_token_clears_session_and_redirects_to_login() {
    let server = TestServer::spawn().await;
    let c = client(&server.base_url);
    sign_in(&c.session, "stale");
    c.navigator.navigate("/home/table-management").unwrap();
    let subscription = c.signals.subscribe();

    let err = table::list_tables(&c.pipeline).await.unwrap_err();

    assert_eq!(
        err,
        RequestError::Auth {
            status: 401,
            message: "token expired".to_string()
        }
    );
    assert!(!c.session.is_logged_in());
    assert_eq!(
        c.navigator.current().unwrap().full_path,
        "/login?redirect=%2Fhome%2Ftable-management"
    );
    assert_eq!(revocations(&subscription.drain()), 1);
}

#[tokio::test]
async fn concurrent_auth_failures_redirect_once() {
    let server = TestServer::spawn().await;
    let c = client(&server.base_url);
    sign_in(&c.session, "stale");
    c.navigator.navigate("/home").unwrap();
    let subscription = c.signals.subscribe();

    let (a, b) = tokio::join!(table::list_tables(&c.pipeline), table::list_tables(&c.pipeline));
    assert!(a.unwrap_err().is_auth());
    assert!(b.unwrap_err().is_auth());

    assert!(!c.session.is_logged_in());
    assert_eq!(revocations(&subscription.drain()), 1);
    let logins = c.navigator.history().iter().filter(|p| p.starts_with("/login")).count();
    assert_eq!(logins, 1);
}

#[tokio::test]
async fn transport_401_without_session_stays_on_login() {
    let server = TestServer::spawn().await;
    let c = client(&server.base_url);
    c.navigator.navigate("/login").unwrap();

    let err = table::list_tables(&c.pipeline).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Auth);
    assert_eq!(c.navigator.current().unwrap().full_path, "/login");
    assert_eq!(c.navigator.history(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn business_errors_leave_the_session_alone() {
    let server = TestServer::spawn().await;
    let c = client(&server.base_url);
    sign_in(&c.session, "t1");
    let subscription = c.signals.subscribe();

    let dto = table::TableDto {
        table_full_name: "Teaching workload 2026".to_string(),
        table_alias_name: "workload".to_string(),
        table_fields: vec![table::TableField::new("course")],
    };
    let err = table::create_table(&c.pipeline, &dto).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Business);
    assert_eq!(err.message(), "table name already exists");
    assert_eq!(c.session.token().as_deref(), Some("t1"));
    assert!(subscription.drain().iter().any(|s| matches!(
        s,
        ClientSignal::RequestFailed {
            kind: FailureKind::Business,
            ..
        }
    )));
}

#[tokio::test]
async fn server_errors_surface_the_backend_message() {
    let server = TestServer::spawn().await;
    let c = client(&server.base_url);
    sign_in(&c.session, "t1");

    let err = table::table_fields(&c.pipeline, TableId::new(7)).await.unwrap_err();

    assert_eq!(
        err,
        RequestError::Server {
            status: 500,
            message: "database unavailable".to_string()
        }
    );
    assert!(c.session.is_logged_in());
}

#[tokio::test]
async fn non_envelope_success_is_malformed() {
    let server = TestServer::spawn().await;
    let c = client(&server.base_url);
    sign_in(&c.session, "t1");

    let err = tims_client::api::my_data::my_statistics(&c.pipeline).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Malformed);
}

#[tokio::test]
async fn attachments_upload_as_multipart() {
    let server = TestServer::spawn().await;
    let c = client(&server.base_url);
    sign_in(&c.session, "t1");

    let file = Upload::new("syllabus.pdf", vec![0u8; 128]);
    let attachment = attachment::upload(&c.pipeline, file, attachment::TABLE_DATA_CATEGORY, Some("42"))
        .await
        .unwrap();

    assert_eq!(attachment.file_name, "syllabus.pdf");
    assert_eq!(attachment.file_size, 128);
    assert_eq!(attachment.file_path.as_deref(), Some("table-data/syllabus.pdf"));
    assert_eq!(server.backend.seen()[0].authorization.as_deref(), Some("Bearer t1"));
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let c = client(&format!("http://{addr}/api/v1"));
    sign_in(&c.session, "t1");

    let err = table::list_tables(&c.pipeline).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Network);
    assert!(c.session.is_logged_in());
}

#[tokio::test]
async fn invalid_input_never_reaches_the_backend() {
    let server = TestServer::spawn().await;
    let c = client(&server.base_url);

    let params = user::RegisterParams {
        id: "T2002".to_string(),
        username: "Bob".to_string(),
        password: "short".to_string(),
        email: "bob@example.edu".to_string(),
        code: "123456".to_string(),
    };
    let err = user::register(&c.pipeline, &params).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Validation);
    assert!(server.backend.seen().is_empty());
}
