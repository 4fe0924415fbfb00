use std::path::PathBuf;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use tims_app::{AppState, Command, Level, Notifier, run};
use tims_client::ClientConfig;

async fn login(Json(body): Json<Value>) -> Json<Value> {
    if body["password"] == "secret1" {
        Json(json!({
            "code": 200,
            "msg": "success",
            "data": {
                "token": "t1",
                "expireAt": (Utc::now() + Duration::hours(2)).to_rfc3339(),
                "wordId": body["id"],
                "username": "Alice",
                "permissions": ["table:create"],
                "route": {
                    "path": "/home",
                    "name": "Home",
                    "meta": {"title": "Home", "icon": "home"},
                    "children": [{"path": "table-management", "name": "TableManagement"}]
                }
            }
        }))
    } else {
        Json(json!({"code": 1002, "msg": "wrong work id or password"}))
    }
}

async fn tables(headers: HeaderMap) -> Json<Value> {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer t1");
    if authorized {
        Json(json!({"code": 200, "msg": "success", "data": [
            {"tableId": 7, "tableFullName": "Teaching workload 2026", "tableAliasName": "workload", "fieldCount": 3}
        ]}))
    } else {
        Json(json!({"code": 401, "msg": "login expired, please log in again"}))
    }
}

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let app = Router::new()
            .route("/api/v1/user/login", post(login))
            .route("/api/v1/table/list", get(tables));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}/api/v1"),
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn temp_session_file() -> PathBuf {
    std::env::temp_dir()
        .join(format!("tims-app-{}", uuid::Uuid::now_v7()))
        .join("session.json")
}

fn state(base_url: &str, session_file: &PathBuf) -> AppState {
    let mut config = ClientConfig::new(base_url);
    config.session_file = Some(session_file.clone());
    AppState::from_config(config).unwrap()
}

async fn exec(state: &AppState, args: &[&str]) -> anyhow::Result<Value> {
    run(state, Command::parse(args)?).await
}

#[tokio::test]
async fn session_survives_between_runs_until_logout() {
    let server = TestServer::spawn().await;
    let session_file = temp_session_file();

    let first = state(&server.base_url, &session_file);
    first.restore();
    let out = exec(&first, &["login", "T1001", "secret1"]).await.unwrap();
    assert_eq!(out["username"], "Alice");
    assert_eq!(out["location"], "/home");
    assert_eq!(out["menu"][0]["title"], "Home");
    assert_eq!(out["menu"][0]["children"][0]["title"], "TableManagement");

    // A fresh process picks the session up from disk.
    let second = state(&server.base_url, &session_file);
    second.restore();
    let me = exec(&second, &["whoami"]).await.unwrap();
    assert_eq!(me["loggedIn"], true);
    assert_eq!(me["id"], "T1001");
    assert_eq!(me["permissions"], json!(["table:create"]));

    let tables = exec(&second, &["tables"]).await.unwrap();
    assert_eq!(tables[0]["tableId"], 7);

    let opened = exec(&second, &["open", "/home/table-management"]).await.unwrap();
    assert_eq!(opened["location"], "/home/table-management");
    assert_eq!(opened["redirected"], false);

    exec(&second, &["logout"]).await.unwrap();
    let third = state(&server.base_url, &session_file);
    third.restore();
    assert_eq!(exec(&third, &["whoami"]).await.unwrap()["loggedIn"], false);

    let _ = std::fs::remove_dir_all(session_file.parent().unwrap());
}

#[tokio::test]
async fn logged_out_navigation_lands_on_login() {
    let server = TestServer::spawn().await;
    let session_file = temp_session_file();
    let app = state(&server.base_url, &session_file);
    app.restore();

    let opened = exec(&app, &["open", "/home/account-management"]).await.unwrap();
    assert_eq!(opened["location"], "/login?redirect=%2Fhome%2Faccount-management");
    assert_eq!(opened["redirected"], true);
}

#[tokio::test]
async fn login_returns_to_the_page_that_required_it() {
    let server = TestServer::spawn().await;
    let session_file = temp_session_file();
    let app = state(&server.base_url, &session_file);

    let opened = exec(&app, &["open", "/home/table-management"]).await.unwrap();
    assert_eq!(opened["location"], "/login?redirect=%2Fhome%2Ftable-management");

    let out = exec(&app, &["login", "T1001", "secret1"]).await.unwrap();
    assert_eq!(out["location"], "/home/table-management");

    let _ = std::fs::remove_dir_all(session_file.parent().unwrap());
}

#[tokio::test]
async fn failed_login_is_reported_once() {
    let server = TestServer::spawn().await;
    let session_file = temp_session_file();
    let app = state(&server.base_url, &session_file);
    let notifier = Notifier::subscribe(&app.signals);

    let err = exec(&app, &["login", "T1001", "wrong12"]).await.unwrap_err();
    assert!(format!("{err:#}").contains("wrong work id or password"));

    let notifications = notifier.drain();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, Level::Warning);
    assert!(!app.session.is_logged_in());
}
