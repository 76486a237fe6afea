//! End-to-end runs of the dashboard against an in-process fake backend.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};

use sensordash::app::Dashboard;
use sensordash::config::DashboardConfig;
use sensordash::views::ActionError;
use sensordash::views::forms::LoginForm;

const VALID_TOKEN: &str = "tok-1";

#[derive(Clone, Default)]
struct Backend {
    /// `(path, Authorization header)` for every request received.
    seen: Arc<Mutex<Vec<(String, Option<String>)>>>,
    reject_readings: Arc<AtomicBool>,
}

impl Backend {
    fn record(&self, path: String, headers: &HeaderMap) -> bool {
        let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_owned);
        let valid = auth.as_deref() == Some("Bearer tok-1");
        self.seen.lock().unwrap().push((path, auth));
        valid
    }

    fn seen(&self) -> Vec<(String, Option<String>)> {
        self.seen.lock().unwrap().clone()
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Token is invalid or expired" }))).into_response()
}

async fn login(State(backend): State<Backend>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    backend.record("/api/auth/token/".into(), &headers);
    if body["password"] == "secret" {
        Json(json!({ "access": VALID_TOKEN, "refresh": "r-1" })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "No active account found with the given credentials" })))
            .into_response()
    }
}

async fn list_sensors(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if !backend.record("/api/sensors/".into(), &headers) {
        return unauthorized();
    }
    Json(json!({
        "items": [{ "id": 1, "name": "Attic", "model": "DHT22", "description": "under the roof" }],
        "count": 1,
        "page": 1,
        "page_size": 20,
    }))
    .into_response()
}

async fn get_sensor(State(backend): State<Backend>, UrlPath(id): UrlPath<i64>, headers: HeaderMap) -> Response {
    if !backend.record(format!("/api/sensors/{id}/"), &headers) {
        return unauthorized();
    }
    Json(json!({ "id": id, "name": "Attic", "model": "DHT22", "description": null })).into_response()
}

async fn list_readings(State(backend): State<Backend>, UrlPath(id): UrlPath<i64>, headers: HeaderMap) -> Response {
    let valid = backend.record(format!("/api/sensors/{id}/readings/"), &headers);
    if !valid || backend.reject_readings.load(Ordering::SeqCst) {
        return unauthorized();
    }
    Json(json!({
        "items": [
            { "id": 2, "temperature": 21.5, "humidity": 40.0, "timestamp": "2024-03-01T10:05:00Z" },
            { "id": 1, "temperature": 20.0, "humidity": 42.0, "timestamp": "2024-03-01T10:00:00Z" },
        ],
        "count": 2,
        "page": 1,
        "page_size": 100,
    }))
    .into_response()
}

async fn spawn_backend(backend: Backend) -> SocketAddr {
    let app = Router::new()
        .route("/api/auth/token/", post(login))
        .route("/api/sensors/", get(list_sensors))
        .route("/api/sensors/{id}/", get(get_sensor))
        .route("/api/sensors/{id}/readings/", get(list_readings))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn dashboard(addr: SocketAddr, token_file: &Path) -> Dashboard {
    let config = DashboardConfig {
        base_url: format!("http://{addr}"),
        token_file: token_file.to_path_buf(),
        ..DashboardConfig::default()
    };
    Dashboard::from_config(config).unwrap()
}

fn form(password: &str) -> LoginForm {
    LoginForm { username: "demo".into(), password: password.into() }
}

#[tokio::test]
async fn login_persists_token_and_authorizes_requests() {
    let backend = Backend::default();
    let addr = spawn_backend(backend.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("token.json");
    let app = dashboard(addr, &token_file);

    let target = app.login_view(None).submit(&form("secret")).await.unwrap();
    assert_eq!(target, "/sensors");
    assert_eq!(app.current_path(), "/sensors");
    assert!(std::fs::read_to_string(&token_file).unwrap().contains(VALID_TOKEN));

    let list = app.sensors_list_view();
    list.load().await;
    assert_eq!(list.state().sensors[0].name, "Attic");

    let seen = backend.seen();
    assert_eq!(seen[0], ("/api/auth/token/".to_owned(), None));
    assert_eq!(seen[1], ("/api/sensors/".to_owned(), Some("Bearer tok-1".to_owned())));

    // A fresh dashboard over the same file starts signed in.
    let restarted = dashboard(addr, &token_file);
    assert!(restarted.session().is_authenticated());
}

#[tokio::test]
async fn rejected_credentials_store_nothing() {
    let addr = spawn_backend(Backend::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("token.json");
    let app = dashboard(addr, &token_file);
    app.open("/sensors");

    let err = app.login_view(Some("/sensors".into())).submit(&form("wrong")).await.unwrap_err();

    assert_eq!(err, ActionError::Failed("Login failed".into()));
    assert!(!app.session().is_authenticated());
    assert!(!token_file.exists());
    assert_eq!(app.current_path(), "/login?redirect=%2Fsensors");
}

#[tokio::test]
async fn unauthorized_readings_fetch_ends_the_session() {
    let backend = Backend::default();
    backend.reject_readings.store(true, Ordering::SeqCst);
    let addr = spawn_backend(backend.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("token.json");
    std::fs::write(&token_file, r#"{"access_token":"tok-1"}"#).unwrap();
    let app = dashboard(addr, &token_file);
    assert_eq!(app.open("/sensors/1"), sensordash::router::Route::SensorDetail { id: 1 });

    let detail = app.sensor_detail_view(1);
    detail.open().await;

    assert!(!app.session().is_authenticated());
    assert!(!token_file.exists());
    assert_eq!(app.current_path(), "/login");
    assert_eq!(detail.state().error.as_deref(), Some("Token is invalid or expired"));

    // Later protected requests go out without a token.
    backend.seen.lock().unwrap().clear();
    app.sensors_list_view().load().await;
    assert_eq!(backend.seen(), vec![("/api/sensors/".to_owned(), None)]);
}

#[tokio::test]
async fn detail_view_loads_sorted_readings_and_chart() {
    let addr = spawn_backend(Backend::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("token.json");
    std::fs::write(&token_file, r#"{"access_token":"tok-1"}"#).unwrap();
    let app = dashboard(addr, &token_file);

    let detail = app.sensor_detail_view(1);
    detail.open().await;

    let state = detail.state();
    assert_eq!(state.sensor.map(|s| s.name), Some("Attic".to_owned()));
    let ids: Vec<i64> = state.readings.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(state.readings.iter().all(|r| r.sensor_id == 1));
    let chart = detail.chart().borrow().clone().unwrap();
    assert_eq!(chart.temperature.values, vec![20.0, 21.5]);
}
