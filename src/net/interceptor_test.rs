use super::*;
use crate::router::Navigator;
use crate::test_helpers::{ScriptedTransport, stack};
use reqwest::Method;
use serde_json::json;

fn public_request() -> ApiRequest {
    ApiRequest::new(Method::POST, "/api/auth/token/", AuthPolicy::Public)
}

#[tokio::test]
async fn protected_request_carries_session_token() {
    let s = stack(Some("tok-1"), "/sensors");
    s.transport.push(200, json!({}));

    let interceptor = AuthInterceptor::new(s.transport.clone(), s.session.clone(), s.logout.clone());
    interceptor.send(ApiRequest::get("/api/sensors/")).await.unwrap();

    assert_eq!(s.transport.last_request().authorization().as_deref(), Some("Bearer tok-1"));
}

#[tokio::test]
async fn protected_request_without_session_has_no_authorization() {
    let s = stack(None, "/sensors");
    s.transport.push(200, json!({}));

    let interceptor = AuthInterceptor::new(s.transport.clone(), s.session.clone(), s.logout.clone());
    interceptor.send(ApiRequest::get("/api/sensors/")).await.unwrap();

    assert_eq!(s.transport.last_request().authorization(), None);
}

#[tokio::test]
async fn public_request_never_carries_token() {
    let s = stack(Some("tok-1"), "/login");
    s.transport.push(200, json!({}));

    let interceptor = AuthInterceptor::new(s.transport.clone(), s.session.clone(), s.logout.clone());
    interceptor.send(public_request().with_bearer("stale")).await.unwrap();

    assert_eq!(s.transport.last_request().authorization(), None);
}

#[tokio::test]
async fn public_failure_keeps_existing_session() {
    let s = stack(Some("tok-1"), "/login");
    s.transport.push(401, json!({ "detail": "No active account found" }));

    let interceptor = AuthInterceptor::new(s.transport.clone(), s.session.clone(), s.logout.clone());
    let response = interceptor.send(public_request()).await.unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(s.session.get().as_deref(), Some("tok-1"));
    assert_eq!(s.history.entries(), vec!["/login".to_owned()]);
}

#[tokio::test]
async fn protected_401_clears_session_and_redirects() {
    let s = stack(Some("tok-1"), "/sensors/3");
    s.transport.push(401, json!({ "detail": "Token expired" }));

    let interceptor = AuthInterceptor::new(s.transport.clone(), s.session.clone(), s.logout.clone());
    let response = interceptor.send(ApiRequest::get("/api/sensors/3/readings/")).await.unwrap();

    assert_eq!(response.status, 401);
    assert!(!s.session.is_authenticated());
    assert_eq!(s.history.current_path(), "/login");
}

#[tokio::test]
async fn protected_403_also_forces_logout() {
    let s = stack(Some("tok-1"), "/sensors");
    s.transport.push(403, json!({}));

    let interceptor = AuthInterceptor::new(s.transport.clone(), s.session.clone(), s.logout.clone());
    interceptor.send(ApiRequest::get("/api/sensors/")).await.unwrap();

    assert!(!s.session.is_authenticated());
    assert_eq!(s.history.current_path(), "/login");
}

#[tokio::test]
async fn other_failures_leave_session_alone() {
    let s = stack(Some("tok-1"), "/sensors");
    s.transport.push(500, json!({ "detail": "boom" }));
    s.transport.push_transport_error("connection refused");

    let interceptor = AuthInterceptor::new(s.transport.clone(), s.session.clone(), s.logout.clone());
    let response = interceptor.send(ApiRequest::get("/api/sensors/")).await.unwrap();
    assert_eq!(response.status, 500);
    assert!(interceptor.send(ApiRequest::get("/api/sensors/")).await.is_err());

    assert!(s.session.is_authenticated());
    assert_eq!(s.history.entries(), vec!["/sensors".to_owned()]);
}

#[tokio::test]
async fn repeated_401s_navigate_once() {
    let s = stack(Some("tok-1"), "/sensors");
    s.transport.push(401, json!({}));
    s.transport.push(401, json!({}));

    let interceptor = AuthInterceptor::new(s.transport.clone(), s.session.clone(), s.logout.clone());
    interceptor.send(ApiRequest::get("/api/sensors/")).await.unwrap();
    interceptor.send(ApiRequest::get("/api/sensors/")).await.unwrap();

    assert_eq!(s.history.entries(), vec!["/sensors".to_owned(), "/login".to_owned()]);
    // The second request went out without the cleared token.
    assert_eq!(s.transport.requests()[1].authorization(), None);
}

#[tokio::test]
async fn standalone_transport_is_untouched_by_session() {
    let transport = ScriptedTransport::new();
    transport.push(200, json!({}));
    transport.send(ApiRequest::get("/api/sensors/")).await.unwrap();
    assert_eq!(transport.last_request().authorization(), None);
}

#[tokio::test(start_paused = true)]
async fn late_401_for_replaced_token_keeps_new_session() {
    let s = stack(Some("old"), "/sensors");
    s.transport.push_delayed(std::time::Duration::from_secs(5), 401, json!({ "detail": "Token expired" }));
    let interceptor = AuthInterceptor::new(s.transport.clone(), s.session.clone(), s.logout.clone());

    let (response, ()) = tokio::join!(interceptor.send(ApiRequest::get("/api/sensors/")), async {
        tokio::task::yield_now().await;
        s.session.set("fresh").unwrap();
    });

    assert_eq!(response.unwrap().status, 401);
    assert_eq!(s.transport.last_request().authorization().as_deref(), Some("Bearer old"));
    assert_eq!(s.session.get().as_deref(), Some("fresh"));
    assert_eq!(s.history.entries(), vec!["/sensors".to_owned()]);
}
