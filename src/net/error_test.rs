use super::*;
use serde_json::json;

#[test]
fn from_status_classifies_auth_failures() {
    assert!(ApiError::from_status(401, "").is_auth_failure());
    assert!(ApiError::from_status(403, "{}").is_auth_failure());
    assert!(!ApiError::from_status(404, "").is_auth_failure());
    assert_eq!(ApiError::from_status(500, "boom").status(), Some(500));
}

#[test]
fn from_status_keeps_json_payload_only() {
    let err = ApiError::from_status(400, r#"{"detail":"bad"}"#);
    assert_eq!(err.payload(), Some(&json!({ "detail": "bad" })));

    let err = ApiError::from_status(502, "<html>gateway</html>");
    assert_eq!(err.payload(), None);
}

#[test]
fn detail_wins_over_other_fields() {
    let payload = json!({ "username": ["taken"], "detail": "Invalid credentials", "message": "ignored" });
    assert_eq!(extract_error_message(&payload).as_deref(), Some("Invalid credentials"));
}

#[test]
fn message_used_when_detail_missing() {
    let payload = json!({ "message": "Sensor name already exists" });
    assert_eq!(extract_error_message(&payload).as_deref(), Some("Sensor name already exists"));
}

#[test]
fn validation_list_detail_uses_first_msg() {
    let payload = json!({ "detail": [{ "loc": ["body", "temperature"], "msg": "value is not a valid float" }] });
    assert_eq!(extract_error_message(&payload).as_deref(), Some("value is not a valid float"));
}

#[test]
fn first_field_error_follows_payload_order() {
    let payload = json!({ "username": ["A user with that username already exists."], "email": ["Enter a valid email."] });
    assert_eq!(
        extract_error_message(&payload).as_deref(),
        Some("A user with that username already exists.")
    );
}

#[test]
fn field_error_may_be_plain_string() {
    let payload = json!({ "password": "too short" });
    assert_eq!(extract_error_message(&payload).as_deref(), Some("too short"));
}

#[test]
fn non_object_payload_yields_nothing() {
    assert_eq!(extract_error_message(&json!(["x"])), None);
    assert_eq!(extract_error_message(&json!({ "count": 3 })), None);
}

#[test]
fn user_message_falls_back() {
    let err = ApiError::Transport("connection refused".into());
    assert_eq!(err.user_message("Failed to fetch sensors"), "Failed to fetch sensors");

    let err = ApiError::from_status(400, r#"{"detail":"Sensor not found"}"#);
    assert_eq!(err.user_message("Failed to fetch sensor"), "Sensor not found");
}
