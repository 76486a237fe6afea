//! API error taxonomy and user-facing message extraction.
//!
//! ERROR HANDLING
//! ==============
//! Failures are never swallowed by the client: every operation returns an
//! `ApiError` and the calling view decides what to display. Backend payloads
//! are kept so views can surface the server's own wording.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde_json::Value;

/// Errors produced by API client operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("request failed: {0}")]
    Transport(String),

    /// A protected request was rejected with 401 or 403.
    #[error("not authorized: status {status}")]
    Unauthorized { status: u16, payload: Option<Value> },

    /// Any other non-success status.
    #[error("request rejected: status {status}")]
    Status { status: u16, payload: Option<Value> },

    /// A success response whose body did not match the expected type.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// Build the error for a failed response, parsing the body as JSON when possible.
    pub fn from_status(status: u16, body: &str) -> Self {
        let payload = serde_json::from_str::<Value>(body).ok();
        if is_auth_failure_status(status) {
            Self::Unauthorized { status, payload }
        } else {
            Self::Status { status, payload }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. } | Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Unauthorized { payload, .. } | Self::Status { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }

    /// Message suitable for display, preferring the backend's own wording.
    pub fn user_message(&self, fallback: &str) -> String {
        self.payload()
            .and_then(extract_error_message)
            .unwrap_or_else(|| fallback.to_owned())
    }
}

pub fn is_auth_failure_status(status: u16) -> bool {
    matches!(status, 401 | 403)
}

/// Pull a human-readable message out of a backend error payload.
///
/// Order: `detail`, then `message`, then the first field-keyed validation
/// error (arrays yield their first entry).
pub fn extract_error_message(payload: &Value) -> Option<String> {
    let object = payload.as_object()?;
    if let Some(detail) = object.get("detail").and_then(message_from_detail) {
        return Some(detail);
    }
    if let Some(message) = object.get("message").and_then(non_empty_str) {
        return Some(message);
    }
    object.values().find_map(first_field_error)
}

fn message_from_detail(detail: &Value) -> Option<String> {
    match detail {
        Value::String(_) => non_empty_str(detail),
        // Validation lists look like [{"loc": [...], "msg": "..."}].
        Value::Array(entries) => entries.first().and_then(|entry| match entry {
            Value::Object(map) => map.get("msg").and_then(non_empty_str),
            other => non_empty_str(other),
        }),
        _ => None,
    }
}

fn first_field_error(value: &Value) -> Option<String> {
    match value {
        Value::Array(entries) => entries.first().map(|entry| match entry {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        Value::String(_) => non_empty_str(value),
        _ => None,
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.trim().is_empty()).map(str::to_owned)
}
