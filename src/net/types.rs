//! Wire types for the sensors REST API.
//!
//! DESIGN
//! ======
//! The client never holds an authoritative copy of a sensor or reading; these
//! are plain mirrors of backend payloads. Timestamps travel as RFC 3339 UTC.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub type SensorId = i64;
pub type ReadingId = i64;

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token pair issued by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwtPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserOut {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Registration responses differ between backend deployments: some issue
/// tokens immediately, others only echo the created user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RegisterResponse {
    Tokens {
        access: String,
        refresh: String,
        #[serde(default)]
        user: Option<UserOut>,
    },
    User(UserOut),
}

impl RegisterResponse {
    /// Access token, when the backend issued one.
    pub fn access_token(&self) -> Option<&str> {
        match self {
            Self::Tokens { access, .. } if !access.is_empty() => Some(access),
            _ => None,
        }
    }
}

// =============================================================================
// SENSORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body for create (POST) and full update (PUT).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorInput {
    pub name: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body for partial update (PATCH); absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SensorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SensorPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.model.is_none() && self.description.is_none()
    }
}

// =============================================================================
// READINGS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: ReadingId,
    /// Owning sensor. The backend omits it; the API client fills it from
    /// the request path.
    #[serde(default)]
    pub sensor_id: SensorId,
    pub temperature: f64,
    pub humidity: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingInput {
    pub temperature: f64,
    pub humidity: f64,
    #[serde(serialize_with = "serialize_iso_millis")]
    pub timestamp: DateTime<Utc>,
}

fn serialize_iso_millis<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&iso_millis(value))
}

/// Format an instant the way browsers' `toISOString` does.
pub fn iso_millis(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =============================================================================
// PAGINATION & QUERIES
// =============================================================================

/// One page of a listing plus enough metadata to compute the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    /// Total across all pages.
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page: Some(page), page_size: Some(page_size) }
    }

    fn push_params(&self, params: &mut Vec<(&'static str, String)>) {
        // Zero means "unset" for both, matching the backend defaults.
        if let Some(page) = self.page.filter(|p| *p > 0) {
            params.push(("page", page.to_string()));
        }
        if let Some(size) = self.page_size.filter(|s| *s > 0) {
            params.push(("page_size", size.to_string()));
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorQuery {
    pub page: PageRequest,
    pub q: Option<String>,
}

impl SensorQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        self.page.push_params(&mut params);
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            params.push(("q", q.to_owned()));
        }
        params
    }
}

/// Inclusive time window for readings; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadingQuery {
    pub page: PageRequest,
    pub range: TimeRange,
}

impl ReadingQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        self.page.push_params(&mut params);
        if let Some(start) = &self.range.start {
            params.push(("timestamp_from", iso_millis(start)));
        }
        if let Some(end) = &self.range.end {
            params.push(("timestamp_to", iso_millis(end)));
        }
        params
    }
}
