//! Form input validation.
//!
//! Validation runs before any request is built; a `FormError` never reaches
//! the network and is shown inline by the view.

#[cfg(test)]
#[path = "forms_test.rs"]
mod forms_test;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use crate::net::types::{LoginRequest, ReadingInput, RegisterRequest, Sensor, SensorInput, TimeRange};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FormError(pub &'static str);

// =============================================================================
// AUTH FORMS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns a [`FormError`] when either field is blank.
    pub fn validate(&self) -> Result<LoginRequest, FormError> {
        let username = self.username.trim();
        if username.is_empty() || self.password.is_empty() {
            return Err(FormError("Enter username and password."));
        }
        Ok(LoginRequest { username: username.to_owned(), password: self.password.clone() })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    /// # Errors
    ///
    /// Returns the first failing field's [`FormError`].
    pub fn validate(&self) -> Result<RegisterRequest, FormError> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(FormError("Username is required."));
        }
        let email = self.email.trim();
        if !is_plausible_email(email) {
            return Err(FormError("Enter a valid email address."));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FormError("Password must be at least 6 characters."));
        }
        Ok(RegisterRequest { username: username.to_owned(), email: email.to_owned(), password: self.password.clone() })
    }
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

// =============================================================================
// SENSOR FORM
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorForm {
    pub name: String,
    pub model: String,
    pub description: String,
}

impl SensorForm {
    /// Prefill from an existing sensor for editing.
    pub fn from_sensor(sensor: &Sensor) -> Self {
        Self {
            name: sensor.name.clone(),
            model: sensor.model.clone(),
            description: sensor.description.clone().unwrap_or_default(),
        }
    }

    /// Body for creating a sensor; a blank description is omitted.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError`] when name or model is blank.
    pub fn validate_create(&self) -> Result<SensorInput, FormError> {
        let (name, model) = self.required()?;
        let description = Some(self.description.trim()).filter(|d| !d.is_empty()).map(str::to_owned);
        Ok(SensorInput { name, model, description })
    }

    /// Body for a full update; the description is always sent so it can be
    /// cleared.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError`] when name or model is blank.
    pub fn validate_update(&self) -> Result<SensorInput, FormError> {
        let (name, model) = self.required()?;
        Ok(SensorInput { name, model, description: Some(self.description.trim().to_owned()) })
    }

    fn required(&self) -> Result<(String, String), FormError> {
        let name = self.name.trim();
        let model = self.model.trim();
        if name.is_empty() || model.is_empty() {
            return Err(FormError("Name and model are required."));
        }
        Ok((name.to_owned(), model.to_owned()))
    }
}

// =============================================================================
// READING & FILTER FORMS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingForm {
    pub temperature: String,
    pub humidity: String,
    pub timestamp: String,
}

impl ReadingForm {
    /// # Errors
    ///
    /// Returns a [`FormError`] for blank or unparsable fields.
    pub fn validate(&self) -> Result<ReadingInput, FormError> {
        if self.temperature.trim().is_empty() || self.humidity.trim().is_empty() || self.timestamp.trim().is_empty() {
            return Err(FormError("Temperature, humidity, and timestamp are required."));
        }
        let temperature = parse_finite(&self.temperature).ok_or(FormError("Temperature must be a number."))?;
        let humidity = parse_finite(&self.humidity).ok_or(FormError("Humidity must be a number."))?;
        let timestamp =
            parse_datetime_input(&self.timestamp).ok_or(FormError("Timestamp must be a date and time."))?;
        Ok(ReadingInput { temperature, humidity, timestamp })
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Date filter for the readings list. Blank bounds are open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterForm {
    pub start: String,
    pub end: String,
}

impl FilterForm {
    /// # Errors
    ///
    /// Returns a [`FormError`] for an unparsable bound or an inverted range.
    pub fn validate(&self) -> Result<TimeRange, FormError> {
        let start = parse_optional(&self.start).map_err(|()| FormError("Start must be a date and time."))?;
        let end = parse_optional(&self.end).map_err(|()| FormError("End must be a date and time."))?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(FormError("Start must be before end."));
            }
        }
        Ok(TimeRange { start, end })
    }
}

fn parse_optional(raw: &str) -> Result<Option<DateTime<Utc>>, ()> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_datetime_input(raw).map(Some).ok_or(())
}

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// Parse a user-entered instant.
///
/// RFC 3339 values keep their offset. Date-time values without an offset
/// (`2024-03-01T12:30`) are local wall-clock time; a bare date is local
/// midnight. The result is normalized to UTC.
pub fn parse_datetime_input(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Local.from_local_datetime(&naive).earliest().map(|local| local.with_timezone(&Utc))
}
