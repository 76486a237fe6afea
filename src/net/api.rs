//! Typed client for the sensors REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! One method per backend action. Requests are tagged with an `AuthPolicy`
//! at the call site; token attachment and forced logout live in
//! `AuthInterceptor`, not here. The client has no side effects beyond the
//! network call and returns every failure to the caller.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ApiError;
use super::transport::{ApiRequest, ApiResponse, AuthPolicy, Transport};
use super::types::{
    JwtPair, LoginRequest, Paginated, Reading, ReadingInput, ReadingQuery, RegisterRequest, RegisterResponse,
    Sensor, SensorId, SensorInput, SensorPatch, SensorQuery,
};

pub const LOGIN_ENDPOINT: &str = "/api/auth/token/";
pub const REGISTER_ENDPOINT: &str = "/api/auth/register/";
pub const SENSORS_ENDPOINT: &str = "/api/sensors/";

pub fn sensor_endpoint(id: SensorId) -> String {
    format!("/api/sensors/{id}/")
}

pub fn readings_endpoint(sensor_id: SensorId) -> String {
    format!("/api/sensors/{sensor_id}/readings/")
}

/// Cheap-to-clone handle over a shared transport.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    // =========================================================================
    // AUTH
    // =========================================================================

    /// `POST /api/auth/token/`
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure unchanged.
    pub async fn login(&self, body: &LoginRequest) -> Result<JwtPair, ApiError> {
        let request = ApiRequest::new(Method::POST, LOGIN_ENDPOINT, AuthPolicy::Public).with_body(to_json(body)?);
        self.fetch(request).await
    }

    /// `POST /api/auth/register/`
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure unchanged.
    pub async fn register(&self, body: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        let request = ApiRequest::new(Method::POST, REGISTER_ENDPOINT, AuthPolicy::Public).with_body(to_json(body)?);
        self.fetch(request).await
    }

    // =========================================================================
    // SENSORS
    // =========================================================================

    /// `GET /api/sensors/`
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure unchanged.
    pub async fn list_sensors(&self, query: &SensorQuery) -> Result<Paginated<Sensor>, ApiError> {
        let request = ApiRequest::get(SENSORS_ENDPOINT).with_query(query.to_params());
        self.fetch(request).await
    }

    /// `GET /api/sensors/{id}/`
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure unchanged.
    pub async fn get_sensor(&self, id: SensorId) -> Result<Sensor, ApiError> {
        self.fetch(ApiRequest::get(sensor_endpoint(id))).await
    }

    /// `POST /api/sensors/`
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure unchanged.
    pub async fn create_sensor(&self, body: &SensorInput) -> Result<Sensor, ApiError> {
        let request =
            ApiRequest::new(Method::POST, SENSORS_ENDPOINT, AuthPolicy::Protected).with_body(to_json(body)?);
        self.fetch(request).await
    }

    /// `PUT /api/sensors/{id}/`
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure unchanged.
    pub async fn update_sensor(&self, id: SensorId, body: &SensorInput) -> Result<Sensor, ApiError> {
        let request =
            ApiRequest::new(Method::PUT, sensor_endpoint(id), AuthPolicy::Protected).with_body(to_json(body)?);
        self.fetch(request).await
    }

    /// `PATCH /api/sensors/{id}/`
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure unchanged.
    pub async fn patch_sensor(&self, id: SensorId, body: &SensorPatch) -> Result<Sensor, ApiError> {
        let request =
            ApiRequest::new(Method::PATCH, sensor_endpoint(id), AuthPolicy::Protected).with_body(to_json(body)?);
        self.fetch(request).await
    }

    /// `DELETE /api/sensors/{id}/`
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure unchanged.
    pub async fn delete_sensor(&self, id: SensorId) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::DELETE, sensor_endpoint(id), AuthPolicy::Protected);
        let response = self.transport.send(request).await?;
        check_status(&response)
    }

    // =========================================================================
    // READINGS
    // =========================================================================

    /// `GET /api/sensors/{id}/readings/`
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure unchanged.
    pub async fn list_readings(
        &self,
        sensor_id: SensorId,
        query: &ReadingQuery,
    ) -> Result<Paginated<Reading>, ApiError> {
        let request = ApiRequest::get(readings_endpoint(sensor_id)).with_query(query.to_params());
        let mut page: Paginated<Reading> = self.fetch(request).await?;
        for reading in &mut page.items {
            reading.sensor_id = sensor_id;
        }
        Ok(page)
    }

    /// `POST /api/sensors/{id}/readings/`
    ///
    /// # Errors
    ///
    /// Returns the backend or transport failure unchanged.
    pub async fn create_reading(&self, sensor_id: SensorId, body: &ReadingInput) -> Result<Reading, ApiError> {
        let request = ApiRequest::new(Method::POST, readings_endpoint(sensor_id), AuthPolicy::Protected)
            .with_body(to_json(body)?);
        let mut reading: Reading = self.fetch(request).await?;
        reading.sensor_id = sensor_id;
        Ok(reading)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let method = request.method.clone();
        let path = request.path.clone();
        let response = self.transport.send(request).await?;
        if let Err(e) = check_status(&response) {
            tracing::debug!(%method, %path, status = response.status, "request failed");
            return Err(e);
        }
        decode(&response)
    }
}

fn to_json(body: &impl Serialize) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn check_status(response: &ApiResponse) -> Result<(), ApiError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(ApiError::from_status(response.status, &response.body))
    }
}

fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}
