//! Sensors list screen: paged, searchable, with inline create.

#[cfg(test)]
#[path = "sensors_list_test.rs"]
mod sensors_list_test;

use std::sync::{Arc, Mutex};

use super::forms::SensorForm;
use super::pagination::PageState;
use super::{ActionError, lock};
use crate::net::api::ApiClient;
use crate::net::types::{Sensor, SensorId, SensorQuery};
use crate::router::{Navigator, sensor_path};

pub const FETCH_SENSORS_FAILED: &str = "Failed to fetch sensors";
pub const CREATE_SENSOR_FAILED: &str = "Failed to create sensor";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorsListState {
    pub sensors: Vec<Sensor>,
    pub pages: PageState,
    /// Search term; blank means no filter.
    pub query: String,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct SensorsListView {
    api: ApiClient,
    navigator: Arc<dyn Navigator>,
    state: Mutex<SensorsListState>,
}

impl SensorsListView {
    pub fn new(api: ApiClient, navigator: Arc<dyn Navigator>, page_size: u32) -> Self {
        let state = SensorsListState {
            sensors: Vec::new(),
            pages: PageState::new(page_size),
            query: String::new(),
            loading: false,
            error: None,
        };
        Self { api, navigator, state: Mutex::new(state) }
    }

    pub fn state(&self) -> SensorsListState {
        lock(&self.state).clone()
    }

    /// Fetch the current page. Failures land in `state().error` and leave the
    /// page number on the page still shown.
    pub async fn load(&self) {
        let query = {
            let mut state = lock(&self.state);
            state.loading = true;
            state.error = None;
            SensorQuery { page: state.pages.request(), q: Some(state.query.clone()) }
        };
        let result = self.api.list_sensors(&query).await;
        let mut state = lock(&self.state);
        state.loading = false;
        match result {
            Ok(page) => {
                state.pages.absorb(&page);
                state.sensors = page.items;
            }
            Err(e) => {
                tracing::warn!(error = %e, "sensor list fetch failed");
                state.pages.rollback();
                state.error = Some(e.user_message(FETCH_SENSORS_FAILED));
            }
        }
    }

    /// Set the search term and reload from page 1.
    pub async fn search(&self, q: &str) {
        {
            let mut state = lock(&self.state);
            q.trim().clone_into(&mut state.query);
            state.pages.reset();
        }
        self.load().await;
    }

    /// Load a specific page.
    pub async fn load_page(&self, page: u32) {
        lock(&self.state).pages.jump(page);
        self.load().await;
    }

    /// Load the next page. Returns false without a request on the last page.
    pub async fn next_page(&self) -> bool {
        if !lock(&self.state).pages.next() {
            return false;
        }
        self.load().await;
        true
    }

    pub async fn prev_page(&self) -> bool {
        if !lock(&self.state).pages.prev() {
            return false;
        }
        self.load().await;
        true
    }

    /// Create a sensor and reload the current page.
    ///
    /// # Errors
    ///
    /// `Invalid` when name or model is blank; `Failed` with the backend's
    /// message otherwise.
    pub async fn create(&self, form: &SensorForm) -> Result<Sensor, ActionError> {
        let body = form.validate_create()?;
        match self.api.create_sensor(&body).await {
            Ok(sensor) => {
                tracing::info!(id = sensor.id, name = %sensor.name, "sensor created");
                self.load().await;
                Ok(sensor)
            }
            Err(e) => {
                let message = e.user_message(CREATE_SENSOR_FAILED);
                lock(&self.state).error = Some(message.clone());
                Err(ActionError::Failed(message))
            }
        }
    }

    /// Navigate to a sensor's detail screen.
    pub fn open(&self, id: SensorId) {
        self.navigator.navigate(&sensor_path(id));
    }
}
