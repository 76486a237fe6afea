//! Sensor detail screen: metadata edit/delete, filtered readings, chart.
//!
//! DESIGN
//! ======
//! Readings fetches run as spawned tasks. Starting a fetch aborts the one in
//! flight and bumps a generation counter; a response is applied only if its
//! generation is still current, so a slow stale page can never overwrite a
//! newer one. Each applied page publishes a fresh `ChartData` on a watch
//! channel, and `settled` lets callers await a specific fetch.

#[cfg(test)]
#[path = "sensor_detail_test.rs"]
mod sensor_detail_test;

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::chart::ChartData;
use super::forms::{FilterForm, ReadingForm, SensorForm};
use super::pagination::PageState;
use super::{ActionError, lock};
use crate::net::api::ApiClient;
use crate::net::error::ApiError;
use crate::net::types::{Paginated, Reading, ReadingQuery, Sensor, SensorId, TimeRange};
use crate::router::{Navigator, SENSORS_PATH};

pub const FETCH_SENSOR_FAILED: &str = "Failed to fetch sensor";
pub const FETCH_READINGS_FAILED: &str = "Failed to fetch readings";
pub const UPDATE_SENSOR_FAILED: &str = "Failed to update sensor";
pub const DELETE_SENSOR_FAILED: &str = "Failed to delete sensor";
pub const CREATE_READING_FAILED: &str = "Failed to create reading";

/// Readings shown in the "latest" table.
pub const LATEST_COUNT: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct DetailState {
    pub sensor: Option<Sensor>,
    /// Current page, ascending by timestamp.
    pub readings: Vec<Reading>,
    pub pages: PageState,
    pub range: TimeRange,
    pub loading: bool,
    pub error: Option<String>,
    pub editing: bool,
    pub edit_form: SensorForm,
}

#[derive(Default)]
struct FetchSlot {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    api: ApiClient,
    navigator: Arc<dyn Navigator>,
    sensor_id: SensorId,
    state: Mutex<DetailState>,
    fetch: Mutex<FetchSlot>,
    chart_tx: watch::Sender<Option<Arc<ChartData>>>,
    settled_tx: watch::Sender<u64>,
}

#[derive(Clone)]
pub struct SensorDetailView {
    inner: Arc<Inner>,
}

impl SensorDetailView {
    pub fn new(api: ApiClient, navigator: Arc<dyn Navigator>, sensor_id: SensorId, page_size: u32) -> Self {
        let state = DetailState {
            sensor: None,
            readings: Vec::new(),
            pages: PageState::new(page_size),
            range: TimeRange::default(),
            loading: false,
            error: None,
            editing: false,
            edit_form: SensorForm::default(),
        };
        let (chart_tx, _) = watch::channel(None);
        let (settled_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                api,
                navigator,
                sensor_id,
                state: Mutex::new(state),
                fetch: Mutex::new(FetchSlot::default()),
                chart_tx,
                settled_tx,
            }),
        }
    }

    pub fn sensor_id(&self) -> SensorId {
        self.inner.sensor_id
    }

    pub fn state(&self) -> DetailState {
        lock(&self.inner.state).clone()
    }

    /// Data-ready signal for chart renderers. Holds `None` until the first
    /// readings page is applied.
    pub fn chart(&self) -> watch::Receiver<Option<Arc<ChartData>>> {
        self.inner.chart_tx.subscribe()
    }

    /// Load the sensor and the first readings page, waiting for both.
    pub async fn open(&self) {
        let generation = self.fetch_readings();
        self.load_sensor().await;
        self.settled(generation).await;
    }

    pub async fn load_sensor(&self) {
        match self.inner.api.get_sensor(self.inner.sensor_id).await {
            Ok(sensor) => {
                let mut state = lock(&self.inner.state);
                state.edit_form = SensorForm::from_sensor(&sensor);
                state.sensor = Some(sensor);
            }
            Err(e) => {
                tracing::warn!(sensor_id = self.inner.sensor_id, error = %e, "sensor fetch failed");
                lock(&self.inner.state).error = Some(e.user_message(FETCH_SENSOR_FAILED));
            }
        }
    }

    // =========================================================================
    // READINGS
    // =========================================================================

    /// Start fetching the current readings page, superseding any fetch in
    /// flight. Returns the fetch's generation for use with [`Self::settled`].
    pub fn fetch_readings(&self) -> u64 {
        let mut slot = lock(&self.inner.fetch);
        if let Some(task) = slot.task.take() {
            task.abort();
        }
        slot.generation += 1;
        let generation = slot.generation;

        let query = {
            let mut state = lock(&self.inner.state);
            state.loading = true;
            state.error = None;
            ReadingQuery { page: state.pages.request(), range: state.range }
        };

        let api = self.inner.api.clone();
        let sensor_id = self.inner.sensor_id;
        let weak = Arc::downgrade(&self.inner);
        slot.task = Some(tokio::spawn(async move {
            let result = api.list_readings(sensor_id, &query).await;
            if let Some(inner) = weak.upgrade() {
                inner.finish_fetch(generation, result);
            }
        }));
        generation
    }

    /// Wait until fetch `generation` (or a later one) has been applied.
    pub async fn settled(&self, generation: u64) {
        let mut rx = self.inner.settled_tx.subscribe();
        if rx.wait_for(|done| *done >= generation).await.is_err() {
            tracing::debug!(generation, "settled signal closed");
        }
    }

    /// Apply a date filter and reload from page 1.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for an unparsable or inverted range; nothing is
    /// fetched in that case.
    pub fn apply_filter(&self, filter: &FilterForm) -> Result<u64, ActionError> {
        let range = filter.validate()?;
        {
            let mut state = lock(&self.inner.state);
            state.range = range;
            state.pages.reset();
        }
        Ok(self.fetch_readings())
    }

    /// Move to the next page. `None` (and no request) on the last page.
    pub fn next_page(&self) -> Option<u64> {
        if !lock(&self.inner.state).pages.next() {
            return None;
        }
        Some(self.fetch_readings())
    }

    pub fn prev_page(&self) -> Option<u64> {
        if !lock(&self.inner.state).pages.prev() {
            return None;
        }
        Some(self.fetch_readings())
    }

    /// Fetch a specific page of the current range.
    pub fn go_to_page(&self, page: u32) -> u64 {
        lock(&self.inner.state).pages.jump(page);
        self.fetch_readings()
    }

    pub fn total_pages(&self) -> u64 {
        lock(&self.inner.state).pages.total_pages()
    }

    /// Up to `n` most recent readings of the current page, newest first.
    pub fn latest(&self, n: usize) -> Vec<Reading> {
        lock(&self.inner.state).readings.iter().rev().take(n).cloned().collect()
    }

    /// Create a reading and reload the current page.
    ///
    /// # Errors
    ///
    /// `Invalid` for missing or non-numeric fields; `Failed` with the
    /// backend's message otherwise.
    pub async fn add_reading(&self, form: &ReadingForm) -> Result<Reading, ActionError> {
        let body = form.validate()?;
        match self.inner.api.create_reading(self.inner.sensor_id, &body).await {
            Ok(reading) => {
                tracing::info!(sensor_id = self.inner.sensor_id, reading_id = reading.id, "reading created");
                let generation = self.fetch_readings();
                self.settled(generation).await;
                Ok(reading)
            }
            Err(e) => Err(self.inner.fail(&e, CREATE_READING_FAILED)),
        }
    }

    // =========================================================================
    // SENSOR EDIT / DELETE
    // =========================================================================

    /// Enter edit mode with the form reset to the loaded sensor.
    pub fn start_edit(&self) -> bool {
        let mut state = lock(&self.inner.state);
        let Some(form) = state.sensor.as_ref().map(SensorForm::from_sensor) else {
            return false;
        };
        state.edit_form = form;
        state.editing = true;
        true
    }

    pub fn cancel_edit(&self) {
        lock(&self.inner.state).editing = false;
    }

    /// Save the edit form with a full update (PUT).
    ///
    /// # Errors
    ///
    /// `Invalid` when name or model is blank; `Failed` with the backend's
    /// message otherwise. Edit mode stays on after a failure.
    pub async fn save(&self, form: &SensorForm) -> Result<Sensor, ActionError> {
        let body = form.validate_update()?;
        match self.inner.api.update_sensor(self.inner.sensor_id, &body).await {
            Ok(updated) => {
                let mut state = lock(&self.inner.state);
                state.edit_form = SensorForm::from_sensor(&updated);
                state.sensor = Some(updated.clone());
                state.editing = false;
                Ok(updated)
            }
            Err(e) => Err(self.inner.fail(&e, UPDATE_SENSOR_FAILED)),
        }
    }

    /// Confirmation text for deleting the loaded sensor.
    pub fn delete_prompt(&self) -> Option<String> {
        lock(&self.inner.state)
            .sensor
            .as_ref()
            .map(|s| format!("Delete sensor \"{}\"? This also deletes its readings.", s.name))
    }

    /// Delete the sensor if `confirmed`, then go back to the list.
    /// Returns whether a delete happened.
    ///
    /// # Errors
    ///
    /// `Failed` with the backend's message; the view stays put.
    pub async fn delete(&self, confirmed: bool) -> Result<bool, ActionError> {
        if !confirmed || lock(&self.inner.state).sensor.is_none() {
            return Ok(false);
        }
        if let Err(e) = self.inner.api.delete_sensor(self.inner.sensor_id).await {
            return Err(self.inner.fail(&e, DELETE_SENSOR_FAILED));
        }
        tracing::info!(sensor_id = self.inner.sensor_id, "sensor deleted");
        self.inner.navigator.navigate(SENSORS_PATH);
        Ok(true)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.fetch).task.take() {
            task.abort();
        }
    }
}

impl Inner {
    fn finish_fetch(&self, generation: u64, result: Result<Paginated<Reading>, ApiError>) {
        // Held until the settled signal is sent so generations publish in order.
        let slot = lock(&self.fetch);
        if slot.generation != generation {
            tracing::debug!(generation, current = slot.generation, "discarding superseded readings page");
            return;
        }
        {
            let mut state = lock(&self.state);
            state.loading = false;
            match result {
                Ok(page) => {
                    state.pages.absorb(&page);
                    let mut readings = page.items;
                    readings.sort_by_key(|r| r.timestamp);
                    let chart = ChartData::from_readings(&readings);
                    state.readings = readings;
                    self.chart_tx.send_replace(Some(Arc::new(chart)));
                }
                Err(e) => {
                    tracing::warn!(sensor_id = self.sensor_id, error = %e, "readings fetch failed");
                    state.pages.rollback();
                    state.error = Some(e.user_message(FETCH_READINGS_FAILED));
                }
            }
        }
        self.settled_tx.send_if_modified(|done| {
            let advanced = generation > *done;
            if advanced {
                *done = generation;
            }
            advanced
        });
    }

    fn fail(&self, error: &ApiError, fallback: &str) -> ActionError {
        tracing::warn!(sensor_id = self.sensor_id, error = %error, "{fallback}");
        let message = error.user_message(fallback);
        lock(&self.state).error = Some(message.clone());
        ActionError::Failed(message)
    }
}
