//! View controllers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each controller owns the state one screen renders from: loading flag,
//! last error, and the data it fetched. Controllers talk to the backend only
//! through `ApiClient` and move between screens only through `Navigator`.
//! Failures become view state; nothing here panics or propagates past the
//! controller.

pub mod chart;
pub mod forms;
pub mod login;
pub mod pagination;
pub mod register;
pub mod sensor_detail;
pub mod sensors_list;

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::router::{SENSORS_PATH, safe_resume_target};
use forms::FormError;

/// Why a user action did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// A submit for this form is already in flight.
    #[error("request already in progress")]
    Busy,
    #[error(transparent)]
    Invalid(#[from] FormError),
    /// The backend or transport rejected the action; carries the display message.
    #[error("{0}")]
    Failed(String),
}

/// Loading/error flags for a single-submit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormStatus {
    pub loading: bool,
    pub error: Option<String>,
}

/// Serializes submits: a second submit while one is loading is ignored.
#[derive(Debug, Default)]
pub(crate) struct SubmitGate {
    status: Mutex<FormStatus>,
}

impl SubmitGate {
    pub(crate) fn status(&self) -> FormStatus {
        lock(&self.status).clone()
    }

    pub(crate) fn reject(&self, error: &ActionError) {
        lock(&self.status).error = Some(error.to_string());
    }

    /// Mark a submit as started. `None` when one is already loading.
    pub(crate) fn try_begin(&self) -> Option<InFlight<'_>> {
        let mut status = lock(&self.status);
        if status.loading {
            return None;
        }
        status.loading = true;
        status.error = None;
        Some(InFlight { gate: self })
    }
}

/// Clears the loading flag when dropped, including when the submitting
/// future is cancelled.
pub(crate) struct InFlight<'a> {
    gate: &'a SubmitGate,
}

impl InFlight<'_> {
    pub(crate) fn fail(self, message: String) -> ActionError {
        lock(&self.gate.status).error = Some(message.clone());
        ActionError::Failed(message)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(&self.gate.status).loading = false;
    }
}

/// Where to go after a successful login or registration.
pub fn post_auth_target(redirect: Option<&str>) -> String {
    safe_resume_target(redirect).unwrap_or(SENSORS_PATH).to_owned()
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
