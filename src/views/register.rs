//! Registration screen.

#[cfg(test)]
#[path = "register_test.rs"]
mod register_test;

use std::sync::Arc;

use super::forms::RegisterForm;
use super::{ActionError, FormStatus, SubmitGate, post_auth_target};
use crate::auth::{Authenticator, RegistrationMode};
use crate::router::Navigator;

pub const REGISTER_FAILED: &str = "Registration or auto-login failed";

pub struct RegisterView {
    auth: Authenticator,
    navigator: Arc<dyn Navigator>,
    mode: RegistrationMode,
    redirect: Option<String>,
    gate: SubmitGate,
}

impl RegisterView {
    pub fn new(
        auth: Authenticator,
        navigator: Arc<dyn Navigator>,
        mode: RegistrationMode,
        redirect: Option<String>,
    ) -> Self {
        Self { auth, navigator, mode, redirect, gate: SubmitGate::default() }
    }

    pub fn status(&self) -> FormStatus {
        self.gate.status()
    }

    /// Register, sign in per the configured mode, and navigate.
    ///
    /// # Errors
    ///
    /// `Invalid` for a failing field, `Busy` while loading, and `Failed` with
    /// the backend's message (or a generic one) when registration or the
    /// follow-up login fails.
    pub async fn submit(&self, form: &RegisterForm) -> Result<String, ActionError> {
        let request = form.validate().map_err(|e| {
            let error = ActionError::from(e);
            self.gate.reject(&error);
            error
        })?;
        let Some(in_flight) = self.gate.try_begin() else {
            return Err(ActionError::Busy);
        };
        if let Err(e) = self.auth.register(&request, self.mode).await {
            tracing::warn!(error = %e, username = %request.username, "registration failed");
            return Err(in_flight.fail(e.user_message(REGISTER_FAILED)));
        }
        drop(in_flight);
        let target = post_auth_target(self.redirect.as_deref());
        self.navigator.navigate(&target);
        Ok(target)
    }
}
