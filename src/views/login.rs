//! Login screen.

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;

use std::sync::Arc;

use super::forms::LoginForm;
use super::{ActionError, FormStatus, SubmitGate, post_auth_target};
use crate::auth::Authenticator;
use crate::router::Navigator;

pub const LOGIN_FAILED: &str = "Login failed";

pub struct LoginView {
    auth: Authenticator,
    navigator: Arc<dyn Navigator>,
    redirect: Option<String>,
    gate: SubmitGate,
}

impl LoginView {
    /// `redirect` is the resume target carried by the login route, if any.
    pub fn new(auth: Authenticator, navigator: Arc<dyn Navigator>, redirect: Option<String>) -> Self {
        Self { auth, navigator, redirect, gate: SubmitGate::default() }
    }

    pub fn status(&self) -> FormStatus {
        self.gate.status()
    }

    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    /// Validate, log in, and navigate. Returns the path navigated to.
    ///
    /// # Errors
    ///
    /// `Invalid` for a blank field, `Busy` while a submit is loading, and
    /// `Failed("Login failed")` when the backend rejects the credentials.
    pub async fn submit(&self, form: &LoginForm) -> Result<String, ActionError> {
        let request = form.validate().map_err(|e| {
            let error = ActionError::from(e);
            self.gate.reject(&error);
            error
        })?;
        let Some(in_flight) = self.gate.try_begin() else {
            return Err(ActionError::Busy);
        };
        if let Err(e) = self.auth.login(&request.username, &request.password).await {
            tracing::warn!(error = %e, username = %request.username, "login failed");
            return Err(in_flight.fail(LOGIN_FAILED.to_owned()));
        }
        drop(in_flight);
        let target = post_auth_target(self.redirect.as_deref());
        self.navigator.navigate(&target);
        Ok(target)
    }
}
