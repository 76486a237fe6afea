//! Login, registration, and the shared logout sequence.
//!
//! SYSTEM CONTEXT
//! ==============
//! `LogoutHandler` is the single path that ends a session. The interceptor
//! (401/403), the idle monitor (timeout), and explicit logout all call it,
//! possibly concurrently, so it must be idempotent: clearing an absent
//! session and navigating to a login view that is already showing are
//! no-ops.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::Arc;

use crate::net::api::ApiClient;
use crate::net::error::ApiError;
use crate::net::types::{LoginRequest, RegisterRequest};
use crate::router::{LOGIN_PATH, Navigator};
use crate::session::{Session, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    UserRequested,
    Unauthorized,
    IdleTimeout,
}

/// Clears the session and sends the user to the login view.
#[derive(Clone)]
pub struct LogoutHandler {
    session: Session,
    navigator: Arc<dyn Navigator>,
}

impl LogoutHandler {
    pub fn new(session: Session, navigator: Arc<dyn Navigator>) -> Self {
        Self { session, navigator }
    }

    /// Run the logout sequence. Returns whether a token was actually cleared.
    pub fn force_logout(&self, reason: LogoutReason) -> bool {
        let cleared = self.session.clear();
        if cleared {
            tracing::info!(?reason, "session ended");
        } else {
            tracing::debug!(?reason, "logout requested with no active session");
        }
        let current = self.navigator.current_path();
        if !is_login_path(&current) {
            self.navigator.navigate(LOGIN_PATH);
        }
        cleared
    }
}

fn is_login_path(path: &str) -> bool {
    path == LOGIN_PATH || path.starts_with("/login?")
}

// =============================================================================
// AUTHENTICATOR
// =============================================================================

/// Whether registration signs the user in from the registration response or
/// with a second login call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationMode {
    /// Register, then call login with the same credentials.
    #[default]
    ExplicitLogin,
    /// Use tokens from the registration response; fall back to an explicit
    /// login when the backend did not issue any.
    AutoLogin,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("could not store session: {0}")]
    Session(#[from] SessionError),
}

impl AuthError {
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api(e) => e.user_message(fallback),
            Self::Session(_) => fallback.to_owned(),
        }
    }
}

#[derive(Clone)]
pub struct Authenticator {
    api: ApiClient,
    session: Session,
    logout: LogoutHandler,
}

impl Authenticator {
    pub fn new(api: ApiClient, session: Session, logout: LogoutHandler) -> Self {
        Self { api, session, logout }
    }

    /// Exchange credentials for a token and store it.
    ///
    /// On failure nothing is stored and any existing session is untouched.
    ///
    /// # Errors
    ///
    /// Returns the API failure, or a storage failure persisting the token.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let body = LoginRequest { username: username.to_owned(), password: password.to_owned() };
        let pair = self.api.login(&body).await?;
        self.session.set(&pair.access)?;
        tracing::info!(username, "logged in");
        Ok(())
    }

    /// Create an account and sign in according to `mode`.
    ///
    /// # Errors
    ///
    /// Returns the registration or login failure.
    pub async fn register(&self, body: &RegisterRequest, mode: RegistrationMode) -> Result<(), AuthError> {
        let response = self.api.register(body).await?;
        tracing::info!(username = %body.username, ?mode, "registered");
        if mode == RegistrationMode::AutoLogin {
            if let Some(access) = response.access_token() {
                self.session.set(access)?;
                return Ok(());
            }
            tracing::debug!("registration response carried no token; logging in explicitly");
        }
        self.login(&body.username, &body.password).await
    }

    /// Explicit user logout.
    pub fn logout(&self) {
        self.logout.force_logout(LogoutReason::UserRequested);
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn logout_handler(&self) -> &LogoutHandler {
        &self.logout
    }
}
