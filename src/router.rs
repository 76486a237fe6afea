//! Route table, navigation history, and the authentication route guard.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every view is reached through a path. `Router::resolve` applies the route
//! table's static redirects and then the `AuthGuard` before a view is
//! materialized. The guard only reads the session; it never mutates it.

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;

use std::sync::{Mutex, PoisonError};

use url::form_urlencoded;

use crate::net::types::SensorId;
use crate::session::Session;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const SENSORS_PATH: &str = "/sensors";
pub const ROOT_PATH: &str = "/";
pub const REDIRECT_PARAM: &str = "redirect";

// =============================================================================
// NAVIGATION
// =============================================================================

/// Destination for programmatic navigation.
pub trait Navigator: Send + Sync {
    /// Navigate to `path`. Navigating to the current path is a no-op.
    fn navigate(&self, path: &str);

    fn current_path(&self) -> String;
}

/// In-memory navigation history.
#[derive(Debug)]
pub struct History {
    entries: Mutex<Vec<String>>,
}

impl History {
    pub fn new(initial: &str) -> Self {
        Self { entries: Mutex::new(vec![initial.to_owned()]) }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(ROOT_PATH)
    }
}

impl Navigator for History {
    fn navigate(&self, path: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.last().is_some_and(|current| current == path) {
            return;
        }
        tracing::debug!(path, "navigate");
        entries.push(path.to_owned());
    }

    fn current_path(&self) -> String {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or_else(|| ROOT_PATH.to_owned())
    }
}

// =============================================================================
// ROUTES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login { redirect: Option<String> },
    Register { redirect: Option<String> },
    Sensors,
    SensorDetail { id: SensorId },
}

/// Result of matching a path against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    Route(Route),
    /// Static redirect declared by the table (`/` -> `/sensors`, unknown -> `/`).
    Redirect(String),
}

impl Route {
    /// Match `path` (optionally carrying a query string) against the table.
    pub fn parse(path: &str) -> RouteMatch {
        let (path_part, query) = split_path(path);
        let trimmed = path_part.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => RouteMatch::Redirect(SENSORS_PATH.to_owned()),
            ["login"] => RouteMatch::Route(Route::Login { redirect: query_param(query, REDIRECT_PARAM) }),
            ["register"] => RouteMatch::Route(Route::Register { redirect: query_param(query, REDIRECT_PARAM) }),
            ["sensors"] => RouteMatch::Route(Route::Sensors),
            ["sensors", id] => match id.parse::<SensorId>() {
                Ok(id) if id > 0 => RouteMatch::Route(Route::SensorDetail { id }),
                _ => RouteMatch::Redirect(ROOT_PATH.to_owned()),
            },
            _ => RouteMatch::Redirect(ROOT_PATH.to_owned()),
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Sensors | Route::SensorDetail { .. })
    }

    /// Canonical path for this route.
    pub fn path(&self) -> String {
        match self {
            Route::Login { redirect } => with_redirect(LOGIN_PATH, redirect.as_deref()),
            Route::Register { redirect } => with_redirect(REGISTER_PATH, redirect.as_deref()),
            Route::Sensors => SENSORS_PATH.to_owned(),
            Route::SensorDetail { id } => sensor_path(*id),
        }
    }
}

pub fn sensor_path(id: SensorId) -> String {
    format!("{SENSORS_PATH}/{id}")
}

fn split_path(path: &str) -> (&str, &str) {
    match path.split_once('?') {
        Some((p, q)) => (p, q),
        None => (path, ""),
    }
}

fn query_param(query: &str, key: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn with_redirect(base: &str, redirect: Option<&str>) -> String {
    match redirect {
        Some(target) => {
            let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
            format!("{base}?{REDIRECT_PARAM}={encoded}")
        }
        None => base.to_owned(),
    }
}

/// Accept only same-origin absolute paths as post-login targets.
pub fn safe_resume_target(target: Option<&str>) -> Option<&str> {
    target.filter(|t| t.starts_with('/') && !t.starts_with("//") && !t.starts_with(LOGIN_PATH))
}

// =============================================================================
// GUARD
// =============================================================================

/// How the guard builds its login redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardMode {
    /// Carry the requested path so login can resume there.
    #[default]
    Resume,
    /// Always redirect to the bare login route.
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect { location: String, resume: Option<String> },
}

#[derive(Debug, Clone)]
pub struct AuthGuard {
    session: Session,
    mode: GuardMode,
}

impl AuthGuard {
    pub fn new(session: Session, mode: GuardMode) -> Self {
        Self { session, mode }
    }

    pub fn check(&self, requested_path: &str) -> GuardDecision {
        if self.session.is_authenticated() {
            return GuardDecision::Proceed;
        }
        let resume = match self.mode {
            GuardMode::Resume => Some(requested_path.to_owned()),
            GuardMode::Fixed => None,
        };
        let location = with_redirect(LOGIN_PATH, resume.as_deref());
        tracing::info!(requested = requested_path, %location, "unauthenticated; redirecting to login");
        GuardDecision::Redirect { location, resume }
    }
}

// =============================================================================
// ROUTER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Render(Route),
    Redirect(String),
}

/// Maximum static redirects followed before giving up on a path.
const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone)]
pub struct Router {
    guard: AuthGuard,
}

impl Router {
    pub fn new(guard: AuthGuard) -> Self {
        Self { guard }
    }

    pub fn guard(&self) -> &AuthGuard {
        &self.guard
    }

    /// Resolve `path` to the route to render, following static redirects and
    /// applying the guard to protected routes.
    pub fn resolve(&self, path: &str) -> Resolution {
        let mut current = path.to_owned();
        for _ in 0..MAX_REDIRECTS {
            match Route::parse(&current) {
                RouteMatch::Redirect(next) => current = next,
                RouteMatch::Route(route) if route.is_protected() => {
                    return match self.guard.check(&route.path()) {
                        GuardDecision::Proceed => Resolution::Render(route),
                        GuardDecision::Redirect { location, .. } => Resolution::Redirect(location),
                    };
                }
                RouteMatch::Route(route) => return Resolution::Render(route),
            }
        }
        Resolution::Redirect(SENSORS_PATH.to_owned())
    }
}
