//! Application wiring.
//!
//! SYSTEM CONTEXT
//! ==============
//! `Dashboard` is the composition root and the single owner that creates the
//! `Session`. Everything else receives a clone of the handle:
//!
//! ```text
//! views -> ApiClient -> AuthInterceptor -> HttpTransport -> backend
//!                          |
//!                          +-- LogoutHandler <-- IdleMonitor
//! ```
//!
//! Navigation always goes through `Dashboard::open`, which applies the route
//! table and guard before recording the path in history.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use std::sync::Arc;

use tokio::sync::Notify;

use crate::auth::{Authenticator, LogoutHandler, LogoutReason};
use crate::config::{ConfigError, DashboardConfig};
use crate::idle::IdleMonitor;
use crate::net::api::ApiClient;
use crate::net::error::ApiError;
use crate::net::interceptor::AuthInterceptor;
use crate::net::transport::{HttpTransport, Transport};
use crate::net::types::SensorId;
use crate::router::{AuthGuard, History, LOGIN_PATH, Navigator, Resolution, Route, Router};
use crate::session::{FileTokenStore, Session, SessionError, TokenStore};
use crate::views::login::LoginView;
use crate::views::register::RegisterView;
use crate::views::sensor_detail::SensorDetailView;
use crate::views::sensors_list::SensorsListView;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("session storage error: {0}")]
    Session(#[from] SessionError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Static redirect hops `open` follows before settling on the login view.
const MAX_NAVIGATION_HOPS: usize = 4;

pub struct Dashboard {
    config: DashboardConfig,
    session: Session,
    history: Arc<History>,
    api: ApiClient,
    auth: Authenticator,
    router: Router,
    idle: IdleMonitor,
    idle_fired: Arc<Notify>,
}

impl Dashboard {
    /// Build the dashboard against the real backend and token file.
    ///
    /// # Errors
    ///
    /// Fails if the persisted token cannot be read or the HTTP client cannot
    /// be built.
    pub fn from_config(config: DashboardConfig) -> Result<Self, AppError> {
        let store = Arc::new(FileTokenStore::new(config.token_file.clone()));
        let transport = Arc::new(HttpTransport::new(&config.base_url, config.timeouts)?);
        Self::with_parts(config, store, transport, LOGIN_PATH)
    }

    /// Build over an explicit token store and transport, starting at
    /// `start_path`.
    ///
    /// # Errors
    ///
    /// Fails if the persisted token cannot be read.
    pub fn with_parts(
        config: DashboardConfig,
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn Transport>,
        start_path: &str,
    ) -> Result<Self, AppError> {
        let session = Session::open(store)?;
        let history = Arc::new(History::new(start_path));
        let logout = LogoutHandler::new(session.clone(), history.clone());
        let interceptor = AuthInterceptor::new(transport, session.clone(), logout.clone());
        let api = ApiClient::new(Arc::new(interceptor));
        let auth = Authenticator::new(api.clone(), session.clone(), logout.clone());
        let router = Router::new(AuthGuard::new(session.clone(), config.guard_mode));

        let idle_fired = Arc::new(Notify::new());
        let signal = idle_fired.clone();
        let idle = IdleMonitor::new(config.idle_window, move || {
            logout.force_logout(LogoutReason::IdleTimeout);
            signal.notify_one();
        });

        tracing::debug!(
            base_url = %config.base_url,
            authenticated = session.is_authenticated(),
            "dashboard initialized"
        );
        Ok(Self { config, session, history, api, auth, router, idle, idle_fired })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn history(&self) -> &Arc<History> {
        &self.history
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn auth(&self) -> &Authenticator {
        &self.auth
    }

    pub fn idle(&self) -> &IdleMonitor {
        &self.idle
    }

    /// Resolves once per idle timeout, after the logout sequence has run.
    pub async fn idle_timed_out(&self) {
        self.idle_fired.notified().await;
    }

    pub fn current_path(&self) -> String {
        self.history.current_path()
    }

    /// Navigate to `path`, following table redirects and the guard. Returns
    /// the route that ends up rendered.
    pub fn open(&self, path: &str) -> Route {
        let mut target = path.to_owned();
        for _ in 0..MAX_NAVIGATION_HOPS {
            match self.router.resolve(&target) {
                Resolution::Render(route) => {
                    self.history.navigate(&route.path());
                    return route;
                }
                Resolution::Redirect(next) => target = next,
            }
        }
        tracing::warn!(path, "navigation did not settle; showing login");
        self.history.navigate(LOGIN_PATH);
        Route::Login { redirect: None }
    }

    // =========================================================================
    // VIEWS
    // =========================================================================

    pub fn login_view(&self, redirect: Option<String>) -> LoginView {
        LoginView::new(self.auth.clone(), self.navigator(), redirect)
    }

    pub fn register_view(&self, redirect: Option<String>) -> RegisterView {
        RegisterView::new(self.auth.clone(), self.navigator(), self.config.registration_mode, redirect)
    }

    pub fn sensors_list_view(&self) -> SensorsListView {
        SensorsListView::new(self.api.clone(), self.navigator(), self.config.sensors_page_size)
    }

    pub fn sensor_detail_view(&self, id: SensorId) -> SensorDetailView {
        SensorDetailView::new(self.api.clone(), self.navigator(), id, self.config.readings_page_size)
    }

    fn navigator(&self) -> Arc<dyn Navigator> {
        self.history.clone()
    }
}
