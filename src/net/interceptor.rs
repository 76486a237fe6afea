//! Bearer-token interceptor wrapping every outbound request.
//!
//! DESIGN
//! ======
//! A `Transport` decorator. Classification comes from the request's
//! `AuthPolicy`, set by the API client per operation:
//! - `Protected`: attach the session token when present; a 401/403 reply
//!   runs the shared logout sequence and is then passed back unchanged so
//!   the caller still sees the original failure. A reply to a token that was
//!   replaced while the request was in flight leaves the new session alone.
//! - `Public`: never carries a token and never clears the session, so a
//!   failed login cannot wipe an unrelated session.

#[cfg(test)]
#[path = "interceptor_test.rs"]
mod interceptor_test;

use std::sync::Arc;

use super::error::{ApiError, is_auth_failure_status};
use super::transport::{ApiRequest, ApiResponse, AuthPolicy, Transport};
use crate::auth::{LogoutHandler, LogoutReason};
use crate::session::Session;

pub struct AuthInterceptor {
    inner: Arc<dyn Transport>,
    session: Session,
    logout: LogoutHandler,
}

impl AuthInterceptor {
    pub fn new(inner: Arc<dyn Transport>, session: Session, logout: LogoutHandler) -> Self {
        Self { inner, session, logout }
    }

    fn prepare(&self, mut request: ApiRequest) -> ApiRequest {
        request.bearer = match request.auth {
            AuthPolicy::Protected => self.session.get(),
            AuthPolicy::Public => None,
        };
        request
    }
}

#[async_trait::async_trait]
impl Transport for AuthInterceptor {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let request = self.prepare(request);
        let protected = request.is_protected();
        let path = request.path.clone();
        let sent_token = request.bearer.clone();

        let response = self.inner.send(request).await?;

        if protected && is_auth_failure_status(response.status) {
            // A rejection of a token the session has since replaced says
            // nothing about the current login.
            if self.session.get() != sent_token {
                tracing::debug!(%path, status = response.status, "rejected token already replaced; keeping session");
                return Ok(response);
            }
            tracing::warn!(%path, status = response.status, "protected request rejected; forcing logout");
            self.logout.force_logout(LogoutReason::Unauthorized);
        }
        Ok(response)
    }
}
