//! Backend access: wire types, the HTTP transport seam, the auth
//! interceptor, and the typed API client.
//!
//! DESIGN
//! ======
//! Requests flow `ApiClient -> AuthInterceptor -> HttpTransport`. Every layer
//! implements or consumes the same `Transport` trait, so tests swap the
//! bottom layer for a scripted fake without touching the interceptor.

pub mod api;
pub mod error;
pub mod interceptor;
pub mod transport;
pub mod types;

pub use api::ApiClient;
pub use error::ApiError;
pub use transport::{ApiRequest, ApiResponse, AuthPolicy, HttpTransport, Transport};
