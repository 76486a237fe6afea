//! Sensor dashboard client.
//!
//! Authenticates against the sensors REST backend, keeps the bearer-token
//! session, and drives the dashboard screens (login, registration, sensor
//! list, sensor detail with readings chart). The `sensordash` binary is a
//! terminal front end over this library.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Bearer-token session over a durable token store |
//! | [`net`] | Wire types, transport, auth interceptor, API client |
//! | [`auth`] | Login/registration and the shared logout sequence |
//! | [`router`] | Route table, navigation history, auth guard |
//! | [`idle`] | Inactivity watchdog that forces logout |
//! | [`views`] | Screen controllers, forms, pagination, chart data |
//! | [`config`] | Environment-driven configuration |
//! | [`app`] | Composition root wiring everything together |

pub mod app;
pub mod auth;
pub mod config;
pub mod idle;
pub mod net;
pub mod router;
pub mod session;
pub mod views;

#[cfg(test)]
pub(crate) mod test_helpers;
