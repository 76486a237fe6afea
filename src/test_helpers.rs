//! Shared fakes for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::auth::LogoutHandler;
use crate::net::api::ApiClient;
use crate::net::error::ApiError;
use crate::net::interceptor::AuthInterceptor;
use crate::net::transport::{ApiRequest, ApiResponse, Transport};
use crate::router::History;
use crate::session::Session;

struct Scripted {
    delay: Option<Duration>,
    result: Result<ApiResponse, ApiError>,
}

/// Transport that records requests and replays queued responses in order.
/// An empty queue answers 500.
#[derive(Default)]
pub struct ScriptedTransport {
    requests: Mutex<Vec<ApiRequest>>,
    responses: Mutex<VecDeque<Scripted>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, status: u16, body: Value) {
        self.push_scripted(None, Ok(ApiResponse::new(status, body.to_string())));
    }

    pub fn push_raw(&self, status: u16, body: &str) {
        self.push_scripted(None, Ok(ApiResponse::new(status, body)));
    }

    pub fn push_delayed(&self, delay: Duration, status: u16, body: Value) {
        self.push_scripted(Some(delay), Ok(ApiResponse::new(status, body.to_string())));
    }

    pub fn push_transport_error(&self, message: &str) {
        self.push_scripted(None, Err(ApiError::Transport(message.to_owned())));
    }

    fn push_scripted(&self, delay: Option<Duration>, result: Result<ApiResponse, ApiError>) {
        self.responses.lock().unwrap().push_back(Scripted { delay, result });
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ApiRequest {
        self.requests().pop().expect("no request recorded")
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Scripted { delay, result }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Ok(ApiResponse::new(500, r#"{"detail":"no scripted response"}"#)),
        }
    }
}

/// Session + history + interceptor chain over a scripted transport.
pub struct Stack {
    pub session: Session,
    pub history: Arc<History>,
    pub transport: Arc<ScriptedTransport>,
    pub logout: LogoutHandler,
    pub api: ApiClient,
}

pub fn stack(token: Option<&str>, start_path: &str) -> Stack {
    let session = Session::in_memory();
    if let Some(token) = token {
        session.set(token).unwrap();
    }
    let history = Arc::new(History::new(start_path));
    let transport = ScriptedTransport::new();
    let logout = LogoutHandler::new(session.clone(), history.clone());
    let interceptor = AuthInterceptor::new(transport.clone(), session.clone(), logout.clone());
    let api = ApiClient::new(Arc::new(interceptor));
    Stack { session, history, transport, logout, api }
}

pub fn sensor_json(id: i64, name: &str) -> Value {
    serde_json::json!({ "id": id, "name": name, "model": "DHT22", "description": null })
}

pub fn reading_json(id: i64, temperature: f64, humidity: f64, timestamp: &str) -> Value {
    serde_json::json!({ "id": id, "temperature": temperature, "humidity": humidity, "timestamp": timestamp })
}

pub fn page_json(items: Vec<Value>, count: u64, page: u32, page_size: u32) -> Value {
    serde_json::json!({ "items": items, "count": count, "page": page, "page_size": page_size })
}
