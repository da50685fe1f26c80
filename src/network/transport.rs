//! HTTP transports used by [`NetworkClient`](super::NetworkClient).
//!
//! - `ReqwestTransport`: real HTTPS client with a host-controlled online flag.
//! - `InMemoryTransport`: records requests and answers with canned responses,
//!   for tests and offline tooling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Connectivity as last reported by the host.
    fn is_online(&self) -> bool;

    /// Perform the request. Errors are transport failures, not HTTP statuses.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    online: Arc<AtomicBool>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Shared flag the host flips when the platform reports connectivity changes.
    pub fn online_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.online)
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| e.to_string())?;
        Ok(HttpResponse { status, body })
    }
}

/// Records every request; answers with a configurable status and body.
pub struct InMemoryTransport {
    requests: Mutex<Vec<HttpRequest>>,
    online: AtomicBool,
    status: AtomicU16,
    /// Status overrides keyed by a URL substring.
    overrides: Mutex<HashMap<String, u16>>,
    get_body: Mutex<String>,
    transport_error: Mutex<Option<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            online: AtomicBool::new(true),
            status: AtomicU16::new(200),
            overrides: Mutex::new(HashMap::new()),
            get_body: Mutex::new(String::new()),
            transport_error: Mutex::new(None),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::Relaxed);
    }

    /// Answer requests whose URL contains `fragment` with `status`.
    pub fn set_status_for(&self, fragment: impl Into<String>, status: u16) {
        lock(&self.overrides).insert(fragment.into(), status);
    }

    pub fn set_get_body(&self, body: impl Into<String>) {
        *lock(&self.get_body) = body.into();
    }

    pub fn fail_with(&self, error: impl Into<String>) {
        *lock(&self.transport_error) = Some(error.into());
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Requests whose URL contains `fragment`.
    pub fn requests_to(&self, fragment: &str) -> Vec<HttpRequest> {
        lock(&self.requests)
            .iter()
            .filter(|request| request.url.contains(fragment))
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for InMemoryTransport {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let status = lock(&self.overrides)
            .iter()
            .find(|(fragment, _)| request.url.contains(fragment.as_str()))
            .map(|(_, status)| *status)
            .unwrap_or_else(|| self.status.load(Ordering::Relaxed));
        let body = match request.method {
            HttpMethod::Get => lock(&self.get_body).clone(),
            HttpMethod::Post => String::new(),
        };
        lock(&self.requests).push(request);

        if let Some(error) = lock(&self.transport_error).clone() {
            return Err(error);
        }
        Ok(HttpResponse { status, body })
    }
}
