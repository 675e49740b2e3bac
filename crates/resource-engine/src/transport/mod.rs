//! # Transport & Fetch Interception
//!
//! Every network operation the engine performs goes through a [`Transport`]. The
//! engine itself only ever talks to an [`InterceptChain`]: a transport that first
//! **offers** the request to a list of observers ([`Interceptor`]s) as a
//! [`FetchEvent`], and only falls back to a real transport when nobody answered.
//!
//! ```text
//!   engine ──Request──▶ InterceptChain ──FetchEvent──▶ interceptor 1
//!                            │                         interceptor 2  (respond_with?)
//!                            │                         ...
//!                            └─ nobody responded ──▶ fallback Transport (HTTP)
//! ```
//!
//! This is the seam tests, offline shells and request routers use to substitute or
//! observe any request without touching the engine.
//!
//! ## Failure semantics
//!
//! Transports report network-level failures as [`TransportError`]. A non-2xx
//! [`Response`] is *not* a transport error; the engine decides what it means
//! (translation into business errors, or a generic failure). Nothing is retried.

pub mod http;
pub mod intercept;

pub use http::HttpTransport;
pub use intercept::{FetchEvent, InterceptChain, InterceptError, Interceptor, ResponseFuture};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// HTTP verbs the engine issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound request. Header names are stored lowercase.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// A response as seen by the engine. Header names are stored lowercase.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// A JSON response with the given status.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string()).with_header("content-type", "application/json")
    }

    /// A `200 OK` JSON response.
    pub fn ok_json(body: Value) -> Self {
        Self::json(200, &body)
    }

    /// A `204 No Content` response.
    pub fn no_content() -> Self {
        Self::new(204, Vec::new())
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Network-level failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid request URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Request cancelled by an interceptor")]
    Cancelled,
    #[error("No route for {method} {url}")]
    Unroutable { method: Method, url: String },
    #[error("Responder dropped before answering")]
    Dropped,
    #[error("Unexpected request: {0}")]
    Unexpected(String),
}

/// Strategy performing a request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

/// Fallback for offline shells: every request that no interceptor answered fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unroutable;

#[async_trait]
impl Transport for Unroutable {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        Err(TransportError::Unroutable {
            method: request.method,
            url: request.url,
        })
    }
}
