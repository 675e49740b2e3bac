//! # Fetch Interception
//!
//! A [`FetchEvent`] is offered to every [`Interceptor`] of an [`InterceptChain`],
//! in registration order, **synchronously** and before any real I/O happens.
//!
//! ## Contract
//!
//! - Any interceptor may call [`FetchEvent::respond_with`] with a future resolving
//!   to the response. The **first** call wins; later calls are rejected with
//!   [`InterceptError::AlreadyResponded`] and their future is dropped unpolled.
//! - Interceptors after the responder still see the event (observation is fan-out)
//!   unless one of them calls [`FetchEvent::stop_propagation`].
//! - Interceptors may rewrite the request ([`FetchEvent::request_mut`]) to sign or
//!   reroute it before the fallback transport performs it.
//! - [`FetchEvent::prevent_default`] without responding suppresses the fallback; the
//!   request then fails with [`TransportError::Cancelled`].
//! - If nobody responded and the default was not prevented, the chain's fallback
//!   [`Transport`] performs the request.
//!
//! ```rust
//! use resource_engine::transport::{FetchEvent, InterceptChain, Method, Request, Response, Unroutable};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let chain = InterceptChain::new(Unroutable).with_interceptor(|event: &mut FetchEvent| {
//!     if event.request().url == "/items/1" {
//!         let _ = event.respond(Response::ok_json(json!({"id": 1})));
//!     }
//! });
//!
//! let response = chain.dispatch(Request::new(Method::Get, "/items/1")).await.unwrap();
//! assert_eq!(response.status, 200);
//! assert!(chain.dispatch(Request::new(Method::Get, "/items/2")).await.is_err());
//! # }
//! ```

use super::{Request, Response, Transport, TransportError, Unroutable};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The response capability handed out by interceptors.
pub type ResponseFuture = BoxFuture<'static, Result<Response, TransportError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InterceptError {
    #[error("A response was already supplied for this request")]
    AlreadyResponded,
}

/// A request offer.
pub struct FetchEvent {
    request: Request,
    response: Option<ResponseFuture>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl fmt::Debug for FetchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchEvent")
            .field("request", &self.request)
            .field("responded", &self.response.is_some())
            .field("default_prevented", &self.default_prevented)
            .finish()
    }
}

impl FetchEvent {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: None,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Supplies the response. Only the first call is honored.
    pub fn respond_with<F>(&mut self, response: F) -> Result<(), InterceptError>
    where
        F: Future<Output = Result<Response, TransportError>> + Send + 'static,
    {
        if self.response.is_some() {
            return Err(InterceptError::AlreadyResponded);
        }
        self.response = Some(Box::pin(response));
        Ok(())
    }

    /// Supplies an already available response.
    pub fn respond(&mut self, response: Response) -> Result<(), InterceptError> {
        self.respond_with(async move { Ok(response) })
    }

    pub fn has_responded(&self) -> bool {
        self.response.is_some()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

/// An observer of outbound requests.
pub trait Interceptor: Send + Sync {
    fn on_fetch(&self, event: &mut FetchEvent);
}

impl<F> Interceptor for F
where
    F: Fn(&mut FetchEvent) + Send + Sync,
{
    fn on_fetch(&self, event: &mut FetchEvent) {
        self(event)
    }
}

/// Ordered interceptors in front of a fallback transport.
///
/// Cheap to clone; clones share the interceptors and the fallback.
#[derive(Clone)]
pub struct InterceptChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
    fallback: Arc<dyn Transport>,
    default_headers: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

impl fmt::Debug for InterceptChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptChain")
            .field("interceptors", &self.interceptors.len())
            .field("default_headers", &self.default_headers)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl InterceptChain {
    pub fn new(fallback: impl Transport + 'static) -> Self {
        Self {
            interceptors: Vec::new(),
            fallback: Arc::new(fallback),
            default_headers: BTreeMap::new(),
            timeout: None,
        }
    }

    /// A chain whose fallback refuses everything.
    pub fn offline() -> Self {
        Self::new(Unroutable)
    }

    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Header added to every request that does not set it already.
    pub fn with_default_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.default_headers
            .insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Bounds the whole exchange, intercepted or not.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Offers `request` to every interceptor, then returns the winning response
    /// future (or the fallback's).
    ///
    /// The offer happens before this function returns; the returned future owns
    /// everything it needs and can be spawned.
    pub fn dispatch(&self, mut request: Request) -> ResponseFuture {
        for (name, value) in &self.default_headers {
            request
                .headers
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }

        let mut event = FetchEvent::new(request);
        for interceptor in &self.interceptors {
            interceptor.on_fetch(&mut event);
            if event.propagation_stopped {
                break;
            }
        }

        let FetchEvent {
            request,
            response,
            default_prevented,
            ..
        } = event;

        let response: ResponseFuture = match response {
            Some(response) => {
                debug!(method = %request.method, url = %request.url, "Intercepted");
                response
            }
            None if default_prevented => {
                warn!(method = %request.method, url = %request.url, "Cancelled by interceptor");
                Box::pin(async { Err::<Response, _>(TransportError::Cancelled) })
            }
            None => {
                debug!(method = %request.method, url = %request.url, "Fallback transport");
                let fallback = Arc::clone(&self.fallback);
                Box::pin(async move { fallback.send(request).await })
            }
        };

        match self.timeout {
            Some(limit) => Box::pin(async move {
                tokio::time::timeout(limit, response)
                    .await
                    .map_err(|_| TransportError::Timeout(limit))?
            }),
            None => response,
        }
    }
}

#[async_trait]
impl Transport for InterceptChain {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        self.dispatch(request).await
    }
}
