//! # Test Utilities
//!
//! Two ways to stand in for the server in tests, without any real HTTP:
//!
//! 1. [`MockTransport`]: a fallback transport with a fluent expectation queue.
//!    Requests are answered in order and recorded for later assertions.
//! 2. [`channel_interceptor`]: an interceptor that hands every offer to the test.
//!    The test answers each [`Offer`] whenever it likes, which makes overlapping
//!    requests deterministic (answer the first request *after* the second).
//!
//! ## Fluent expectations
//!
//! ```rust
//! use resource_engine::mock::MockTransport;
//! use resource_engine::patch::Document;
//! use resource_engine::ResourceEngine;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mock = MockTransport::new();
//! mock.expect_get("/api/webhooks/1").return_ok(json!({"name": "Orders"}));
//! mock.expect_patch("/api/webhooks/1").return_ok(json!({"name": "Refunds"}));
//!
//! let client = ResourceEngine::<Document>::builder().transport(mock.chain()).spawn();
//! client.set_href(Some("/api/webhooks/1")).await.unwrap();
//! client.edit(json!({"name": "Refunds"}).as_object().cloned().unwrap()).await.unwrap();
//! client.submit().await.unwrap();
//!
//! assert_eq!(client.data().unwrap()["name"], "Refunds");
//! mock.verify(); // Ensures all expectations were met
//! # }
//! ```
//!
//! ## Deferred responses
//!
//! ```rust
//! use resource_engine::mock::{channel_interceptor, expect_offer};
//! use resource_engine::patch::Document;
//! use resource_engine::transport::{InterceptChain, Method, Response};
//! use resource_engine::{ResourceEngine, Settled};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (interceptor, mut offers) = channel_interceptor();
//! let client = ResourceEngine::<Document>::builder()
//!     .transport(InterceptChain::offline().with_interceptor(interceptor))
//!     .spawn();
//!
//! let pending = client.request_href(Some("/items/1")).await.unwrap();
//! assert!(client.is_in("busy.fetching"));
//!
//! let offer = expect_offer(&mut offers, Method::Get).await.unwrap();
//! offer.respond(Response::ok_json(json!({"id": 1})));
//!
//! assert_eq!(pending.await.unwrap(), Settled::Applied);
//! assert!(client.is_in("idle.snapshot"));
//! # }
//! ```

use crate::transport::{
    FetchEvent, InterceptChain, Interceptor, Method, Request, Response, Transport, TransportError,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

struct Expectation {
    method: Method,
    url: String,
    response: Result<Response, TransportError>,
}

/// A fallback transport answering from a queue of expectations.
///
/// Clones share the queue and the request log.
#[derive(Clone, Default)]
pub struct MockTransport {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockTransport {
    /// Creates a mock transport with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// An interception chain with this mock as its fallback.
    pub fn chain(&self) -> InterceptChain {
        InterceptChain::new(self.clone())
    }

    /// Expects the next request to be `method url`.
    pub fn expect(&self, method: Method, url: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            method,
            url: url.into(),
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_get(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(Method::Get, url)
    }

    pub fn expect_post(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(Method::Post, url)
    }

    pub fn expect_patch(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(Method::Patch, url)
    }

    pub fn expect_delete(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(Method::Delete, url)
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let expectation = self.expectations.lock().unwrap().pop_front();

        match expectation {
            Some(exp) if exp.method == request.method && exp.url == request.url => exp.response,
            Some(exp) => Err(TransportError::Unexpected(format!(
                "{} {} (expected {} {})",
                request.method, request.url, exp.method, exp.url
            ))),
            None => Err(TransportError::Unexpected(format!(
                "{} {} (no expectation left)",
                request.method, request.url
            ))),
        }
    }
}

/// Builder for one expectation.
pub struct ExpectationBuilder {
    method: Method,
    url: String,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl ExpectationBuilder {
    /// Responds with `body` as JSON and the given status.
    pub fn return_json(self, status: u16, body: Value) {
        self.return_response(Response::json(status, &body));
    }

    /// Responds `200 OK` with `body`.
    pub fn return_ok(self, body: Value) {
        self.return_json(200, body);
    }

    /// Responds with a raw, non-JSON body.
    pub fn return_status(self, status: u16, body: &str) {
        self.return_response(Response::new(status, body));
    }

    pub fn return_response(self, response: Response) {
        self.push(Ok(response));
    }

    /// Fails at the transport level.
    pub fn return_err(self, error: TransportError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Response, TransportError>) {
        let mut exps = self.expectations.lock().unwrap();
        exps.push_back(Expectation {
            method: self.method,
            url: self.url,
            response,
        });
    }
}

/// An intercepted request waiting for the test to answer it.
#[derive(Debug)]
pub struct Offer {
    pub request: Request,
    responder: oneshot::Sender<Result<Response, TransportError>>,
}

impl Offer {
    pub fn respond(self, response: Response) {
        let _ = self.responder.send(Ok(response));
    }

    pub fn fail(self, error: TransportError) {
        let _ = self.responder.send(Err(error));
    }
}

/// An interceptor that claims every request and forwards it to the returned
/// receiver. Dropping an [`Offer`] fails its request with
/// [`TransportError::Dropped`].
pub fn channel_interceptor() -> (impl Interceptor + 'static, mpsc::UnboundedReceiver<Offer>) {
    let (sender, receiver) = mpsc::unbounded_channel();

    let interceptor = move |event: &mut FetchEvent| {
        let (responder, response) = oneshot::channel();
        let claimed = event.respond_with(async move {
            response.await.unwrap_or(Err(TransportError::Dropped))
        });
        if claimed.is_ok() {
            let _ = sender.send(Offer {
                request: event.request().clone(),
                responder,
            });
        }
    };
    (interceptor, receiver)
}

/// Helper to verify that the next offer is a `method` request.
pub async fn expect_offer(
    receiver: &mut mpsc::UnboundedReceiver<Offer>,
    method: Method,
) -> Option<Offer> {
    match receiver.recv().await {
        Some(offer) if offer.request.method == method => Some(offer),
        _ => None,
    }
}
