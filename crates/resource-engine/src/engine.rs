//! # Resource Engine
//!
//! This module defines the `ResourceEngine`, the actor that owns the state of one
//! remote resource: its identity, the last confirmed representation, the local
//! draft, the lifecycle and the error list. It processes messages sequentially and
//! is the only writer of that state.
//!
//! # Architecture Note
//! The engine never awaits network I/O inside its message loop. A network
//! operation is **dispatched**: the request is offered to the interception chain
//! synchronously, and the resulting response future is driven by a spawned task
//! that reports back over an internal channel, tagged with the request token that
//! was current at dispatch time. Edits and validation therefore stay responsive
//! while a load or submit is in flight.
//!
//! ## Last request wins
//! Every `set_href`, create/update and delete bumps a single monotonically
//! increasing token. A completion whose token is no longer current settles as
//! [`Settled::Superseded`] and leaves the state untouched.
//!
//! ## Published state
//! After every transition the engine publishes a [`Snapshot`] through a
//! `tokio::sync::watch` channel. All reads on the client are served from it
//! without a round trip.
//!
//! ```rust
//! use resource_engine::patch::Document;
//! use resource_engine::transport::{FetchEvent, InterceptChain, Response};
//! use resource_engine::ResourceEngine;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let chain = InterceptChain::offline().with_interceptor(|event: &mut FetchEvent| {
//!     let _ = event.respond(Response::ok_json(json!({"id": 1, "name": "Orders"})));
//! });
//!
//! let client = ResourceEngine::<Document>::builder()
//!     .parent("/api/webhooks")
//!     .transport(chain)
//!     .spawn();
//!
//! client.set_href(Some("1")).await.unwrap();
//! assert!(client.is_in("idle.snapshot"));
//! assert_eq!(client.href().as_deref(), Some("/api/webhooks/1"));
//! assert_eq!(client.data().unwrap()["name"], "Orders");
//! # }
//! ```

use crate::client::EngineClient;
use crate::config::EngineConfig;
use crate::entity::ResourceEntity;
use crate::error::EngineError;
use crate::message::{Completion, EngineRequest, Pending, Settled};
use crate::patch::Merge;
use crate::state::{Busy, FailCause, Idle, Lifecycle, Snapshot};
use crate::transport::{HttpTransport, InterceptChain, Method, Request, Response};
use crate::translate::Translator;
use crate::validation::RuleSet;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use url::Url;

/// Resolves `raw` against the parent collection.
///
/// Absolute URLs and `/`-rooted paths are kept as is; anything else is taken as
/// relative to `parent` (`"7"` under `"/api/webhooks"` is `"/api/webhooks/7"`).
pub fn resolve_href(parent: Option<&str>, raw: &str) -> String {
    if raw.starts_with('/') || Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    let Some(parent) = parent else {
        return raw.to_string();
    };
    let collection = format!("{}/", parent.trim_end_matches('/'));
    match Url::parse(&collection) {
        Ok(base) => base
            .join(raw)
            .map(String::from)
            .unwrap_or_else(|_| format!("{collection}{raw}")),
        Err(_) => format!("{collection}{raw}"),
    }
}

/// Builder for a [`ResourceEngine`] and its client.
///
/// Everything is optional: the template defaults to `T::default()`, the rules to
/// [`ResourceEntity::rules`], the translator to
/// [`ResourceEntity::translate_failure`] and the transport to an
/// [`InterceptChain`] over plain HTTP.
pub struct EngineBuilder<T: ResourceEntity> {
    href: Option<String>,
    parent: Option<String>,
    template: Option<T>,
    rules: Option<RuleSet<T>>,
    translator: Option<Translator>,
    transport: Option<InterceptChain>,
    buffer_size: usize,
}

impl<T: ResourceEntity> Default for EngineBuilder<T> {
    fn default() -> Self {
        Self {
            href: None,
            parent: None,
            template: None,
            rules: None,
            translator: None,
            transport: None,
            buffer_size: EngineConfig::default().buffer_size,
        }
    }
}

impl<T: ResourceEntity> EngineBuilder<T> {
    /// Identity loaded as soon as the engine starts running.
    pub fn href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    /// Collection the resource lives in.
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Draft used while the resource has no identity.
    pub fn template(mut self, template: T) -> Self {
        self.template = Some(template);
        self
    }

    pub fn rules(mut self, rules: RuleSet<T>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Overrides the entity's server error translation.
    pub fn translator(
        mut self,
        translate: impl Fn(&Response) -> Option<Vec<String>> + Send + Sync + 'static,
    ) -> Self {
        self.translator = Some(Arc::new(translate));
        self
    }

    pub fn transport(mut self, transport: InterceptChain) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Capacity of the request channel. Clients wait when it is full.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Applies the buffer size of `config`, and its HTTP transport unless a
    /// transport was set already.
    pub fn config(mut self, config: &EngineConfig) -> Self {
        if self.transport.is_none() {
            self.transport = Some(config.transport());
        }
        self.buffer_size(config.buffer_size)
    }

    /// Creates the engine (the server) and its client.
    ///
    /// The engine does nothing until [`ResourceEngine::run`] is polled; an
    /// initial `href` is loaded when the loop starts.
    pub fn build(self) -> (ResourceEngine<T>, EngineClient<T>) {
        let (sender, receiver) = mpsc::channel(self.buffer_size);
        let (completions_tx, completions) = mpsc::unbounded_channel();

        let template = self.template.unwrap_or_default();
        let rules = self.rules.unwrap_or_else(T::rules);
        let errors = rules.evaluate(&template, None);
        let snapshot = Snapshot {
            href: None,
            parent: self.parent,
            data: None,
            form: template.clone(),
            lifecycle: Lifecycle::Idle(Idle::Template),
            errors,
        };
        let (state, watcher) = watch::channel(snapshot.clone());

        let engine = ResourceEngine {
            receiver,
            completions_tx,
            completions,
            state,
            snapshot,
            template,
            rules,
            translator: self.translator,
            transport: self
                .transport
                .unwrap_or_else(|| InterceptChain::new(HttpTransport::new())),
            initial_href: self.href,
            token: 0,
            in_flight: 0,
            entity_type: entity_type::<T>(),
        };
        (engine, EngineClient::new(sender, watcher))
    }

    /// Builds the engine, spawns its loop on the current runtime and returns the client.
    pub fn spawn(self) -> EngineClient<T> {
        let (engine, client) = self.build();
        tokio::spawn(engine.run());
        client
    }
}

fn entity_type<T>() -> &'static str {
    std::any::type_name::<T>()
        .split("::")
        .last()
        .unwrap_or("Unknown")
}

/// The actor owning the state of one remote resource.
///
/// # Usage Pattern
///
/// 1.  **Create**: [`ResourceEngine::builder`] (or [`ResourceEngine::new`]) yields
///     the `engine` (server) and the `client` (interface).
/// 2.  **Run**: spawn `engine.run()` in a background task
///     ([`EngineBuilder::spawn`] does both).
/// 3.  **Use**: clone the client into every form control that needs it.
///
/// The loop ends once every client is dropped and in-flight requests are drained.
pub struct ResourceEngine<T: ResourceEntity> {
    receiver: mpsc::Receiver<EngineRequest<T>>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    state: watch::Sender<Snapshot<T>>,
    snapshot: Snapshot<T>,
    template: T,
    rules: RuleSet<T>,
    translator: Option<Translator>,
    transport: InterceptChain,
    initial_href: Option<String>,
    token: u64,
    in_flight: usize,
    entity_type: &'static str,
}

impl<T: ResourceEntity> ResourceEngine<T> {
    pub fn builder() -> EngineBuilder<T> {
        EngineBuilder::default()
    }

    /// An engine with default template and rules, talking through `transport`.
    pub fn new(transport: InterceptChain) -> (Self, EngineClient<T>) {
        Self::builder().transport(transport).build()
    }

    /// Runs the engine's event loop until every client is gone.
    pub async fn run(mut self) {
        let entity_type = self.entity_type;
        info!(entity_type, parent = ?self.snapshot.parent, "Engine started");

        if let Some(href) = self.initial_href.take() {
            // Nobody awaits the initial load; its outcome is visible in the state.
            drop(self.assign_href(Some(href)));
        }

        let mut open = true;
        while open || self.in_flight > 0 {
            tokio::select! {
                Some(completion) = self.completions.recv() => {
                    self.in_flight -= 1;
                    self.handle_completion(completion);
                }
                msg = self.receiver.recv(), if open => match msg {
                    Some(msg) => self.handle_request(msg),
                    None => open = false,
                },
            }
        }

        info!(
            entity_type,
            href = ?self.snapshot.href,
            lifecycle = %self.snapshot.lifecycle,
            errors = self.snapshot.errors.len(),
            "Shutdown"
        );
    }

    fn handle_request(&mut self, msg: EngineRequest<T>) {
        let entity_type = self.entity_type;
        match msg {
            EngineRequest::SetHref { href, respond_to } => {
                debug!(entity_type, ?href, "SetHref");
                let _ = respond_to.send(Ok(self.assign_href(href)));
            }
            EngineRequest::Edit { patch, respond_to } => {
                debug!(entity_type, ?patch, "Edit");
                self.snapshot.form.merge(patch);
                self.revalidate();
                self.publish();
                let _ = respond_to.send(Ok(self.snapshot.errors.clone()));
            }
            EngineRequest::Submit { respond_to } => {
                let _ = respond_to.send(self.submit());
            }
            EngineRequest::Delete { respond_to } => {
                let _ = respond_to.send(self.delete());
            }
            EngineRequest::Reset { respond_to } => {
                debug!(entity_type, "Reset");
                self.snapshot.form = self
                    .snapshot
                    .data
                    .clone()
                    .unwrap_or_else(|| self.template.clone());
                self.revalidate();
                self.publish();
                let _ = respond_to.send(Ok(self.snapshot.errors.clone()));
            }
        }
    }

    fn assign_href(&mut self, href: Option<String>) -> Pending {
        self.token += 1;
        let href = href.map(|raw| resolve_href(self.snapshot.parent.as_deref(), &raw));

        self.snapshot.href = href.clone();
        self.snapshot.data = None;
        self.snapshot.form = self.template.clone();

        match href {
            None => {
                self.snapshot.lifecycle = Lifecycle::Idle(Idle::Template);
                self.revalidate();
                self.publish();
                info!(entity_type = self.entity_type, token = self.token, "Template");
                Pending::ready(Ok(Settled::Applied))
            }
            Some(url) => {
                self.snapshot.lifecycle = Lifecycle::Busy(Busy::Fetching);
                // The template draft is what a submit would send until the load lands.
                self.revalidate();
                self.publish();
                self.dispatch(Request::new(Method::Get, url), Busy::Fetching)
            }
        }
    }

    fn submit(&mut self) -> Result<Pending, EngineError> {
        let entity_type = self.entity_type;
        if !self.snapshot.errors.is_empty() {
            info!(entity_type, errors = ?self.snapshot.errors, "Submit blocked");
            return Ok(Pending::ready(Ok(Settled::Blocked)));
        }

        let (busy, request) = match (&self.snapshot.href, &self.snapshot.parent) {
            (Some(href), _) => (Busy::Updating, Request::new(Method::Patch, href.as_str())),
            (None, Some(parent)) => (Busy::Creating, Request::new(Method::Post, parent.as_str())),
            (None, None) => {
                warn!(entity_type, "Submit without identity or parent collection");
                return Err(EngineError::NoCollection);
            }
        };
        let body = serde_json::to_value(&self.snapshot.form)?;

        self.token += 1;
        self.snapshot.lifecycle = Lifecycle::Busy(busy);
        self.publish();
        Ok(self.dispatch(request.with_body(body), busy))
    }

    fn delete(&mut self) -> Result<Pending, EngineError> {
        let Some(href) = self.snapshot.href.clone() else {
            warn!(entity_type = self.entity_type, "Delete before create");
            return Err(EngineError::NotCreated);
        };

        self.token += 1;
        self.snapshot.lifecycle = Lifecycle::Busy(Busy::Deleting);
        self.publish();
        Ok(self.dispatch(Request::new(Method::Delete, href), Busy::Deleting))
    }

    /// Offers `request` to the interception chain and drives the response in a
    /// separate task.
    fn dispatch(&mut self, request: Request, busy: Busy) -> Pending {
        let token = self.token;
        debug!(
            entity_type = self.entity_type,
            token,
            method = %request.method,
            url = %request.url,
            body = ?request.body,
            "Dispatch"
        );

        let (settle, pending) = Pending::channel();
        let response = self.transport.dispatch(request);
        let completions = self.completions_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let outcome = response.await;
            let _ = completions.send(Completion {
                token,
                busy,
                outcome,
                settle,
            });
        });
        pending
    }

    fn handle_completion(&mut self, completion: Completion) {
        let entity_type = self.entity_type;
        let Completion {
            token,
            busy,
            outcome,
            settle,
        } = completion;

        if token != self.token {
            debug!(entity_type, token, current = self.token, ?busy, "Superseded");
            let _ = settle.send(Ok(Settled::Superseded));
            return;
        }

        let result = match outcome {
            Ok(response) if response.is_success() => self.apply_success(busy, response),
            Ok(response) => self.apply_failure(busy, response),
            Err(e) => {
                warn!(entity_type, token, ?busy, error = %e, "Transport failed");
                self.fail(FailCause::Transport);
                Err(EngineError::Transport(e))
            }
        };
        let _ = settle.send(result);
    }

    fn apply_success(&mut self, busy: Busy, response: Response) -> Result<Settled, EngineError> {
        let entity_type = self.entity_type;
        debug!(entity_type, status = response.status, body = %response.text(), "Response");

        if busy == Busy::Deleting {
            self.snapshot.href = None;
            self.snapshot.data = None;
            self.snapshot.form = self.template.clone();
            self.snapshot.lifecycle = Lifecycle::Idle(Idle::Template);
            self.revalidate();
            self.publish();
            info!(entity_type, token = self.token, "Deleted");
            return Ok(Settled::Applied);
        }

        let entity = match self.decode(busy, &response) {
            Ok(entity) => entity,
            Err(e) => {
                warn!(entity_type, status = response.status, error = %e, "Decode failed");
                self.fail(FailCause::Decode);
                return Err(EngineError::Decode(e));
            }
        };

        if busy == Busy::Creating {
            let Some(identity) = identity_of(&entity, &response) else {
                warn!(entity_type, status = response.status, "Create response without identity");
                self.fail(FailCause::Decode);
                return Err(EngineError::MissingIdentity);
            };
            self.snapshot.href = Some(resolve_href(self.snapshot.parent.as_deref(), &identity));
        }

        self.snapshot.data = Some(entity.clone());
        self.snapshot.form = entity;
        if busy == Busy::Fetching {
            self.revalidate();
        } else {
            self.snapshot.errors.clear();
        }
        self.snapshot.lifecycle = Lifecycle::Idle(Idle::Snapshot);
        self.publish();

        info!(
            entity_type,
            token = self.token,
            href = ?self.snapshot.href,
            ?busy,
            errors = self.snapshot.errors.len(),
            "Applied"
        );
        Ok(Settled::Applied)
    }

    /// Reads the response body as `T`.
    ///
    /// A create or update answered without a body confirms the submitted draft.
    fn decode(&self, busy: Busy, response: &Response) -> Result<T, serde_json::Error> {
        if response.body.is_empty() && busy != Busy::Fetching {
            return Ok(self.snapshot.form.clone());
        }
        response.json_body()
    }

    fn apply_failure(&mut self, busy: Busy, response: Response) -> Result<Settled, EngineError> {
        let entity_type = self.entity_type;
        let status = response.status;

        // Load failures are never business errors.
        let translated = match busy {
            Busy::Fetching => None,
            _ => match &self.translator {
                Some(translate) => translate(&response),
                None => T::translate_failure(&response),
            },
        };

        match translated {
            Some(tokens) => {
                warn!(entity_type, token = self.token, status, ?tokens, "Rejected");
                self.snapshot.errors.extend(tokens.iter().cloned());
                self.fail(FailCause::Rejected);
                Err(EngineError::Rejected(tokens))
            }
            None => {
                let body = response.text();
                warn!(entity_type, token = self.token, status, %body, ?busy, "Request failed");
                self.fail(FailCause::Transport);
                Err(EngineError::Status { status, body })
            }
        }
    }

    fn fail(&mut self, cause: FailCause) {
        self.snapshot.lifecycle = Lifecycle::Fail(cause);
        self.publish();
    }

    fn revalidate(&mut self) {
        self.snapshot.errors = self
            .rules
            .evaluate(&self.snapshot.form, self.snapshot.data.as_ref());
    }

    fn publish(&self) {
        self.state.send_replace(self.snapshot.clone());
    }
}

/// The new resource's URI: entity first, then HAL self link, then `Location`.
fn identity_of<T: ResourceEntity>(entity: &T, response: &Response) -> Option<String> {
    entity
        .identity()
        .or_else(|| {
            response
                .json_body::<Value>()
                .ok()?
                .pointer("/_links/self/href")?
                .as_str()
                .map(str::to_string)
        })
        .or_else(|| response.header("location").map(str::to_string))
        .filter(|identity| !identity.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Document;
    use crate::transport::TransportError;
    use serde_json::json;

    #[test]
    fn test_resolve_href() {
        assert_eq!(resolve_href(Some("/api/webhooks"), "7"), "/api/webhooks/7");
        assert_eq!(resolve_href(Some("/api/webhooks/"), "7"), "/api/webhooks/7");
        assert_eq!(resolve_href(Some("/api/webhooks"), "/s/7"), "/s/7");
        assert_eq!(
            resolve_href(Some("https://shop.test/s/0/webhooks"), "7"),
            "https://shop.test/s/0/webhooks/7"
        );
        assert_eq!(
            resolve_href(Some("/api/webhooks"), "https://other.test/w/1"),
            "https://other.test/w/1"
        );
        assert_eq!(resolve_href(None, "7"), "7");
    }

    #[test]
    fn test_identity_precedence() {
        let entity = Document::new();
        let with_link = Response::json(201, &json!({"_links": {"self": {"href": "/w/9"}}}))
            .with_header("Location", "/w/location");
        assert_eq!(identity_of(&entity, &with_link).as_deref(), Some("/w/9"));

        let location_only = Response::json(201, &json!({})).with_header("Location", "/w/10");
        assert_eq!(identity_of(&entity, &location_only).as_deref(), Some("/w/10"));

        assert_eq!(identity_of(&entity, &Response::json(201, &json!({}))), None);
    }

    #[test]
    fn test_config_applies_buffer_size_and_transport() {
        let config = EngineConfig {
            buffer_size: 4,
            ..EngineConfig::default()
        };

        let builder = EngineBuilder::<Document>::default().config(&config);
        assert_eq!(builder.buffer_size, 4);
        assert!(builder.transport.is_some());

        let zero = EngineConfig {
            buffer_size: 0,
            ..EngineConfig::default()
        };
        assert_eq!(EngineBuilder::<Document>::default().config(&zero).buffer_size, 1);
    }

    #[tokio::test]
    async fn test_config_keeps_an_earlier_transport() {
        let client = EngineBuilder::<Document>::default()
            .transport(InterceptChain::offline())
            .config(&EngineConfig::default())
            .spawn();

        let result = client.set_href(Some("/items/1")).await;

        assert!(matches!(
            result,
            Err(EngineError::Transport(TransportError::Unroutable { .. }))
        ));
    }
}
