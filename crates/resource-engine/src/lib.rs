//! # Resource Engine
//!
//! This crate provides a **remote-resource state container** for admin-console
//! forms. One [`ResourceEngine`] owns everything a form needs to know about one
//! server resource:
//!
//! - its identity (`href`), or none while the resource is still to be created,
//! - the last confirmed server representation (`data`),
//! - the local, unsaved draft layered on top of it (`form`),
//! - a hierarchical lifecycle (`idle.snapshot`, `busy.fetching`, `fail.rejected`, …),
//! - an ordered list of error tokens.
//!
//! ## Data flow
//!
//! ```text
//! reads:   server ──▶ data (cache) ──▶ form (draft) ──▶ UI
//! writes:  UI ──▶ form ──▶ validation ──▶ interception chain ──▶ server ──▶ data
//! ```
//!
//! ## Architecture Overview
//!
//! The crate builds on the **Actor Model**: each engine runs in its own Tokio task
//! and is the only writer of its state, so there are no locks. The pieces are:
//!
//! 1. **Entity Layer** ([`ResourceEntity`]): the draft type, its patch type,
//!    default rules, identity and error translation.
//! 2. **Runtime Layer** ([`ResourceEngine`]): message processing, token-based
//!    "last request wins" ordering, snapshot publication.
//! 3. **Interface Layer** ([`EngineClient`], [`FormClient`]): type-safe commands
//!    and synchronous reads.
//! 4. **Validation Pipeline** ([`validation`]): declarative rules producing
//!    `<scope>:v8n_<reason>` tokens.
//! 5. **Fetch Interception** ([`transport`]): every request is offered to an
//!    ordered list of observers before the real HTTP transport sees it.
//! 6. **Property-Path Bridge** ([`bridge`]): binds one draft key to a form control.
//!
//! ## Example
//!
//! ```rust
//! use resource_engine::patch::Document;
//! use resource_engine::transport::{FetchEvent, InterceptChain, Method, Response};
//! use resource_engine::validation::{rules, RuleSet};
//! use resource_engine::{ResourceEngine, Settled};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let chain = InterceptChain::offline().with_interceptor(|event: &mut FetchEvent| {
//!     if event.request().method == Method::Post {
//!         let body = event.request().body.clone().unwrap_or_default();
//!         let _ = event.respond(Response::json(201, &body).with_header("Location", "/api/webhooks/7"));
//!     }
//! });
//!
//! let client = ResourceEngine::<Document>::builder()
//!     .parent("/api/webhooks")
//!     .rules(RuleSet::new().with(rules::required("name", rules::document_field("name"))))
//!     .transport(chain)
//!     .spawn();
//!
//! // A new resource: submit is blocked until the draft is valid.
//! assert_eq!(client.submit().await.unwrap(), Settled::Blocked);
//!
//! let errors = client.edit(json!({"name": "Orders"}).as_object().cloned().unwrap()).await.unwrap();
//! assert!(errors.is_empty());
//!
//! assert_eq!(client.submit().await.unwrap(), Settled::Applied);
//! assert_eq!(client.href().as_deref(), Some("/api/webhooks/7"));
//! assert!(client.is_in("idle.snapshot"));
//! # }
//! ```
//!
//! ## Testing
//!
//! The [`mock`] module provides a [`mock::MockTransport`] with fluent expectations
//! and a [`mock::channel_interceptor`] for answering requests by hand.

pub mod bridge;
pub mod client;
pub mod client_trait;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;
pub mod patch;
pub mod state;
pub mod tracing;
pub mod translate;
pub mod transport;
pub mod validation;

// Re-export core types for convenience
pub use client::EngineClient;
pub use client_trait::FormClient;
pub use config::{ConfigError, EngineConfig};
pub use engine::{EngineBuilder, ResourceEngine};
pub use entity::ResourceEntity;
pub use error::EngineError;
pub use message::{EngineRequest, Pending, Settled};
pub use state::{Busy, FailCause, Idle, Lifecycle, Snapshot};
