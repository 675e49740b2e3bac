//! # Engine Errors
//!
//! This module defines the error types used throughout the resource engine.
//! By centralizing error definitions, every engine and every form client reports
//! failures the same way.
//!
//! ## Taxonomy
//!
//! - **Validation failures** never show up here: they are local, synchronous and
//!   live in the engine's `errors` list (a blocked submit settles as
//!   [`Settled::Blocked`](crate::Settled::Blocked)).
//! - **Transport failures** ([`EngineError::Transport`], [`EngineError::Status`])
//!   put the engine in `fail.transport`.
//! - **Translated business failures** ([`EngineError::Rejected`]) put the engine in
//!   `fail.rejected` and carry the `error:<code>` tokens that were appended to
//!   `errors`.
//! - **Decode failures** ([`EngineError::Decode`], [`EngineError::MissingIdentity`])
//!   are programming-level: a 2xx response the entity type could not read.

use crate::transport::TransportError;

/// Errors that can occur within the resource engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine closed")]
    ActorClosed,
    #[error("Engine dropped response channel")]
    ActorDropped,
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Server rejected the request: {}", .0.join(", "))]
    Rejected(Vec<String>),
    #[error("Could not decode response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Create response carried no identity")]
    MissingIdentity,
    #[error("Resource has not been created yet")]
    NotCreated,
    #[error("No parent collection to create the resource in")]
    NoCollection,
    #[error("Invalid patch: {0}")]
    InvalidPatch(#[source] serde_json::Error),
}
