//! # Engine Client
//!
//! This module defines the client for communicating with a [`ResourceEngine`].
//!
//! [`ResourceEngine`]: crate::ResourceEngine

use crate::entity::ResourceEntity;
use crate::error::EngineError;
use crate::message::{EngineRequest, Pending, Reply, Settled};
use crate::state::{Lifecycle, Snapshot};
use tokio::sync::{mpsc, oneshot, watch};

/// A type-safe handle on a running `ResourceEngine`.
///
/// Commands travel to the engine over its request channel. Reads never leave the
/// caller's task: they clone from the latest published [`Snapshot`].
///
/// * **Cloneable**: holds a sender and a watch receiver, so cloning is inexpensive.
/// * **Two flavours per network operation**: `request_*` returns once the engine
///   has accepted the request and offered it to the interception chain, the plain
///   form also awaits the settlement.
#[derive(Clone)]
pub struct EngineClient<T: ResourceEntity> {
    sender: mpsc::Sender<EngineRequest<T>>,
    state: watch::Receiver<Snapshot<T>>,
}

impl<T: ResourceEntity> EngineClient<T> {
    pub fn new(sender: mpsc::Sender<EngineRequest<T>>, state: watch::Receiver<Snapshot<T>>) -> Self {
        Self { sender, state }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(Reply<R>) -> EngineRequest<T>,
    ) -> Result<R, EngineError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| EngineError::ActorClosed)?;
        response.await.map_err(|_| EngineError::ActorDropped)?
    }

    /// Points the engine at a new identity (or none) and starts loading it.
    pub async fn request_href(&self, href: Option<&str>) -> Result<Pending, EngineError> {
        let href = href.map(str::to_string);
        self.request(|respond_to| EngineRequest::SetHref { href, respond_to })
            .await
    }

    pub async fn set_href(&self, href: Option<&str>) -> Result<Settled, EngineError> {
        self.request_href(href).await?.await
    }

    /// Shallow-merges `patch` into the draft and returns the new errors.
    pub async fn edit(&self, patch: T::Patch) -> Result<Vec<String>, EngineError> {
        self.request(|respond_to| EngineRequest::Edit { patch, respond_to })
            .await
    }

    pub async fn request_submit(&self) -> Result<Pending, EngineError> {
        self.request(|respond_to| EngineRequest::Submit { respond_to })
            .await
    }

    /// Creates or updates the resource from the draft.
    pub async fn submit(&self) -> Result<Settled, EngineError> {
        self.request_submit().await?.await
    }

    pub async fn request_delete(&self) -> Result<Pending, EngineError> {
        self.request(|respond_to| EngineRequest::Delete { respond_to })
            .await
    }

    pub async fn delete(&self) -> Result<Settled, EngineError> {
        self.request_delete().await?.await
    }

    /// Discards the draft and returns the errors of the reseeded one.
    pub async fn reset(&self) -> Result<Vec<String>, EngineError> {
        self.request(|respond_to| EngineRequest::Reset { respond_to })
            .await
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.state.borrow().clone()
    }

    pub fn href(&self) -> Option<String> {
        self.state.borrow().href.clone()
    }

    pub fn data(&self) -> Option<T> {
        self.state.borrow().data.clone()
    }

    pub fn form(&self) -> T {
        self.state.borrow().form.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.state.borrow().errors.clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.borrow().lifecycle
    }

    /// Dotted-path lifecycle query, e.g. `is_in("busy")`.
    pub fn is_in(&self, path: &str) -> bool {
        self.state.borrow().is_in(path)
    }

    /// A receiver notified after every state transition.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        let mut receiver = self.state.clone();
        receiver.mark_unchanged();
        receiver
    }
}
