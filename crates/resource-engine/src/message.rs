//! # Engine Messages
//!
//! This module defines the messages exchanged between an [`EngineClient`] and its
//! [`ResourceEngine`], plus the [`Pending`] handle returned by every operation that
//! goes over the network.
//!
//! # Two-Phase Replies
//! Network operations answer twice. The engine first replies as soon as it has
//! accepted the request, updated the lifecycle and dispatched the interception
//! offer; that reply carries a [`Pending`]. The `Pending` resolves later, when the
//! response has been applied (or discarded because a newer request superseded it).
//! Purely local operations (`Edit`, `Reset`) reply once with the new errors.
//!
//! [`EngineClient`]: crate::EngineClient
//! [`ResourceEngine`]: crate::ResourceEngine

use crate::entity::ResourceEntity;
use crate::error::EngineError;
use crate::state::Busy;
use crate::transport::{Response, TransportError};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Type alias for the one-shot reply channel used by the engine.
pub type Reply<R> = oneshot::Sender<Result<R, EngineError>>;

/// How a network operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// The response was applied to the engine state.
    Applied,
    /// Submit refused locally because the draft has errors; nothing was sent.
    Blocked,
    /// A newer request bumped the token; the response was discarded.
    Superseded,
}

/// Internal message type sent to the engine.
///
/// `SetHref`, `Submit` and `Delete` bump the engine's request token; `Edit` and
/// `Reset` never touch the network.
#[derive(Debug)]
pub enum EngineRequest<T: ResourceEntity> {
    SetHref {
        href: Option<String>,
        respond_to: Reply<Pending>,
    },
    Edit {
        patch: T::Patch,
        respond_to: Reply<Vec<String>>,
    },
    Submit {
        respond_to: Reply<Pending>,
    },
    Delete {
        respond_to: Reply<Pending>,
    },
    Reset {
        respond_to: Reply<Vec<String>>,
    },
}

/// Settlement of an accepted network operation.
///
/// Awaiting it yields the [`Settled`] outcome, or the error the winning request
/// failed with. Dropping it does not cancel anything.
#[derive(Debug)]
#[must_use = "a Pending does nothing unless awaited"]
pub struct Pending {
    receiver: oneshot::Receiver<Result<Settled, EngineError>>,
}

impl Pending {
    pub(crate) fn channel() -> (oneshot::Sender<Result<Settled, EngineError>>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { receiver })
    }

    /// An already settled operation.
    pub fn ready(result: Result<Settled, EngineError>) -> Self {
        let (sender, pending) = Self::channel();
        let _ = sender.send(result);
        pending
    }
}

impl Future for Pending {
    type Output = Result<Settled, EngineError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(EngineError::ActorDropped)))
    }
}

/// A finished exchange travelling back to the engine task.
pub(crate) struct Completion {
    pub token: u64,
    pub busy: Busy,
    pub outcome: Result<Response, TransportError>,
    pub settle: oneshot::Sender<Result<Settled, EngineError>>,
}
