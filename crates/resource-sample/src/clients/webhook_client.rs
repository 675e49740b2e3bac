//! # Webhook Client
//!
//! Provides a high-level API for the webhook form.
//! It wraps an `EngineClient<Webhook>` and exposes domain-specific methods.
use crate::model::{Webhook, WebhookPatch};
use async_trait::async_trait;
use resource_engine::{EngineClient, EngineError, FormClient, Settled};
use tracing::{debug, instrument};

/// Errors surfaced by the webhook form.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WebhookError {
    /// The draft failed validation; nothing was sent.
    #[error("Webhook is invalid: {}", .0.join(", "))]
    Invalid(Vec<String>),

    /// The server refused the webhook.
    #[error("Webhook rejected: {}", .0.join(", "))]
    Rejected(Vec<String>),

    /// The webhook has not been saved yet.
    #[error("Webhook not saved yet")]
    NotSaved,

    #[error("Engine communication error: {0}")]
    EngineCommunicationError(String),
}

/// Client for the webhook form.
#[derive(Clone)]
pub struct WebhookClient {
    inner: EngineClient<Webhook>,
}

impl WebhookClient {
    pub fn new(inner: EngineClient<Webhook>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl FormClient<Webhook> for WebhookClient {
    type Error = WebhookError;

    fn inner(&self) -> &EngineClient<Webhook> {
        &self.inner
    }

    fn map_error(e: EngineError) -> Self::Error {
        match e {
            EngineError::Rejected(tokens) => WebhookError::Rejected(tokens),
            EngineError::NotCreated => WebhookError::NotSaved,
            other => WebhookError::EngineCommunicationError(other.to_string()),
        }
    }
}

impl WebhookClient {
    /// Applies `patch` and returns the draft's errors.
    #[instrument(skip(self))]
    pub async fn change(&self, patch: WebhookPatch) -> Result<Vec<String>, WebhookError> {
        debug!("Sending request");
        self.inner.edit(patch).await.map_err(Self::map_error)
    }

    /// Saves the draft, refusing locally when it is invalid.
    ///
    /// Returns the webhook's identity.
    #[instrument(skip(self))]
    pub async fn save(&self) -> Result<String, WebhookError> {
        match self.submit().await? {
            Settled::Blocked => Err(WebhookError::Invalid(self.inner.errors())),
            Settled::Applied | Settled::Superseded => {
                self.inner.href().ok_or(WebhookError::NotSaved)
            }
        }
    }

    /// Enables or disables delivery and saves immediately.
    #[instrument(skip(self))]
    pub async fn set_enabled(&self, enabled: bool) -> Result<String, WebhookError> {
        self.change(WebhookPatch {
            enabled: Some(enabled),
            ..WebhookPatch::default()
        })
        .await?;
        self.save().await
    }

    pub fn current(&self) -> Webhook {
        self.inner.form()
    }
}
