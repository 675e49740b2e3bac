//! # FormClient Trait
//!
//! Provides a common interface for resource-specific form clients, adding default
//! `open`, `submit` and `delete` methods built on top of a generic `EngineClient`.
use crate::{EngineClient, EngineError, ResourceEntity, Settled};
use async_trait::async_trait;

/// Trait for resource-specific clients to inherit the standard form operations.
///
/// # Example
///
/// ```rust
/// use resource_engine::{EngineClient, EngineError, FormClient};
/// use resource_engine::patch::Document;
///
/// #[derive(Debug)]
/// struct WebhookError(String);
///
/// struct WebhookForm {
///     inner: EngineClient<Document>,
/// }
///
/// impl FormClient<Document> for WebhookForm {
///     type Error = WebhookError;
///
///     fn inner(&self) -> &EngineClient<Document> {
///         &self.inner
///     }
///
///     fn map_error(e: EngineError) -> Self::Error {
///         WebhookError(e.to_string())
///     }
/// }
///
/// async fn usage(form: WebhookForm) {
///     // open(), submit() and delete() are provided automatically!
///     let _ = form.open(Some("/api/webhooks/1")).await;
///     if form.errors().is_empty() {
///         let _ = form.submit().await;
///     }
/// }
/// ```
#[async_trait]
pub trait FormClient<T: ResourceEntity>: Send + Sync {
    /// The resource-specific error type.
    type Error: Send + Sync;

    /// Access the inner generic EngineClient.
    fn inner(&self) -> &EngineClient<T>;

    /// Map engine errors to the specific resource error type.
    fn map_error(e: EngineError) -> Self::Error;

    /// Load an existing resource, or switch to the "new" template with `None`.
    #[tracing::instrument(skip(self))]
    async fn open(&self, href: Option<&str>) -> Result<Settled, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().set_href(href).await.map_err(Self::map_error)
    }

    /// Create or update from the current draft.
    #[tracing::instrument(skip(self))]
    async fn submit(&self) -> Result<Settled, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().submit().await.map_err(Self::map_error)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self) -> Result<Settled, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().delete().await.map_err(Self::map_error)
    }

    fn errors(&self) -> Vec<String> {
        self.inner().errors()
    }

    fn is_in(&self, path: &str) -> bool {
        self.inner().is_in(path)
    }
}
