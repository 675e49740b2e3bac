//! # ResourceEntity Trait
//!
//! The `ResourceEntity` trait defines the contract every resource (webhook, payment
//! gateway, …) must implement to be managed by the generic
//! [`ResourceEngine`](crate::ResourceEngine). It ties together the draft's patch
//! type, the default validation rules, identity extraction and server error
//! translation.
//!
//! # Architecture Note
//! By defining one contract that all admin resources satisfy, the load / edit /
//! submit / delete machinery is written *once* and reused for every form.
//!
//! # Provided Methods (Hooks)
//! Every method has a default implementation:
//! - [`ResourceEntity::rules`]: no validation.
//! - [`ResourceEntity::identity`]: none; the engine falls back to the HAL
//!   `_links.self.href` of the response body and then to the `Location` header.
//! - [`ResourceEntity::translate_failure`]: [`translate::embedded_error_codes`].
//!
//! Override them only where a resource needs something specific.

use crate::patch::{Document, Merge};
use crate::transport::Response;
use crate::translate;
use crate::validation::RuleSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Trait that any resource must implement to be managed by a `ResourceEngine`.
///
/// # Drafts
/// The draft is the entity type itself. Edits arrive as [`Merge::Patch`] values
/// and are shallow-merged. `Default` provides the template for the "new entity"
/// case unless the engine is given an explicit one.
pub trait ResourceEntity:
    Merge<Patch: Debug + DeserializeOwned + Send + 'static>
    + Clone
    + Default
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Validation rules, in declaration order.
    fn rules() -> RuleSet<Self> {
        RuleSet::new()
    }

    /// The resource's own URI, if its representation carries one.
    fn identity(&self) -> Option<String> {
        None
    }

    /// Turns a failed submit/delete response into `error:<code>` tokens.
    fn translate_failure(response: &Response) -> Option<Vec<String>> {
        translate::embedded_error_codes(response)
    }
}

impl ResourceEntity for Document {}
