//! # Property-Path Bridge
//!
//! Form controls address the draft by a logical property name. A
//! [`PropertyBinding`] maps that name to a draft key: it reads the current value,
//! relays changes into [`EngineClient::edit`] after a vetoable [`ChangeIntent`],
//! and surfaces the first validation error in its scope.
//!
//! The binding holds no state of its own; every read goes to the engine snapshot.
//!
//! ```rust
//! use resource_engine::bridge::{ChangeOutcome, PropertyBinding};
//! use resource_engine::patch::Document;
//! use resource_engine::transport::InterceptChain;
//! use resource_engine::validation::{rules, RuleSet};
//! use resource_engine::ResourceEngine;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let client = ResourceEngine::<Document>::builder()
//!     .rules(RuleSet::new().with(rules::required("name", rules::document_field("name"))))
//!     .transport(InterceptChain::offline())
//!     .spawn();
//!
//! let name = PropertyBinding::new(client.clone(), "name");
//! assert_eq!(name.error().as_deref(), Some("v8n_required"));
//!
//! let outcome = name.set(json!("Orders")).await.unwrap();
//! assert_eq!(outcome, ChangeOutcome::Applied(vec![]));
//! assert_eq!(name.value().unwrap(), json!("Orders"));
//! assert_eq!(name.error(), None);
//! # }
//! ```

use crate::client::EngineClient;
use crate::entity::ResourceEntity;
use crate::error::EngineError;
use crate::validation::first_in_scope;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A proposed change, shown to the guard before it reaches the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeIntent {
    pub property: String,
    pub previous: Value,
    pub next: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The edit went through; carries the engine's new errors.
    Applied(Vec<String>),
    /// The guard cancelled the change; the draft is untouched.
    Vetoed,
}

type Guard = dyn Fn(&ChangeIntent) -> bool + Send + Sync;

/// Binds one draft key to a form control.
pub struct PropertyBinding<T: ResourceEntity> {
    client: EngineClient<T>,
    property: String,
    scope: String,
    guard: Option<Arc<Guard>>,
}

impl<T: ResourceEntity> Clone for PropertyBinding<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            property: self.property.clone(),
            scope: self.scope.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl<T: ResourceEntity> fmt::Debug for PropertyBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBinding")
            .field("property", &self.property)
            .field("scope", &self.scope)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

impl<T: ResourceEntity> PropertyBinding<T> {
    /// Binds `property`; errors are scoped to `"<property>:"`.
    pub fn new(client: EngineClient<T>, property: impl Into<String>) -> Self {
        let property = property.into();
        Self {
            client,
            scope: format!("{property}:"),
            property,
            guard: None,
        }
    }

    /// Uses another error prefix, e.g. `"config."` for a nested sub-form.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Installs a guard; returning `false` vetoes the change.
    pub fn with_guard(mut self, guard: impl Fn(&ChangeIntent) -> bool + Send + Sync + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// The draft's value for the property, `null` when absent.
    pub fn value(&self) -> Result<Value, EngineError> {
        let form = serde_json::to_value(self.client.form())?;
        Ok(form.get(&self.property).cloned().unwrap_or(Value::Null))
    }

    /// Proposes `next` for the property.
    pub async fn set(&self, next: Value) -> Result<ChangeOutcome, EngineError> {
        let intent = ChangeIntent {
            property: self.property.clone(),
            previous: self.value()?,
            next,
        };

        if let Some(guard) = &self.guard {
            if !guard(&intent) {
                debug!(property = %intent.property, next = %intent.next, "Change vetoed");
                return Ok(ChangeOutcome::Vetoed);
            }
        }

        let mut patch = Map::new();
        patch.insert(intent.property, intent.next);
        let patch: T::Patch =
            serde_json::from_value(Value::Object(patch)).map_err(EngineError::InvalidPatch)?;
        let errors = self.client.edit(patch).await?;
        Ok(ChangeOutcome::Applied(errors))
    }

    /// First error in scope, prefix stripped.
    pub fn error(&self) -> Option<String> {
        first_in_scope(&self.client.errors(), &self.scope).map(str::to_string)
    }
}
