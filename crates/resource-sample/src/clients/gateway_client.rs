//! # Gateway Client
//!
//! Provides a high-level API for the payment gateway form. Besides the standard
//! form operations it hands out property bindings for individual controls.
use crate::model::{PaymentGateway, PaymentGatewayPatch};
use async_trait::async_trait;
use resource_engine::bridge::PropertyBinding;
use resource_engine::validation::scoped;
use resource_engine::{EngineClient, EngineError, FormClient, Settled};
use tracing::{debug, instrument};

/// Token the server's "already configured" message translates to.
pub const ALREADY_CONFIGURED: &str = "error:already_configured";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway is invalid: {}", .0.join(", "))]
    Invalid(Vec<String>),

    /// Only one gateway per provider is allowed.
    #[error("A gateway of this kind is already configured")]
    AlreadyConfigured,

    #[error("Gateway rejected: {}", .0.join(", "))]
    Rejected(Vec<String>),

    #[error("Gateway not saved yet")]
    NotSaved,

    #[error("Engine communication error: {0}")]
    EngineCommunicationError(String),
}

/// Client for the payment gateway form.
#[derive(Clone)]
pub struct GatewayClient {
    inner: EngineClient<PaymentGateway>,
}

impl GatewayClient {
    pub fn new(inner: EngineClient<PaymentGateway>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl FormClient<PaymentGateway> for GatewayClient {
    type Error = GatewayError;

    fn inner(&self) -> &EngineClient<PaymentGateway> {
        &self.inner
    }

    fn map_error(e: EngineError) -> Self::Error {
        match e {
            EngineError::Rejected(tokens) if tokens.iter().any(|t| t == ALREADY_CONFIGURED) => {
                GatewayError::AlreadyConfigured
            }
            EngineError::Rejected(tokens) => GatewayError::Rejected(tokens),
            EngineError::NotCreated => GatewayError::NotSaved,
            other => GatewayError::EngineCommunicationError(other.to_string()),
        }
    }
}

impl GatewayClient {
    #[instrument(skip(self))]
    pub async fn configure(&self, patch: PaymentGatewayPatch) -> Result<Vec<String>, GatewayError> {
        debug!("Sending request");
        self.inner.edit(patch).await.map_err(Self::map_error)
    }

    /// Saves the draft; returns the gateway's identity.
    #[instrument(skip(self))]
    pub async fn save(&self) -> Result<String, GatewayError> {
        match self.submit().await? {
            Settled::Blocked => Err(GatewayError::Invalid(self.inner.errors())),
            Settled::Applied | Settled::Superseded => {
                self.inner.href().ok_or(GatewayError::NotSaved)
            }
        }
    }

    /// Binding for a top-level field, e.g. `"description"`.
    pub fn field(&self, property: &str) -> PropertyBinding<PaymentGateway> {
        PropertyBinding::new(self.inner.clone(), property)
    }

    /// Errors of the credentials sub-form.
    pub fn config_errors(&self) -> Vec<String> {
        scoped(&self.inner.errors(), "config.")
            .map(str::to_string)
            .collect()
    }
}
