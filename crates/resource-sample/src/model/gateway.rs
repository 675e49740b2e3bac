use resource_engine::patch::{Embedded, Merge};
use resource_engine::transport::Response;
use resource_engine::translate;
use resource_engine::validation::{rules, RuleSet};
use resource_engine::ResourceEntity;
use serde::{Deserialize, Serialize};

/// Phrases the payment service uses for business errors, and their codes.
pub const GATEWAY_MESSAGES: &[(&str, &str)] = &[
    ("already configured", "already_configured"),
    ("invalid api key", "invalid_credentials"),
    ("currency not supported", "unsupported_currency"),
];

/// Payment provider family. Decides which configuration fields are required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    #[default]
    Stripe,
    Paypal,
    /// Self-hosted provider reached through `config.endpoint`.
    Custom,
}

/// Provider credentials. Stored on the server as a JSON string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub endpoint: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfigPatch {
    pub api_key: Option<String>,
    pub account_id: Option<String>,
    pub endpoint: Option<String>,
}

impl Merge for GatewayConfig {
    type Patch = GatewayConfigPatch;

    fn merge(&mut self, patch: GatewayConfigPatch) {
        if let Some(api_key) = patch.api_key {
            self.api_key = api_key;
        }
        if let Some(account_id) = patch.account_id {
            self.account_id = account_id;
        }
        if let Some(endpoint) = patch.endpoint {
            self.endpoint = endpoint;
        }
    }
}

/// A payment gateway configured for the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentGateway {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: GatewayKind,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default)]
    pub config: Embedded<GatewayConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentGatewayPatch {
    pub description: Option<String>,
    pub kind: Option<GatewayKind>,
    pub currency: Option<String>,
    pub test_mode: Option<bool>,
    pub config: Option<GatewayConfigPatch>,
}

impl Merge for PaymentGateway {
    type Patch = PaymentGatewayPatch;

    fn merge(&mut self, patch: PaymentGatewayPatch) {
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(currency) = patch.currency {
            self.currency = currency;
        }
        if let Some(test_mode) = patch.test_mode {
            self.test_mode = test_mode;
        }
        if let Some(config) = patch.config {
            self.config.merge(config);
        }
    }
}

/// Rules of the credentials sub-form, scoped under `config.`.
fn credential_rules() -> RuleSet<PaymentGateway> {
    let hosted = |g: &PaymentGateway| g.kind != GatewayKind::Custom;
    let custom = |g: &PaymentGateway| g.kind == GatewayKind::Custom;
    let endpoint = |g: &PaymentGateway| Some(g.config.endpoint.clone());

    RuleSet::new()
        .with(rules::required_when("config.api_key", hosted, |g: &PaymentGateway| {
            Some(g.config.api_key.clone())
        }))
        .with(rules::required_when("config.endpoint", custom, endpoint))
        .with(rules::url("config.endpoint", endpoint))
}

impl ResourceEntity for PaymentGateway {
    fn rules() -> RuleSet<Self> {
        RuleSet::new()
            .with(rules::required("description", |g: &PaymentGateway| {
                Some(g.description.clone())
            }))
            .with(rules::length(
                "currency",
                |g: &PaymentGateway| Some(g.currency.clone()),
                3..=3,
            ))
            .extend(credential_rules())
            .with(rules::consistent(
                "kind",
                "immutable",
                |draft: &PaymentGateway, data| data.map_or(true, |confirmed| confirmed.kind == draft.kind),
            ))
    }

    fn translate_failure(response: &Response) -> Option<Vec<String>> {
        translate::embedded_error_codes(response)
            .or_else(|| translate::by_message(GATEWAY_MESSAGES)(response))
    }
}
