use resource_engine::patch::Merge;
use resource_engine::validation::{rules, RuleSet};
use resource_engine::ResourceEntity;
use serde::{Deserialize, Serialize};

/// Events a webhook can subscribe to.
pub const WEBHOOK_EVENTS: &[&str] = &[
    "order.created",
    "order.refunded",
    "customer.created",
    "subscription.cancelled",
];

/// A HAL link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: Link,
}

/// An outbound webhook registered in the store admin.
///
/// # Resource Engine
/// This struct implements [`ResourceEntity`], so a
/// [`ResourceEngine`](resource_engine::ResourceEngine) can load, edit and save it.
/// Edits arrive as [`WebhookPatch`]es.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "_links", default, skip_serializing)]
    pub links: Option<Links>,
}

impl Webhook {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            enabled: true,
            ..Self::default()
        }
    }
}

/// Partial update of a [`Webhook`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    pub enabled: Option<bool>,
}

impl Merge for Webhook {
    type Patch = WebhookPatch;

    fn merge(&mut self, patch: WebhookPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(events) = patch.events {
            self.events = events;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
    }
}

impl ResourceEntity for Webhook {
    fn rules() -> RuleSet<Self> {
        let name = |w: &Webhook| Some(w.name.clone());
        let url = |w: &Webhook| Some(w.url.clone());

        RuleSet::new()
            .with(rules::required("name", name))
            .with(rules::length("name", name, 1..=64))
            .with(rules::required("url", url))
            .with(rules::url("url", url))
            .with(rules::consistent("events", "required", |w: &Webhook, _| {
                !w.events.is_empty()
            }))
            .with(rules::consistent("events", "unknown", |w: &Webhook, _| {
                w.events
                    .iter()
                    .all(|event| WEBHOOK_EVENTS.contains(&event.as_str()))
            }))
    }

    fn identity(&self) -> Option<String> {
        self.links.as_ref().map(|links| links.self_link.href.clone())
    }
}
