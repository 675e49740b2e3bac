//! # Admin Console Sample
//!
//! Walks through the two sample forms against the in-memory admin API:
//!
//! 1.  Registers a webhook, then disables it and deletes it.
//! 2.  Configures a Stripe gateway through a property binding and a typed patch.
//! 3.  Tries to configure a second Stripe gateway, which the API refuses.
//!
//! Configuration is read from the environment (and `.env`); requests that the
//! offline API does not serve go to `RESOURCE_ENGINE_BASE_URL` over HTTP.

use resource_engine::tracing::setup_tracing;
use resource_engine::{EngineConfig, FormClient};
use resource_sample::lifecycle::{AdminSystem, PAYMENT_GATEWAYS, WEBHOOKS};
use resource_sample::model::{GatewayConfigPatch, PaymentGatewayPatch, WebhookPatch};
use resource_sample::offline::OfflineStore;
use serde_json::json;
use tracing::{error, info, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    dotenvy::dotenv().ok();
    setup_tracing();

    let config = EngineConfig::from_env().map_err(|e| e.to_string())?;
    info!(buffer_size = config.buffer_size, base_url = ?config.base_url, "Starting admin console sample");

    let store = OfflineStore::new()
        .with_collection(WEBHOOKS)
        .with_collection(PAYMENT_GATEWAYS)
        .with_unique(PAYMENT_GATEWAYS, "kind", "Gateway already configured");
    let system = AdminSystem::new(&config, config.transport().with_interceptor(store.clone()));

    let span = tracing::info_span!("webhook");
    async {
        let webhooks = &system.webhook_client;

        let errors = webhooks
            .change(WebhookPatch {
                name: Some("Order notifications".into()),
                url: Some("https://hooks.example.com/orders".into()),
                ..WebhookPatch::default()
            })
            .await
            .map_err(|e| e.to_string())?;
        info!(?errors, "Draft edited");

        if let Err(e) = webhooks.save().await {
            warn!(error = %e, "Save refused");
        }

        webhooks
            .change(WebhookPatch {
                events: Some(vec!["order.created".into(), "order.refunded".into()]),
                ..WebhookPatch::default()
            })
            .await
            .map_err(|e| e.to_string())?;
        let href = webhooks.save().await.map_err(|e| e.to_string())?;
        info!(%href, "Webhook registered");

        webhooks.set_enabled(false).await.map_err(|e| e.to_string())?;
        info!(enabled = webhooks.current().enabled, "Webhook disabled");

        webhooks.delete().await.map_err(|e| e.to_string())?;
        info!(remaining = store.len(), "Webhook deleted");
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("gateway");
    async {
        let gateways = &system.gateway_client;

        let description = gateways.field("description");
        description
            .set(json!("Stripe (EU)"))
            .await
            .map_err(|e| e.to_string())?;
        info!(config_errors = ?gateways.config_errors(), "Credentials missing");

        gateways
            .configure(PaymentGatewayPatch {
                config: Some(GatewayConfigPatch {
                    api_key: Some("sk_test_4eC39HqLyjWDarjtT1zdp7dc".into()),
                    ..GatewayConfigPatch::default()
                }),
                ..PaymentGatewayPatch::default()
            })
            .await
            .map_err(|e| e.to_string())?;
        let href = gateways.save().await.map_err(|e| e.to_string())?;
        info!(%href, "Gateway configured");

        // A second gateway of the same kind.
        gateways.open(None).await.map_err(|e| e.to_string())?;
        description
            .set(json!("Stripe (US)"))
            .await
            .map_err(|e| e.to_string())?;
        gateways
            .configure(PaymentGatewayPatch {
                currency: Some("USD".into()),
                config: Some(GatewayConfigPatch {
                    api_key: Some("sk_test_us".into()),
                    ..GatewayConfigPatch::default()
                }),
                ..PaymentGatewayPatch::default()
            })
            .await
            .map_err(|e| e.to_string())?;

        match gateways.save().await {
            Ok(href) => info!(%href, "Second gateway configured"),
            Err(e) => error!(error = %e, errors = ?gateways.errors(), "Second gateway refused"),
        }
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    system.shutdown().await?;

    info!("Sample completed successfully");
    Ok(())
}
