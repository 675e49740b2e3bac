use crate::clients::{GatewayClient, WebhookClient};
use crate::model::{PaymentGateway, Webhook};
use resource_engine::transport::InterceptChain;
use resource_engine::{EngineConfig, ResourceEngine};
use tracing::{error, info};

pub const WEBHOOKS: &str = "/api/webhooks";
pub const PAYMENT_GATEWAYS: &str = "/api/payment-gateways";

/// The runtime orchestrator for the admin console's forms.
///
/// `AdminSystem` is responsible for:
/// - **Lifecycle Management**: starting and stopping one engine per form
/// - **Wiring**: every engine shares the same interception chain
///
/// # Example
///
/// ```ignore
/// let system = AdminSystem::new(&config, chain);
///
/// system.webhook_client.change(patch).await?;
/// let href = system.webhook_client.save().await?;
///
/// system.shutdown().await?;
/// ```
pub struct AdminSystem {
    /// Form client for the webhook resource
    pub webhook_client: WebhookClient,

    /// Form client for the payment gateway resource
    pub gateway_client: GatewayClient,

    /// Task handles for all running engines (used for graceful shutdown)
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl AdminSystem {
    /// Creates the engines, starts them and returns their clients.
    ///
    /// Both forms start on their "new" template; `open` one to edit an existing
    /// resource.
    pub fn new(config: &EngineConfig, transport: InterceptChain) -> Self {
        let (webhook_engine, webhook_client) = ResourceEngine::<Webhook>::builder()
            .parent(WEBHOOKS)
            .template(Webhook {
                enabled: true,
                ..Webhook::default()
            })
            .transport(transport.clone())
            .config(config)
            .build();

        let (gateway_engine, gateway_client) = ResourceEngine::<PaymentGateway>::builder()
            .parent(PAYMENT_GATEWAYS)
            .template(PaymentGateway {
                currency: "EUR".into(),
                test_mode: true,
                ..PaymentGateway::default()
            })
            .transport(transport)
            .config(config)
            .build();

        let handles = vec![
            tokio::spawn(webhook_engine.run()),
            tokio::spawn(gateway_engine.run()),
        ];

        Self {
            webhook_client: WebhookClient::new(webhook_client),
            gateway_client: GatewayClient::new(gateway_client),
            handles,
        }
    }

    /// Gracefully shuts down every engine.
    ///
    /// Dropping the clients closes the engines' request channels; each engine
    /// drains its in-flight requests and exits.
    ///
    /// Returns `Err` if an engine task panicked.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down admin system...");

        drop(self.webhook_client);
        drop(self.gateway_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Engine task failed: {:?}", e);
                return Err(format!("Engine task failed: {:?}", e));
            }
        }

        info!("Admin system shutdown complete.");
        Ok(())
    }
}
