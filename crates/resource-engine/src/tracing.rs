//! # Observability & Tracing
//!
//! Every engine logs its transitions with structured fields. The type name of the
//! managed entity is recorded as `entity_type` instead of a module path, so lines
//! stay short and can be filtered per resource.
//!
//! ## What Gets Traced
//!
//! - **Engine lifecycle**: startup, shutdown and the final state
//! - **Transitions**: loads, submits, deletes and blocked submits (`info`)
//! - **Payloads**: edits, dispatched requests and raw responses (`debug`)
//! - **Superseded responses**: discarded completions with their stale token (`debug`)
//! - **Failures**: transport errors, rejected and undecodable responses (`warn`)
//!
//! ## Usage Examples
//!
//! ```bash
//! # Transitions only
//! RUST_LOG=info cargo run
//!
//! # Payloads, offers and superseded results
//! RUST_LOG=debug cargo run
//!
//! # Only the interception chain
//! RUST_LOG=resource_engine::transport=debug cargo run
//! ```
//!
//! With `RUST_LOG=debug` a load looks like:
//!
//! ```text
//! DEBUG SetHref entity_type="Webhook" href=Some("7")
//! DEBUG Dispatch entity_type="Webhook" token=1 method=GET url=/api/webhooks/7 body=None
//! DEBUG Intercepted method=GET url=/api/webhooks/7
//! DEBUG Response entity_type="Webhook" status=200 body={"name":"Orders",...}
//! INFO Applied entity_type="Webhook" token=1 href=Some("/api/webhooks/7") busy=Fetching errors=0
//! ```

/// Installs the global subscriber: `RUST_LOG` filtering, compact format, no targets.
///
/// Call once, at program start.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
