use resource_engine::mock::{channel_interceptor, expect_offer, MockTransport, Offer};
use resource_engine::patch::{Document, Merge};
use resource_engine::transport::{FetchEvent, InterceptChain, Method, Response, TransportError};
use resource_engine::validation::{rules, RuleSet};
use resource_engine::{
    translate, EngineClient, EngineError, FailCause, Lifecycle, ResourceEngine, ResourceEntity,
    Settled,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

// --- Typed entity used by some tests ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Item {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ItemPatch {
    name: Option<String>,
}

impl Merge for Item {
    type Patch = ItemPatch;

    fn merge(&mut self, patch: ItemPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
    }
}

impl ResourceEntity for Item {
    fn rules() -> RuleSet<Self> {
        RuleSet::new().with(rules::required("name", |item: &Item| {
            Some(item.name.clone())
        }))
    }
}

fn name_rules() -> RuleSet<Document> {
    RuleSet::new().with(rules::required("name", rules::document_field("name")))
}

#[tokio::test]
async fn test_load_through_interceptor() {
    let chain = InterceptChain::offline().with_interceptor(|event: &mut FetchEvent| {
        if event.request().method == Method::Get && event.request().url == "/items/1" {
            let _ = event.respond(Response::ok_json(json!({"id": 1, "name": "Widget"})));
        }
    });
    let client = ResourceEngine::<Item>::builder().transport(chain).spawn();

    let settled = client.set_href(Some("/items/1")).await.unwrap();

    assert_eq!(settled, Settled::Applied);
    assert_eq!(client.data().unwrap().id, 1);
    assert_eq!(client.form(), client.data().unwrap());
    assert!(client.is_in("idle.snapshot"));
    assert!(client.is_in("idle"));
    assert!(client.errors().is_empty());
}

#[tokio::test]
async fn test_null_href_switches_to_template() {
    let mock = MockTransport::new();
    mock.expect_get("/items/1").return_ok(json!({"id": 1, "name": "Widget"}));
    let client = ResourceEngine::<Item>::builder()
        .template(Item {
            id: 0,
            name: "New item".into(),
        })
        .transport(mock.chain())
        .spawn();

    client.set_href(Some("/items/1")).await.unwrap();
    let settled = client.set_href(None).await.unwrap();

    assert_eq!(settled, Settled::Applied);
    assert!(client.is_in("idle.template"));
    assert_eq!(client.data(), None);
    assert_eq!(client.href(), None);
    assert_eq!(client.form().name, "New item");
    mock.verify();
}

#[tokio::test]
async fn test_overlapping_loads_last_request_wins() {
    let (interceptor, mut offers) = channel_interceptor();
    let client = ResourceEngine::<Document>::builder()
        .transport(InterceptChain::offline().with_interceptor(interceptor))
        .spawn();

    let first = client.request_href(Some("/items/a")).await.unwrap();
    let second = client.request_href(Some("/items/b")).await.unwrap();

    let offer_a = expect_offer(&mut offers, Method::Get).await.unwrap();
    let offer_b = expect_offer(&mut offers, Method::Get).await.unwrap();
    assert_eq!(offer_a.request.url, "/items/a");
    assert_eq!(offer_b.request.url, "/items/b");

    offer_b.respond(Response::ok_json(json!({"name": "B"})));
    assert_eq!(second.await.unwrap(), Settled::Applied);

    // A resolves last and must not overwrite B.
    offer_a.respond(Response::ok_json(json!({"name": "A"})));
    assert_eq!(first.await.unwrap(), Settled::Superseded);

    assert_eq!(client.href().as_deref(), Some("/items/b"));
    assert_eq!(client.data().unwrap()["name"], "B");
    assert!(client.is_in("idle.snapshot"));
}

#[tokio::test]
async fn test_superseded_failure_is_silent() {
    let (interceptor, mut offers) = channel_interceptor();
    let client = ResourceEngine::<Document>::builder()
        .transport(InterceptChain::offline().with_interceptor(interceptor))
        .spawn();

    let first = client.request_href(Some("/items/a")).await.unwrap();
    let second = client.request_href(Some("/items/b")).await.unwrap();
    let offer_a = expect_offer(&mut offers, Method::Get).await.unwrap();
    let offer_b = expect_offer(&mut offers, Method::Get).await.unwrap();

    offer_a.fail(TransportError::Timeout(std::time::Duration::from_secs(1)));
    assert_eq!(first.await.unwrap(), Settled::Superseded);
    assert!(client.is_in("busy.fetching"));

    offer_b.respond(Response::ok_json(json!({"name": "B"})));
    assert_eq!(second.await.unwrap(), Settled::Applied);
}

#[tokio::test]
async fn test_blocked_submit_dispatches_nothing() {
    let mock = MockTransport::new();
    let client = ResourceEngine::<Document>::builder()
        .parent("/api/webhooks")
        .rules(name_rules())
        .transport(mock.chain())
        .spawn();

    assert_eq!(client.errors(), vec!["name:v8n_required"]);
    assert_eq!(client.submit().await.unwrap(), Settled::Blocked);
    assert_eq!(mock.request_count(), 0);
    assert!(client.is_in("idle.template"));
}

#[tokio::test]
async fn test_required_name_gates_submit() {
    let mock = MockTransport::new();
    mock.expect_post("/api/webhooks").return_response(
        Response::json(201, &json!({"name": "x"})).with_header("Location", "/api/webhooks/3"),
    );
    let client = ResourceEngine::<Document>::builder()
        .parent("/api/webhooks")
        .rules(name_rules())
        .transport(mock.chain())
        .spawn();

    let errors = client.edit(doc(json!({"name": ""}))).await.unwrap();
    assert_eq!(errors, vec!["name:v8n_required"]);

    let errors = client.edit(doc(json!({"name": "x"}))).await.unwrap();
    assert!(errors.is_empty());

    assert_eq!(client.submit().await.unwrap(), Settled::Applied);
    assert_eq!(mock.request_count(), 1);
    assert_eq!(mock.requests()[0].body, Some(json!({"name": "x"})));
    mock.verify();
}

#[tokio::test]
async fn test_edits_with_disjoint_keys_compose() {
    let spawn = || {
        ResourceEngine::<Document>::builder()
            .transport(InterceptChain::offline())
            .spawn()
    };

    let stepwise = spawn();
    stepwise.edit(doc(json!({"name": "Orders"}))).await.unwrap();
    stepwise
        .edit(doc(json!({"url": "https://hooks.test/orders"})))
        .await
        .unwrap();

    let merged = spawn();
    merged
        .edit(doc(
            json!({"name": "Orders", "url": "https://hooks.test/orders"}),
        ))
        .await
        .unwrap();

    assert_eq!(stepwise.form(), merged.form());
    assert!(stepwise.is_in("idle.template"));
}

#[tokio::test]
async fn test_server_error_translated_by_message() {
    let chain = InterceptChain::offline().with_interceptor(|event: &mut FetchEvent| {
        match event.request().method {
            Method::Get => {
                let _ = event.respond(Response::ok_json(json!({"name": "Stripe"})));
            }
            _ => {
                let _ = event.respond(Response::json(
                    500,
                    &json!({"_embedded": {"errors": [{"message": "Gateway already configured"}]}}),
                ));
            }
        }
    });
    let client = ResourceEngine::<Document>::builder()
        .translator(translate::by_message(&[(
            "already configured",
            "already_configured",
        )]))
        .transport(chain)
        .spawn();

    client.set_href(Some("/gateways/1")).await.unwrap();
    client.edit(doc(json!({"name": "Stripe EU"}))).await.unwrap();
    let result = client.submit().await;

    assert!(matches!(result, Err(EngineError::Rejected(ref tokens)) if tokens == &["error:already_configured"]));
    assert_eq!(client.errors(), vec!["error:already_configured"]);
    assert!(client.is_in("fail"));
    assert_eq!(client.lifecycle(), Lifecycle::Fail(FailCause::Rejected));
    // The draft survives the failure.
    assert_eq!(client.form()["name"], "Stripe EU");
    assert_eq!(client.data().unwrap()["name"], "Stripe");
}

#[tokio::test]
async fn test_embedded_error_codes_by_default() {
    let mock = MockTransport::new();
    mock.expect_get("/items/1").return_ok(json!({"id": 1, "name": "Widget"}));
    mock.expect_patch("/items/1").return_json(
        422,
        json!({"_embedded": {"errors": [{"code": "duplicate_name"}]}}),
    );
    let client = ResourceEngine::<Item>::builder()
        .transport(mock.chain())
        .spawn();

    client.set_href(Some("/items/1")).await.unwrap();
    let result = client.submit().await;

    assert!(matches!(result, Err(EngineError::Rejected(_))));
    assert_eq!(client.errors(), vec!["error:duplicate_name"]);
    assert!(client.is_in("fail.rejected"));
    mock.verify();
}

#[tokio::test]
async fn test_unrecognized_failure_is_generic() {
    let mock = MockTransport::new();
    mock.expect_get("/items/1").return_ok(json!({"id": 1, "name": "Widget"}));
    mock.expect_patch("/items/1").return_status(502, "<html>Bad gateway</html>");
    let client = ResourceEngine::<Item>::builder()
        .transport(mock.chain())
        .spawn();

    client.set_href(Some("/items/1")).await.unwrap();
    client
        .edit(ItemPatch {
            name: Some("Gadget".into()),
        })
        .await
        .unwrap();
    let result = client.submit().await;

    assert!(matches!(result, Err(EngineError::Status { status: 502, .. })));
    assert!(client.is_in("fail.transport"));
    assert!(client.errors().is_empty());
    assert_eq!(client.form().name, "Gadget");
    assert_eq!(client.data().unwrap().name, "Widget");
}

#[tokio::test]
async fn test_load_failure_is_never_translated() {
    let mock = MockTransport::new();
    mock.expect_get("/items/404").return_json(
        404,
        json!({"_embedded": {"errors": [{"code": "not_found"}]}}),
    );
    let client = ResourceEngine::<Item>::builder()
        .transport(mock.chain())
        .spawn();

    let result = client.set_href(Some("/items/404")).await;

    assert!(matches!(result, Err(EngineError::Status { status: 404, .. })));
    assert!(client.is_in("fail.transport"));
    // No server tokens; only the template's own validation.
    assert_eq!(client.errors(), vec!["name:v8n_required"]);
    assert_eq!(client.data(), None);
    assert_eq!(client.href().as_deref(), Some("/items/404"));
}

#[tokio::test]
async fn test_submit_after_failed_load_is_blocked() {
    let mock = MockTransport::new();
    mock.expect_get("/items/1").return_status(503, "unavailable");
    let client = ResourceEngine::<Item>::builder()
        .transport(mock.chain())
        .spawn();

    assert!(client.set_href(Some("/items/1")).await.is_err());
    assert!(client.is_in("fail.transport"));
    assert_eq!(client.form(), Item::default());

    assert_eq!(client.submit().await.unwrap(), Settled::Blocked);
    assert_eq!(mock.request_count(), 1);
    mock.verify();
}

#[tokio::test]
async fn test_template_is_validated_while_loading() {
    let (interceptor, mut offers) = channel_interceptor();
    let client = ResourceEngine::<Item>::builder()
        .transport(InterceptChain::offline().with_interceptor(interceptor))
        .spawn();

    let pending = client.request_href(Some("/items/1")).await.unwrap();
    assert!(client.is_in("busy.fetching"));
    assert_eq!(client.errors(), vec!["name:v8n_required"]);
    assert_eq!(client.submit().await.unwrap(), Settled::Blocked);

    let offer = expect_offer(&mut offers, Method::Get).await.unwrap();
    offer.respond(Response::ok_json(json!({"id": 1, "name": "Widget"})));
    assert_eq!(pending.await.unwrap(), Settled::Applied);
    assert!(client.errors().is_empty());
    assert!(offers.try_recv().is_err(), "no request besides the load");
}

#[tokio::test]
async fn test_undecodable_load_fails_decode() {
    let mock = MockTransport::new();
    mock.expect_get("/items/1").return_status(200, "not json");
    let client = ResourceEngine::<Item>::builder()
        .transport(mock.chain())
        .spawn();

    let result = client.set_href(Some("/items/1")).await;

    assert!(matches!(result, Err(EngineError::Decode(_))));
    assert!(client.is_in("fail.decode"));
}

#[tokio::test]
async fn test_cancelled_offer_fails_transport() {
    let chain = InterceptChain::offline().with_interceptor(|event: &mut FetchEvent| {
        event.prevent_default();
    });
    let client = ResourceEngine::<Document>::builder().transport(chain).spawn();

    let result = client.set_href(Some("/items/1")).await;

    assert!(matches!(
        result,
        Err(EngineError::Transport(TransportError::Cancelled))
    ));
    assert!(client.is_in("fail.transport"));
}

#[tokio::test]
async fn test_create_resolves_href_then_delete_returns_to_template() {
    let mock = MockTransport::new();
    mock.expect_post("/api/items").return_json(
        201,
        json!({"id": 9, "name": "Widget", "_links": {"self": {"href": "9"}}}),
    );
    mock.expect_delete("/api/items/9").return_response(Response::no_content());
    let client = ResourceEngine::<Item>::builder()
        .parent("/api/items")
        .transport(mock.chain())
        .spawn();

    client
        .edit(ItemPatch {
            name: Some("Widget".into()),
        })
        .await
        .unwrap();
    assert_eq!(client.submit().await.unwrap(), Settled::Applied);
    assert_eq!(client.href().as_deref(), Some("/api/items/9"));
    assert_eq!(client.data().unwrap().id, 9);
    assert!(client.is_in("idle.snapshot"));

    assert_eq!(client.delete().await.unwrap(), Settled::Applied);
    assert!(client.is_in("idle.template"));
    assert_eq!(client.href(), None);
    assert_eq!(client.data(), None);
    assert_eq!(client.form(), Item::default());
    assert_eq!(client.errors(), vec!["name:v8n_required"]);
    mock.verify();
}

#[tokio::test]
async fn test_failed_delete_keeps_resource() {
    let mock = MockTransport::new();
    mock.expect_get("/items/1").return_ok(json!({"id": 1, "name": "Widget"}));
    mock.expect_delete("/items/1").return_json(
        409,
        json!({"_embedded": {"errors": [{"code": "in_use"}]}}),
    );
    let client = ResourceEngine::<Item>::builder()
        .transport(mock.chain())
        .spawn();
    client.set_href(Some("/items/1")).await.unwrap();

    let result = client.delete().await;

    assert!(matches!(result, Err(EngineError::Rejected(ref tokens)) if tokens == &["error:in_use"]));
    assert!(client.is_in("fail.rejected"));
    assert_eq!(client.errors(), vec!["error:in_use"]);
    assert_eq!(client.href().as_deref(), Some("/items/1"));
    assert_eq!(client.data().unwrap().name, "Widget");
    assert_eq!(client.form().name, "Widget");
    mock.verify();
}

#[tokio::test]
async fn test_untranslated_delete_failure_is_generic() {
    let mock = MockTransport::new();
    mock.expect_get("/items/1").return_ok(json!({"id": 1, "name": "Widget"}));
    mock.expect_delete("/items/1").return_status(500, "boom");
    let client = ResourceEngine::<Item>::builder()
        .transport(mock.chain())
        .spawn();
    client.set_href(Some("/items/1")).await.unwrap();

    let result = client.delete().await;

    assert!(matches!(result, Err(EngineError::Status { status: 500, .. })));
    assert!(client.is_in("fail.transport"));
    assert!(client.errors().is_empty());
    assert_eq!(client.href().as_deref(), Some("/items/1"));
    assert!(client.data().is_some());
}

async fn loaded_item(
    offers: &mut UnboundedReceiver<Offer>,
    client: &EngineClient<Item>,
) {
    let pending = client.request_href(Some("/items/1")).await.unwrap();
    let offer = expect_offer(offers, Method::Get).await.unwrap();
    offer.respond(Response::ok_json(json!({"id": 1, "name": "Widget"})));
    assert_eq!(pending.await.unwrap(), Settled::Applied);
}

#[tokio::test]
async fn test_submit_superseded_by_href_change() {
    let (interceptor, mut offers) = channel_interceptor();
    let client = ResourceEngine::<Item>::builder()
        .transport(InterceptChain::offline().with_interceptor(interceptor))
        .spawn();
    loaded_item(&mut offers, &client).await;

    client
        .edit(ItemPatch {
            name: Some("Renamed".into()),
        })
        .await
        .unwrap();
    let submit = client.request_submit().await.unwrap();
    let offer = expect_offer(&mut offers, Method::Patch).await.unwrap();
    assert!(client.is_in("busy.updating"));

    assert_eq!(client.set_href(None).await.unwrap(), Settled::Applied);

    offer.respond(Response::ok_json(json!({"id": 1, "name": "Renamed"})));
    assert_eq!(submit.await.unwrap(), Settled::Superseded);

    assert!(client.is_in("idle.template"));
    assert_eq!(client.href(), None);
    assert_eq!(client.data(), None);
    assert_eq!(client.form(), Item::default());
}

#[tokio::test]
async fn test_overlapping_submits_last_request_wins() {
    let (interceptor, mut offers) = channel_interceptor();
    let client = ResourceEngine::<Item>::builder()
        .transport(InterceptChain::offline().with_interceptor(interceptor))
        .spawn();
    loaded_item(&mut offers, &client).await;

    let rename = |name: &str| ItemPatch {
        name: Some(name.into()),
    };

    client.edit(rename("First")).await.unwrap();
    let first = client.request_submit().await.unwrap();
    client.edit(rename("Second")).await.unwrap();
    let second = client.request_submit().await.unwrap();

    let offer_first = expect_offer(&mut offers, Method::Patch).await.unwrap();
    let offer_second = expect_offer(&mut offers, Method::Patch).await.unwrap();
    assert_eq!(offer_first.request.body.as_ref().unwrap()["name"], "First");
    assert_eq!(offer_second.request.body.as_ref().unwrap()["name"], "Second");

    offer_second.respond(Response::ok_json(json!({"id": 1, "name": "Second"})));
    assert_eq!(second.await.unwrap(), Settled::Applied);

    // The earlier submit fails late; it must neither fail the form nor add tokens.
    offer_first.respond(Response::json(
        422,
        &json!({"_embedded": {"errors": [{"code": "stale"}]}}),
    ));
    assert_eq!(first.await.unwrap(), Settled::Superseded);

    assert!(client.is_in("idle.snapshot"));
    assert_eq!(client.data().unwrap().name, "Second");
    assert!(client.errors().is_empty());
}

#[tokio::test]
async fn test_create_without_identity_fails_decode() {
    let mock = MockTransport::new();
    mock.expect_post("/api/items").return_json(201, json!({"name": "Widget"}));
    let client = ResourceEngine::<Item>::builder()
        .parent("/api/items")
        .transport(mock.chain())
        .spawn();

    client
        .edit(ItemPatch {
            name: Some("Widget".into()),
        })
        .await
        .unwrap();
    let result = client.submit().await;

    assert!(matches!(result, Err(EngineError::MissingIdentity)));
    assert!(client.is_in("fail.decode"));
    assert_eq!(client.href(), None);
}

#[tokio::test]
async fn test_operations_without_identity_or_collection() {
    let mock = MockTransport::new();
    let client = ResourceEngine::<Document>::builder()
        .transport(mock.chain())
        .spawn();

    assert!(matches!(client.delete().await, Err(EngineError::NotCreated)));
    assert!(matches!(client.submit().await, Err(EngineError::NoCollection)));
    assert!(client.is_in("idle.template"));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_reset_discards_draft() {
    let mock = MockTransport::new();
    mock.expect_get("/items/1").return_ok(json!({"id": 1, "name": "Widget"}));
    let client = ResourceEngine::<Item>::builder()
        .transport(mock.chain())
        .spawn();
    client.set_href(Some("/items/1")).await.unwrap();

    let errors = client
        .edit(ItemPatch {
            name: Some(String::new()),
        })
        .await
        .unwrap();
    assert_eq!(errors, vec!["name:v8n_required"]);

    let errors = client.reset().await.unwrap();
    assert!(errors.is_empty());
    assert_eq!(client.form().name, "Widget");
    assert!(client.is_in("idle.snapshot"));
}

#[tokio::test]
async fn test_relative_href_resolves_against_parent() {
    let mock = MockTransport::new();
    mock.expect_get("/api/items/7").return_ok(json!({"id": 7, "name": "Seven"}));
    let client = ResourceEngine::<Item>::builder()
        .parent("/api/items")
        .href("7")
        .transport(mock.chain())
        .spawn();

    let mut changes = client.subscribe();
    while !client.is_in("idle.snapshot") {
        changes.changed().await.unwrap();
    }

    assert_eq!(client.href().as_deref(), Some("/api/items/7"));
    assert_eq!(client.data().unwrap().id, 7);
    mock.verify();
}

#[tokio::test]
async fn test_edit_while_loading_does_not_block() {
    let (interceptor, mut offers) = channel_interceptor();
    let client = ResourceEngine::<Item>::builder()
        .transport(InterceptChain::offline().with_interceptor(interceptor))
        .spawn();

    let pending = client.request_href(Some("/items/1")).await.unwrap();
    let errors = client
        .edit(ItemPatch {
            name: Some("Typed early".into()),
        })
        .await
        .unwrap();
    assert!(errors.is_empty());
    assert!(client.is_in("busy.fetching"));

    let offer = expect_offer(&mut offers, Method::Get).await.unwrap();
    offer.respond(Response::ok_json(json!({"id": 1, "name": "Server"})));
    pending.await.unwrap();

    assert_eq!(client.form().name, "Server");
}

#[tokio::test]
async fn test_engine_stops_when_clients_are_dropped() {
    let (engine, client) = ResourceEngine::<Document>::new(InterceptChain::offline());
    let handle = tokio::spawn(engine.run());

    client.edit(doc(json!({"name": "x"}))).await.unwrap();
    drop(client);

    handle.await.unwrap();
}
