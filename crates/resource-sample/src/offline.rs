//! # Offline Admin API
//!
//! An [`Interceptor`] that answers the admin API from memory, so the sample runs
//! (and is tested) without a server. It claims only requests under the
//! collections it was given; anything else falls through to the chain's
//! fallback transport.
//!
//! Collections behave like the real HAL API:
//!
//! - `POST <collection>` stores the body under `<collection>/<n>`, adds `id` and
//!   `_links.self.href`, answers `201 Created` with a `Location` header.
//! - `GET`, `PATCH` (shallow merge) and `DELETE` address `<collection>/<n>`;
//!   unknown ids answer `404` with an embedded `not_found` error.
//! - Unique fields reject duplicates with `500` and an embedded error message,
//!   the way the payment service reports an already configured provider.

use resource_engine::transport::{FetchEvent, Interceptor, Method, Request, Response};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

struct UniqueField {
    collection: String,
    field: String,
    message: String,
}

#[derive(Default)]
struct Store {
    collections: Vec<String>,
    unique: Vec<UniqueField>,
    resources: BTreeMap<String, Value>,
    next_id: u64,
}

/// In-memory admin API. Clones share the same store.
#[derive(Clone, Default)]
pub struct OfflineStore {
    store: Arc<Mutex<Store>>,
}

fn error_body(status: u16, code: &str, message: &str) -> Response {
    Response::json(
        status,
        &json!({"_embedded": {"errors": [{"code": code, "message": message}]}}),
    )
}

fn message_body(status: u16, message: &str) -> Response {
    Response::json(
        status,
        &json!({"_embedded": {"errors": [{"message": message}]}}),
    )
}

impl OfflineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `collection` (e.g. `"/api/webhooks"`).
    pub fn with_collection(self, collection: impl Into<String>) -> Self {
        self.lock().collections.push(collection.into());
        self
    }

    /// Rejects a create when another resource of `collection` has the same `field`.
    pub fn with_unique(
        self,
        collection: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.lock().unique.push(UniqueField {
            collection: collection.into(),
            field: field.into(),
            message: message.into(),
        });
        self
    }

    pub fn get(&self, href: &str) -> Option<Value> {
        self.lock().resources.get(href).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The response for `request`, or `None` when it is not ours.
    fn handle(&self, request: &Request) -> Option<Response> {
        let mut store = self.lock();
        let collection = store
            .collections
            .iter()
            .find(|c| request.url == **c || request.url.starts_with(&format!("{c}/")))?
            .clone();

        let response = match request.method {
            Method::Post if request.url == collection => store.create(&collection, request),
            Method::Post => error_body(405, "method_not_allowed", "Cannot POST to a resource"),
            _ if request.url == collection => {
                error_body(405, "method_not_allowed", "Collections only accept POST")
            }
            Method::Get => match store.resources.get(&request.url) {
                Some(resource) => Response::ok_json(resource.clone()),
                None => error_body(404, "not_found", "Resource not found"),
            },
            Method::Patch => store.update(request),
            Method::Delete => match store.resources.remove(&request.url) {
                Some(_) => Response::no_content(),
                None => error_body(404, "not_found", "Resource not found"),
            },
        };
        Some(response)
    }
}

impl Store {
    fn create(&mut self, collection: &str, request: &Request) -> Response {
        let Some(Value::Object(mut body)) = request.body.clone() else {
            return error_body(400, "invalid_body", "Expected a JSON object");
        };

        let prefix = format!("{collection}/");
        for unique in self.unique.iter().filter(|u| u.collection == collection) {
            let Some(value) = body.get(&unique.field) else {
                continue;
            };
            let duplicate = self
                .resources
                .iter()
                .filter(|(href, _)| href.starts_with(&prefix))
                .any(|(_, existing)| existing.get(&unique.field) == Some(value));
            if duplicate {
                return message_body(500, &unique.message);
            }
        }

        self.next_id += 1;
        let href = format!("{prefix}{}", self.next_id);
        body.insert("id".into(), json!(self.next_id));
        body.insert("_links".into(), json!({"self": {"href": href}}));
        let resource = Value::Object(body);
        self.resources.insert(href.clone(), resource.clone());

        Response::json(201, &resource).with_header("Location", href)
    }

    fn update(&mut self, request: &Request) -> Response {
        let Some(Value::Object(patch)) = request.body.clone() else {
            return error_body(400, "invalid_body", "Expected a JSON object");
        };
        let Some(Value::Object(resource)) = self.resources.get_mut(&request.url) else {
            return error_body(404, "not_found", "Resource not found");
        };

        let patch: Map<String, Value> = patch
            .into_iter()
            .filter(|(key, _)| key != "_links" && key != "id")
            .collect();
        resource.extend(patch);
        Response::ok_json(Value::Object(resource.clone()))
    }
}

impl Interceptor for OfflineStore {
    fn on_fetch(&self, event: &mut FetchEvent) {
        if event.has_responded() || event.is_default_prevented() {
            return;
        }
        if let Some(response) = self.handle(event.request()) {
            debug!(
                method = %event.request().method,
                url = %event.request().url,
                status = response.status,
                "Offline API"
            );
            let _ = event.respond(response);
        }
    }
}
