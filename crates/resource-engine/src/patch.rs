//! # Drafts & Patches
//!
//! Every draft managed by a [`ResourceEngine`](crate::ResourceEngine) is edited by
//! **shallow merge**: a patch carries only the keys it wants to change, and
//! [`Merge::merge`] overwrites exactly those keys on the current draft.
//!
//! Two flavours are supported:
//!
//! - **Typed drafts**: a struct with a companion patch struct whose fields are all
//!   `Option`s. The entity's `merge` copies every `Some` field across.
//! - **Documents**: untyped JSON objects ([`Document`]) that merge key-by-key.
//!
//! ## Nested configuration
//!
//! Several admin resources store structured configuration in a single string field
//! (a JSON blob inside the JSON resource). [`Embedded<C>`] keeps that configuration
//! typed in memory and only turns it into a string at the serialization boundary,
//! so a nested patch is applied with [`Merge`] instead of parse-patch-reserialize.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};

/// Shallow-merge contract for drafts.
pub trait Merge {
    /// Partial representation of `Self`.
    type Patch;

    /// Applies `patch` on top of `self`. Keys absent from the patch are untouched.
    fn merge(&mut self, patch: Self::Patch);
}

/// An untyped JSON object draft.
pub type Document = Map<String, Value>;

impl Merge for Document {
    type Patch = Document;

    fn merge(&mut self, patch: Document) {
        for (key, value) in patch {
            self.insert(key, value);
        }
    }
}

/// A typed value stored as a serialized JSON string on the wire.
///
/// ```rust
/// use resource_engine::patch::Embedded;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
/// struct Config { region: String }
///
/// let embedded = Embedded::new(Config { region: "eu".into() });
/// let wire = serde_json::to_value(&embedded).unwrap();
/// assert_eq!(wire, serde_json::json!("{\"region\":\"eu\"}"));
///
/// let back: Embedded<Config> = serde_json::from_value(wire).unwrap();
/// assert_eq!(back.region, "eu");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embedded<C>(pub C);

impl<C> Embedded<C> {
    pub fn new(inner: C) -> Self {
        Self(inner)
    }

    pub fn into_inner(self) -> C {
        self.0
    }
}

impl<C> Deref for Embedded<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.0
    }
}

impl<C> DerefMut for Embedded<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.0
    }
}

impl<C: Serialize> Serialize for Embedded<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = serde_json::to_string(&self.0).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&raw)
    }
}

impl<'de, C: DeserializeOwned> Deserialize<'de> for Embedded<C> {
    /// Accepts the serialized string form and, leniently, an inline object.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let inner = match Value::deserialize(deserializer)? {
            Value::String(raw) => serde_json::from_str(&raw),
            inline => serde_json::from_value(inline),
        }
        .map_err(serde::de::Error::custom)?;
        Ok(Self(inner))
    }
}

impl<C: Merge> Merge for Embedded<C> {
    type Patch = C::Patch;

    fn merge(&mut self, patch: C::Patch) {
        self.0.merge(patch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Credentials {
        public_key: String,
        sandbox: bool,
    }

    #[derive(Debug, Default, Deserialize)]
    struct CredentialsPatch {
        public_key: Option<String>,
        sandbox: Option<bool>,
    }

    impl Merge for Credentials {
        type Patch = CredentialsPatch;

        fn merge(&mut self, patch: CredentialsPatch) {
            if let Some(public_key) = patch.public_key {
                self.public_key = public_key;
            }
            if let Some(sandbox) = patch.sandbox {
                self.sandbox = sandbox;
            }
        }
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_document_merge_overwrites_only_patched_keys() {
        let mut draft = doc(json!({"name": "a", "url": "https://x.test"}));
        draft.merge(doc(json!({"name": "b", "events": ["order.created"]})));

        assert_eq!(
            Value::Object(draft),
            json!({"name": "b", "url": "https://x.test", "events": ["order.created"]})
        );
    }

    #[test]
    fn test_disjoint_document_edits_compose() {
        let base = doc(json!({"name": "a", "url": "u"}));

        let mut stepwise = base.clone();
        stepwise.merge(doc(json!({"name": "b"})));
        stepwise.merge(doc(json!({"url": "v"})));

        let mut combined = base;
        combined.merge(doc(json!({"name": "b", "url": "v"})));

        assert_eq!(stepwise, combined);
    }

    #[test]
    fn test_embedded_round_trips_through_string_and_accepts_inline() {
        let creds = Embedded::new(Credentials {
            public_key: "pk_1".into(),
            sandbox: true,
        });
        let wire = serde_json::to_value(&creds).unwrap();
        assert!(wire.is_string());

        let inline: Embedded<Credentials> =
            serde_json::from_value(json!({"public_key": "pk_2", "sandbox": false})).unwrap();
        assert_eq!(inline.public_key, "pk_2");

        let garbage = serde_json::from_value::<Embedded<Credentials>>(json!("{not json"));
        assert!(garbage.is_err());
    }

    #[test]
    fn test_embedded_merges_nested_patch_typed() {
        let mut creds = Embedded::new(Credentials::default());
        creds.merge(CredentialsPatch {
            public_key: Some("pk_live".into()),
            sandbox: None,
        });

        assert_eq!(creds.public_key, "pk_live");
        assert!(!creds.sandbox);
    }
}
