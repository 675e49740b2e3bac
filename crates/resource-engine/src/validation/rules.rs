//! Rule constructors for the checks admin forms repeat everywhere.
//!
//! Every constructor takes a `scope` (the token prefix, usually the field path)
//! and a getter that extracts the checked value from the draft. Getters return
//! `None` when the value is absent; only [`required`] and [`required_when`]
//! report absence, the shape checks skip it.

use super::{Rule, Verdict};
use crate::patch::Document;
use serde_json::Value;
use std::ops::RangeInclusive;

fn token(scope: &str, reason: &str) -> String {
    format!("{scope}:v8n_{reason}")
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// `<scope>:v8n_required` when the value is absent or blank.
pub fn required<T, G>(scope: impl Into<String>, get: G) -> Rule<T>
where
    T: 'static,
    G: Fn(&T) -> Option<String> + Send + Sync + 'static,
{
    let scope = scope.into();
    Rule::new(move |draft, _| Verdict::check(!is_blank(&get(draft)), token(&scope, "required")))
}

/// `<scope>:v8n_required` when `condition` holds and the value is absent or blank.
///
/// Used for discriminated drafts ("if `kind == X`, field `Y` is required").
pub fn required_when<T, C, G>(scope: impl Into<String>, condition: C, get: G) -> Rule<T>
where
    T: 'static,
    C: Fn(&T) -> bool + Send + Sync + 'static,
    G: Fn(&T) -> Option<String> + Send + Sync + 'static,
{
    let scope = scope.into();
    Rule::new(move |draft, _| {
        if condition(draft) {
            Verdict::check(!is_blank(&get(draft)), token(&scope, "required"))
        } else {
            Verdict::Valid
        }
    })
}

/// `<scope>:v8n_too_short` / `<scope>:v8n_too_long`, counted in chars.
pub fn length<T, G>(scope: impl Into<String>, get: G, bounds: RangeInclusive<usize>) -> Rule<T>
where
    T: 'static,
    G: Fn(&T) -> Option<String> + Send + Sync + 'static,
{
    let scope = scope.into();
    Rule::new(move |draft, _| {
        let Some(value) = get(draft) else {
            return Verdict::Valid;
        };
        let len = value.chars().count();
        if len < *bounds.start() {
            Verdict::invalid(token(&scope, "too_short"))
        } else if len > *bounds.end() {
            Verdict::invalid(token(&scope, "too_long"))
        } else {
            Verdict::Valid
        }
    })
}

/// `<scope>:v8n_invalid_url` unless the value is an absolute http(s) URL.
pub fn url<T, G>(scope: impl Into<String>, get: G) -> Rule<T>
where
    T: 'static,
    G: Fn(&T) -> Option<String> + Send + Sync + 'static,
{
    let scope = scope.into();
    Rule::new(move |draft, _| {
        let value = get(draft);
        if is_blank(&value) {
            return Verdict::Valid;
        }
        let valid = value
            .as_deref()
            .and_then(|raw| url::Url::parse(raw.trim()).ok())
            .is_some_and(|parsed| {
                matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some()
            });
        Verdict::check(valid, token(&scope, "invalid_url"))
    })
}

/// `<scope>:v8n_<reason>` when the cross-field predicate fails.
///
/// The predicate sees both the draft and the last confirmed resource, e.g.
/// "the currency cannot change once the gateway exists".
pub fn consistent<T, P>(scope: impl Into<String>, reason: &str, predicate: P) -> Rule<T>
where
    T: 'static,
    P: Fn(&T, Option<&T>) -> bool + Send + Sync + 'static,
{
    let token = token(&scope.into(), reason);
    Rule::new(move |draft, data| Verdict::check(predicate(draft, data), token.clone()))
}

/// Getter for a top-level key of a [`Document`] draft.
///
/// Strings are returned as is, `null` and missing keys as `None`, anything else
/// in its JSON form (an empty array reads as blank).
pub fn document_field(name: &str) -> impl Fn(&Document) -> Option<String> + Send + Sync + 'static {
    let name = name.to_string();
    move |doc: &Document| match doc.get(&name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) if items.is_empty() => Some(String::new()),
        other => Some(other.to_string()),
    }
}
