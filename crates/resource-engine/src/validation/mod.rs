//! # Validation Pipeline
//!
//! A declarative, side-effect-free set of rules evaluated against a draft and the
//! last confirmed resource. The engine re-runs the pipeline on every edit, after
//! every successful load and whenever the draft is reseeded, so validation errors
//! are visible before any submit attempt and never need a network round trip.
//!
//! ## Evaluation
//!
//! [`RuleSet::evaluate`] runs **every** rule in declaration order and concatenates
//! the tokens of the failing ones. It never short-circuits: all violations are
//! reported at once, not just the first.
//!
//! ## Tokens
//!
//! Rules report errors as `"<scope>:v8n_<reason>"` tokens (`"url:v8n_required"`,
//! `"config.api_key:v8n_too_short"`). Consumers scope errors to a sub-form by
//! prefix, see [`scoped`] and [`first_in_scope`].
//!
//! ```rust
//! use resource_engine::patch::Document;
//! use resource_engine::validation::{rules, RuleSet};
//! use serde_json::json;
//!
//! let rules: RuleSet<Document> = RuleSet::new()
//!     .with(rules::required("name", rules::document_field("name")))
//!     .with(rules::url("url", rules::document_field("url")));
//!
//! let draft = json!({"name": "", "url": "ftp://nope"}).as_object().cloned().unwrap();
//! assert_eq!(
//!     rules.evaluate(&draft, None),
//!     vec!["name:v8n_required", "url:v8n_invalid_url"]
//! );
//! ```

pub mod rules;

use std::fmt;
use std::sync::Arc;

/// Outcome of a single rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(Vec<String>),
}

impl Verdict {
    /// A single-token failure.
    pub fn invalid(token: impl Into<String>) -> Self {
        Verdict::Invalid(vec![token.into()])
    }

    /// `Valid` when `ok`, otherwise a single-token failure.
    pub fn check(ok: bool, token: impl Into<String>) -> Self {
        if ok {
            Verdict::Valid
        } else {
            Verdict::invalid(token)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

impl From<Vec<String>> for Verdict {
    fn from(tokens: Vec<String>) -> Self {
        if tokens.is_empty() {
            Verdict::Valid
        } else {
            Verdict::Invalid(tokens)
        }
    }
}

type RuleFn<T> = dyn Fn(&T, Option<&T>) -> Verdict + Send + Sync;

/// A pure check over `(draft, confirmed)`.
///
/// Rules must not depend on network state or wall-clock time.
pub struct Rule<T> {
    check: Arc<RuleFn<T>>,
}

impl<T> Clone for Rule<T> {
    fn clone(&self) -> Self {
        Self {
            check: Arc::clone(&self.check),
        }
    }
}

impl<T: 'static> Rule<T> {
    pub fn new(check: impl Fn(&T, Option<&T>) -> Verdict + Send + Sync + 'static) -> Self {
        Self {
            check: Arc::new(check),
        }
    }

    pub fn check(&self, draft: &T, data: Option<&T>) -> Verdict {
        (self.check)(draft, data)
    }
}

/// An ordered, immutable list of rules.
pub struct RuleSet<T> {
    rules: Vec<Rule<T>>,
}

impl<T> Clone for RuleSet<T> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
        }
    }
}

impl<T> Default for RuleSet<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T> fmt::Debug for RuleSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl<T: 'static> RuleSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule built by one of the [`rules`] constructors.
    pub fn with(mut self, rule: Rule<T>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Appends an ad-hoc rule closure.
    pub fn rule(self, check: impl Fn(&T, Option<&T>) -> Verdict + Send + Sync + 'static) -> Self {
        self.with(Rule::new(check))
    }

    /// Appends every rule of `other`, preserving its order.
    pub fn extend(mut self, other: RuleSet<T>) -> Self {
        self.rules.extend(other.rules);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs every rule in declaration order and returns the flattened tokens.
    pub fn evaluate(&self, draft: &T, data: Option<&T>) -> Vec<String> {
        self.rules
            .iter()
            .flat_map(|rule| match rule.check(draft, data) {
                Verdict::Valid => Vec::new(),
                Verdict::Invalid(tokens) => tokens,
            })
            .collect()
    }
}

impl<T> FromIterator<Rule<T>> for RuleSet<T> {
    fn from_iter<I: IntoIterator<Item = Rule<T>>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// Tokens starting with `prefix`, in order.
pub fn scoped<'a>(errors: &'a [String], prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    errors
        .iter()
        .map(String::as_str)
        .filter(move |token| token.starts_with(prefix))
}

/// The first token starting with `prefix`, with the prefix stripped.
pub fn first_in_scope<'a>(errors: &'a [String], prefix: &str) -> Option<&'a str> {
    errors.iter().find_map(|token| token.strip_prefix(prefix))
}
