//! # Engine Configuration
//!
//! Settings shared by every engine of an application: channel capacity,
//! request timeout, base URL for server-relative identities and default
//! headers. [`EngineConfig::from_env`] reads them from `RESOURCE_ENGINE_*`
//! variables; [`EngineConfig::transport`] turns them into an HTTP-backed
//! [`InterceptChain`] that interceptors can be added to.
//!
//! ```rust
//! use resource_engine::EngineConfig;
//!
//! let config = EngineConfig::from_lookup(|var: &str| match var {
//!     "RESOURCE_ENGINE_BUFFER_SIZE" => Some("8".to_string()),
//!     _ => None,
//! })
//! .unwrap();
//! assert_eq!(config.buffer_size, 8);
//! ```

use crate::transport::{HttpTransport, InterceptChain};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

pub const BUFFER_SIZE_VAR: &str = "RESOURCE_ENGINE_BUFFER_SIZE";
pub const TIMEOUT_MS_VAR: &str = "RESOURCE_ENGINE_TIMEOUT_MS";
pub const BASE_URL_VAR: &str = "RESOURCE_ENGINE_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Engine configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity of each engine's request channel (default: `32`).
    pub buffer_size: usize,
    /// Upper bound for a whole exchange, intercepted or not (default: none).
    pub request_timeout: Option<Duration>,
    /// Base for server-relative identities (default: none).
    pub base_url: Option<Url>,
    /// Headers added to every outbound request.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let default_headers = [
            ("accept", "application/json"),
            ("content-type", "application/json"),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

        Self {
            buffer_size: 32,
            request_timeout: None,
            base_url: None,
            default_headers,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `RESOURCE_ENGINE_BUFFER_SIZE` | `32`    |
    /// | `RESOURCE_ENGINE_TIMEOUT_MS`  | none    |
    /// | `RESOURCE_ENGINE_BASE_URL`    | none    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`EngineConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let invalid = |var: &'static str, value: &str, reason: String| ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason,
        };

        if let Some(value) = lookup(BUFFER_SIZE_VAR) {
            config.buffer_size = match value.trim().parse::<usize>() {
                Ok(0) => return Err(invalid(BUFFER_SIZE_VAR, &value, "must be positive".into())),
                Ok(size) => size,
                Err(e) => return Err(invalid(BUFFER_SIZE_VAR, &value, e.to_string())),
            };
        }

        if let Some(value) = lookup(TIMEOUT_MS_VAR) {
            let millis = value
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid(TIMEOUT_MS_VAR, &value, e.to_string()))?;
            config.request_timeout = Some(Duration::from_millis(millis));
        }

        if let Some(value) = lookup(BASE_URL_VAR).filter(|value| !value.trim().is_empty()) {
            let url = Url::parse(value.trim())
                .map_err(|e| invalid(BASE_URL_VAR, &value, e.to_string()))?;
            config.base_url = Some(url);
        }

        Ok(config)
    }

    /// An interception chain (no interceptors yet) over HTTP, with this
    /// configuration's headers and timeout.
    pub fn transport(&self) -> InterceptChain {
        let http = match &self.base_url {
            Some(base_url) => HttpTransport::new().with_base_url(base_url.clone()),
            None => HttpTransport::new(),
        };

        let mut chain = InterceptChain::new(http);
        for (name, value) in &self.default_headers {
            chain = chain.with_default_header(name, value.clone());
        }
        match self.request_timeout {
            Some(timeout) => chain.with_timeout(timeout),
            None => chain,
        }
    }
}
