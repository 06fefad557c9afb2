//!
//! ironrest registry / dispatcher
//! ------------------------------
//! Maps collection names to endpoints, enforces the shared access token, and
//! routes each inbound request to the right endpoint. Unknown names answer
//! 404 before the token is examined; a missing or mismatched token answers
//! 401 before any endpoint logic runs.
//!
//! The name map is written only by administrative `attach`/`detach` calls
//! and read on every request, so it lives behind a `parking_lot::RwLock`
//! holding `Arc<Endpoint>` values: a dispatching request clones the Arc out
//! of the read guard, and a concurrent detach cannot disturb it.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{HeaderMap, Method};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::endpoint::{Endpoint, EndpointConfig, PathParams, Reply};
use crate::error::RestError;
use crate::store::Store;

/// Shared-secret header checked on every dispatched request.
pub const AUTH_TOKEN_HEADER: &str = "x-ironrest-auth-token";

/// Process-wide dispatcher settings.
#[derive(Debug, Clone)]
pub struct RestSettings {
    /// Path prefix the HTTP surface is mounted under.
    pub prefix: String,
    /// Shared secret required in [`AUTH_TOKEN_HEADER`]. An empty token
    /// rejects everything until `configure` sets one.
    pub access_token: String,
}

impl Default for RestSettings {
    fn default() -> Self {
        RestSettings { prefix: "/api".to_string(), access_token: String::new() }
    }
}

/// Partial settings merged by [`Registry::configure`]; unset fields keep
/// their current value.
#[derive(Debug, Clone, Default)]
pub struct ConfigureOptions {
    pub prefix: Option<String>,
    pub access_token: Option<String>,
}

/// Collection-name → endpoint table plus dispatcher settings.
#[derive(Default)]
pub struct Registry {
    endpoints: RwLock<HashMap<String, Arc<Endpoint>>>,
    settings: RwLock<RestSettings>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `options` into the dispatcher settings. Expected once at
    /// startup, before traffic begins.
    pub fn configure(&self, options: ConfigureOptions) {
        let mut settings = self.settings.write();
        if let Some(prefix) = options.prefix {
            settings.prefix = prefix;
        }
        if let Some(token) = options.access_token {
            settings.access_token = token;
        }
    }

    pub fn settings(&self) -> RestSettings {
        self.settings.read().clone()
    }

    /// Register an endpoint for `name`, replacing any previous binding.
    pub fn attach(&self, name: &str, store: Arc<dyn Store>, config: EndpointConfig) {
        let endpoint = Arc::new(Endpoint::new(store, config));
        self.endpoints.write().insert(name.to_string(), endpoint);
        debug!(target: "ironrest::registry", "attached collection '{}'", name);
    }

    /// Remove the binding for `name`. Requests already dispatched keep their
    /// captured endpoint and finish normally.
    pub fn detach(&self, name: &str) {
        self.endpoints.write().remove(name);
        debug!(target: "ironrest::registry", "detached collection '{}'", name);
    }

    /// Snapshot the endpoint registered under `name`, if any.
    pub fn endpoint(&self, name: &str) -> Option<Arc<Endpoint>> {
        self.endpoints.read().get(name).cloned()
    }

    /// Dispatch one request: resolve the collection, verify the token,
    /// delegate to the endpoint.
    pub async fn handle_request(
        &self,
        params: &PathParams,
        method: &Method,
        headers: &HeaderMap,
        body: Value,
    ) -> Reply {
        let Some(endpoint) = self.endpoint(&params.collection) else {
            return Reply::error(RestError::not_found());
        };

        let provided = headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let expected = self.settings.read().access_token.clone();
        if provided.is_empty() || provided != expected {
            debug!(target: "ironrest::registry", "token rejected for collection '{}'", params.collection);
            return Reply::error(RestError::unauthorized());
        }

        endpoint.handle(params, method, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_merges_partial_options() {
        let registry = Registry::new();
        assert_eq!(registry.settings().prefix, "/api");
        assert_eq!(registry.settings().access_token, "");

        registry.configure(ConfigureOptions {
            access_token: Some("secret".to_string()),
            ..Default::default()
        });
        assert_eq!(registry.settings().prefix, "/api");
        assert_eq!(registry.settings().access_token, "secret");

        registry.configure(ConfigureOptions {
            prefix: Some("/v1".to_string()),
            ..Default::default()
        });
        assert_eq!(registry.settings().prefix, "/v1");
        assert_eq!(registry.settings().access_token, "secret");
    }

    #[test]
    fn attach_replaces_and_detach_removes() {
        use crate::store::memory::MemoryStore;
        let registry = Registry::new();
        let store = Arc::new(MemoryStore::new());
        registry.attach("widgets", store.clone(), EndpointConfig::default());
        assert!(registry.endpoint("widgets").is_some());

        registry.attach("widgets", store, EndpointConfig::default());
        assert!(registry.endpoint("widgets").is_some());

        registry.detach("widgets");
        assert!(registry.endpoint("widgets").is_none());
    }
}
