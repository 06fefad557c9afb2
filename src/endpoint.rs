//!
//! ironrest endpoint
//! -----------------
//! Per-collection request handler. An `Endpoint` owns one collection
//! binding: its authorization slots, its lifecycle hooks, and its id
//! normalization rules, all fixed at construction via `EndpointConfig`.
//!
//! The only routing decision made here is target shape: requests without a
//! document id address the collection (list/create), requests with one
//! address a single document (read/replace/delete). Per method the pipeline
//! is strictly sequential: permission gate, before hook, store call,
//! re-fetch, reply, after hook. A before hook may cancel the request, which
//! reads as an authorization failure; after hooks run once the reply has
//! been computed and can no longer affect it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::error::RestError;
use crate::id::{to_internal_id, to_wire_id};
use crate::store::{DocId, FindOptions, Store};

/// Document-scope GET and POST/PUT skip the allow slots; only
/// collection-scope requests consult them (DELETE is gated by its before
/// hook instead). The constant pins that asymmetry so it stays explicit and
/// reviewable rather than drifting toward the symmetric behavior.
pub const ENFORCE_DOCUMENT_SCOPE_ALLOW: bool = false;

/// The four gated actions an endpoint can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    View,
    Insert,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// Outcome of a before hook: substitute the subject, or cancel the request.
/// A cancellation terminates with 401 before any store mutation.
pub enum HookResult {
    Replace(Value),
    Cancel,
}

pub type BeforeHook = Arc<dyn Fn(Value) -> HookResult + Send + Sync>;
pub type AfterHook = Arc<dyn Fn(Value) -> anyhow::Result<()> + Send + Sync>;

/// Authorization slot for one action: a fixed grant or a per-request
/// predicate. Anything but a strict `true` denies.
#[derive(Clone)]
pub enum Allow {
    Grant(bool),
    Predicate(Arc<dyn Fn() -> bool + Send + Sync>),
}

impl Allow {
    pub fn allows(&self) -> bool {
        match self {
            Allow::Grant(b) => *b,
            Allow::Predicate(f) => f(),
        }
    }

    pub fn predicate<F: Fn() -> bool + Send + Sync + 'static>(f: F) -> Self {
        Allow::Predicate(Arc::new(f))
    }
}

impl Default for Allow {
    fn default() -> Self {
        Allow::Grant(true)
    }
}

impl From<bool> for Allow {
    fn from(b: bool) -> Self {
        Allow::Grant(b)
    }
}

/// Per-collection configuration, immutable after the endpoint is built.
/// Re-attach under the same name to replace it.
#[derive(Clone, Default)]
pub struct EndpointConfig {
    /// Filter object merged into every query against the collection.
    pub collection_filters: serde_json::Map<String, Value>,
    /// Query options (field projection) merged into every collection find.
    pub collection_options: FindOptions,
    pub allow_view: Allow,
    pub allow_insert: Allow,
    pub allow_update: Allow,
    pub allow_delete: Allow,
    pub before_view: Option<BeforeHook>,
    pub after_view: Option<AfterHook>,
    pub before_insert: Option<BeforeHook>,
    pub after_insert: Option<AfterHook>,
    pub before_update: Option<BeforeHook>,
    pub after_update: Option<AfterHook>,
    pub before_delete: Option<BeforeHook>,
    pub after_delete: Option<AfterHook>,
}

impl EndpointConfig {
    fn allow(&self, action: Action) -> &Allow {
        match action {
            Action::View => &self.allow_view,
            Action::Insert => &self.allow_insert,
            Action::Update => &self.allow_update,
            Action::Delete => &self.allow_delete,
        }
    }

    fn before(&self, action: Action) -> Option<&BeforeHook> {
        match action {
            Action::View => self.before_view.as_ref(),
            Action::Insert => self.before_insert.as_ref(),
            Action::Update => self.before_update.as_ref(),
            Action::Delete => self.before_delete.as_ref(),
        }
    }

    fn after(&self, action: Action) -> Option<&AfterHook> {
        match action {
            Action::View => self.after_view.as_ref(),
            Action::Insert => self.after_insert.as_ref(),
            Action::Update => self.after_update.as_ref(),
            Action::Delete => self.after_delete.as_ref(),
        }
    }
}

/// Decoded path parameters delivered by the router.
#[derive(Debug, Clone)]
pub struct PathParams {
    pub collection: String,
    pub id: Option<String>,
}

/// Computed response: status plus an optional JSON body. All replies carry
/// `Content-Type: application/json`, including the empty DELETE success.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Reply { status: StatusCode::OK, body: Some(body) }
    }

    pub fn ok_empty() -> Self {
        Reply { status: StatusCode::OK, body: None }
    }

    pub fn error(err: RestError) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Reply { status, body: Some(Value::String(err.message().to_string())) }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self.body {
            Some(v) => (self.status, Json(v)).into_response(),
            None => (
                self.status,
                [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                String::new(),
            )
                .into_response(),
        }
    }
}

/// Per-collection request handler. Cheap to share: the registry hands out
/// `Arc<Endpoint>` snapshots, so detach never affects in-flight requests.
pub struct Endpoint {
    store: Arc<dyn Store>,
    config: EndpointConfig,
}

impl Endpoint {
    pub fn new(store: Arc<dyn Store>, config: EndpointConfig) -> Self {
        Endpoint { store, config }
    }

    /// Handle one request against this collection binding.
    pub async fn handle(&self, params: &PathParams, method: &Method, body: Value) -> Reply {
        match params.id.as_deref() {
            None => self.handle_collection(method, body).await,
            Some(id) => self.handle_document(id, method, body).await,
        }
    }

    async fn handle_collection(&self, method: &Method, body: Value) -> Reply {
        match *method {
            Method::GET => {
                if !self.config.allow(Action::View).allows() {
                    return self.deny(Action::View);
                }
                let filter = Value::Object(self.config.collection_filters.clone());
                let docs = match self.store.find(&filter, &self.config.collection_options).await {
                    Ok(d) => d,
                    Err(e) => return Reply::error(e.into()),
                };
                let mut list = Value::Array(docs);
                to_wire_id(&mut list);
                let Some(list) = self.run_before(Action::View, list) else {
                    return self.deny(Action::View);
                };
                let reply = Reply::ok(list.clone());
                self.run_after(Action::View, list);
                reply
            }
            Method::POST => {
                if !self.config.allow(Action::Insert).allows() {
                    return self.deny(Action::Insert);
                }
                let Some(mut data) = self.run_before(Action::Insert, body) else {
                    return self.deny(Action::Insert);
                };
                // No fallback id here: the store assigns one when the
                // document carries none.
                to_internal_id(&mut data, None, self.store.as_ref());
                let id = match self.store.insert(data).await {
                    Ok(id) => id,
                    Err(e) => return Reply::error(e.into()),
                };
                self.respond_with_document(Action::Insert, &id).await
            }
            _ => Reply::error(RestError::not_implemented()),
        }
    }

    async fn handle_document(&self, wire: &str, method: &Method, body: Value) -> Reply {
        match *method {
            Method::GET => {
                if ENFORCE_DOCUMENT_SCOPE_ALLOW && !self.config.allow(Action::View).allows() {
                    return self.deny(Action::View);
                }
                let id = self.store.parse_id(wire);
                let filter = self.filter_with_id(&id);
                let found = match self.store.find_one(&filter).await {
                    Ok(d) => d,
                    Err(e) => return Reply::error(e.into()),
                };
                let mut doc = found.unwrap_or(Value::Null);
                to_wire_id(&mut doc);
                let Some(doc) = self.run_before(Action::View, doc) else {
                    return self.deny(Action::View);
                };
                let reply = Reply::ok(doc.clone());
                self.run_after(Action::View, doc);
                reply
            }
            Method::POST | Method::PUT => {
                if ENFORCE_DOCUMENT_SCOPE_ALLOW && !self.config.allow(Action::Update).allows() {
                    return self.deny(Action::Update);
                }
                let Some(mut data) = self.run_before(Action::Update, body) else {
                    return self.deny(Action::Update);
                };
                let id = self.store.parse_id(wire);
                if let Some(obj) = data.as_object_mut() {
                    obj.insert("_id".to_string(), id.as_value());
                }
                let filter = self.filter_with_id(&id);
                if let Err(e) = self.store.upsert(&filter, data).await {
                    return Reply::error(e.into());
                }
                self.respond_with_document(Action::Update, &id).await
            }
            Method::DELETE => {
                if self.run_before(Action::Delete, Value::String(wire.to_string())).is_none() {
                    return self.deny(Action::Delete);
                }
                let id = self.store.parse_id(wire);
                let filter = self.filter_with_id(&id);
                if let Err(e) = self.store.remove(&filter).await {
                    return Reply::error(e.into());
                }
                let reply = Reply::ok_empty();
                self.run_after(Action::Delete, Value::String(wire.to_string()));
                reply
            }
            _ => Reply::error(RestError::not_implemented()),
        }
    }

    /// Re-fetch a freshly written document by id and answer 200 with its
    /// wire-form rendition, then fire the action's after hook.
    async fn respond_with_document(&self, action: Action, id: &DocId) -> Reply {
        let fetched = match self.store.find_one(&json!({ "_id": id.as_value() })).await {
            Ok(d) => d,
            Err(e) => return Reply::error(e.into()),
        };
        let mut result = fetched.unwrap_or(Value::Null);
        to_wire_id(&mut result);
        let reply = Reply::ok(result.clone());
        self.run_after(action, result);
        reply
    }

    /// Configured filters merged with an id match.
    fn filter_with_id(&self, id: &DocId) -> Value {
        let mut m = self.config.collection_filters.clone();
        m.insert("_id".to_string(), id.as_value());
        Value::Object(m)
    }

    fn deny(&self, action: Action) -> Reply {
        debug!(target: "ironrest::endpoint", "{} denied", action.as_str());
        Reply::error(RestError::unauthorized())
    }

    /// Run the before hook for `action`. `None` means the hook cancelled.
    fn run_before(&self, action: Action, subject: Value) -> Option<Value> {
        match self.config.before(action) {
            Some(hook) => match hook(subject) {
                HookResult::Replace(v) => Some(v),
                HookResult::Cancel => None,
            },
            None => Some(subject),
        }
    }

    /// Run the after hook for `action`. The reply is already computed when
    /// this fires; failures and panics are logged and go nowhere else.
    fn run_after(&self, action: Action, subject: Value) {
        let Some(hook) = self.config.after(action) else { return };
        match std::panic::catch_unwind(AssertUnwindSafe(|| hook(subject))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(target: "ironrest::hooks", "{} after-hook failed: {}", action.as_str(), e);
            }
            Err(panic_payload) => {
                let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() {
                    *s
                } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                    s.as_str()
                } else {
                    "panic"
                };
                error!(target: "ironrest::hooks", "{} after-hook panicked: {}", action.as_str(), msg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_grant_and_predicate() {
        assert!(Allow::default().allows());
        assert!(Allow::Grant(true).allows());
        assert!(!Allow::Grant(false).allows());
        assert!(Allow::predicate(|| true).allows());
        assert!(!Allow::predicate(|| false).allows());
        assert!(Allow::from(true).allows());
    }

    #[test]
    fn reply_error_carries_json_string_body() {
        let reply = Reply::error(RestError::unauthorized());
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.body, Some(Value::String("Unauthorized".to_string())));
    }

    #[test]
    fn delete_success_reply_has_no_body() {
        let reply = Reply::ok_empty();
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.is_none());
    }
}
