//!
//! ironrest store abstraction
//! --------------------------
//! The adapter core never talks to a concrete database. Each attached
//! collection is backed by a `Store`: an async CRUD surface plus an id
//! capability that lets the backend declare which wire strings are native
//! identifiers. Filters and documents are plain JSON objects; the core makes
//! no assumptions beyond the distinguished `_id` field.
//!
//! Calls within a single request are strictly sequential: the endpoint
//! issues one store call, awaits its completion, and only then issues the
//! next. There is no retry or timeout in this layer; a hung backend hangs
//! the corresponding response.

use async_trait::async_trait;
use serde_json::{json, Value};

pub mod memory;

/// Backend failure from a store operation. The message travels to the client
/// verbatim inside a 500 response.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend<S: Into<String>>(msg: S) -> Self { StoreError::Backend(msg.into()) }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-facing identifier. `Native` is only ever produced by
/// [`Store::parse_id`] after [`Store::is_native_id`] accepted the string;
/// anything else stays a `Plain` string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocId {
    Native(String),
    Plain(String),
}

impl DocId {
    /// The string form used at the HTTP boundary.
    pub fn wire(&self) -> &str {
        match self {
            DocId::Native(s) | DocId::Plain(s) => s.as_str(),
        }
    }

    /// The JSON value stored in a document's `_id` field. Native ids use the
    /// extended `{"$oid": ...}` form so they survive JSON round trips
    /// without being mistaken for plain string keys.
    pub fn as_value(&self) -> Value {
        match self {
            DocId::Native(s) => json!({ "$oid": s }),
            DocId::Plain(s) => Value::String(s.clone()),
        }
    }
}

/// Query options merged into every collection-scope find.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Field projection: when set, results carry only these fields (plus
    /// `_id`, which is always kept).
    pub fields: Option<Vec<String>>,
}

/// Abstract persistent collection consumed by an endpoint.
#[async_trait]
pub trait Store: Send + Sync {
    /// All documents matching `filter`, shaped by `options`.
    async fn find(&self, filter: &Value, options: &FindOptions) -> StoreResult<Vec<Value>>;

    /// First document matching `filter`, if any.
    async fn find_one(&self, filter: &Value) -> StoreResult<Option<Value>>;

    /// Insert `doc`, assigning a native id when it carries none. Returns the
    /// id under which the document was stored.
    async fn insert(&self, doc: Value) -> StoreResult<DocId>;

    /// Replace the first document matching `filter` with `doc`, inserting
    /// `doc` when nothing matches.
    async fn upsert(&self, filter: &Value, doc: Value) -> StoreResult<()>;

    /// Remove every document matching `filter`.
    async fn remove(&self, filter: &Value) -> StoreResult<()>;

    /// Whether `s` has the backend's native id shape. The core delegates
    /// this check instead of guessing the persistence-layer encoding.
    fn is_native_id(&self, s: &str) -> bool;

    /// Parse a wire string into the store-facing id representation.
    fn parse_id(&self, s: &str) -> DocId {
        if self.is_native_id(s) {
            DocId::Native(s.to_string())
        } else {
            DocId::Plain(s.to_string())
        }
    }
}
