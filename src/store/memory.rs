//!
//! In-memory store backend
//! -----------------------
//! Reference `Store` implementation used by the bundled binary and the test
//! suite. Documents live in an `Arc<parking_lot::RwLock<Vec<...>>>`; filters
//! are matched by field-wise JSON equality, which is all the adapter core
//! requires (it only ever merges configured filters with an `_id` match).
//!
//! Native ids are 24 lowercase hex characters (12 random bytes), the
//! ObjectId string shape.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::store::{DocId, FindOptions, Store, StoreError, StoreResult};

#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<RwLock<Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held. Test and inventory helper.
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Generate a fresh native id: 12 random bytes, hex encoded.
    fn generate_id() -> StoreResult<String> {
        let mut bytes = [0u8; 12];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| StoreError::backend(format!("id generation failed: {}", e)))?;
        let mut id = String::with_capacity(24);
        use std::fmt::Write as _;
        for b in &bytes {
            let _ = write!(&mut id, "{:02x}", b);
        }
        Ok(id)
    }

    /// Field-wise equality match: every filter field must be present on the
    /// document with an equal JSON value.
    fn matches(filter: &Value, doc: &Value) -> bool {
        let (Some(filter), Some(doc)) = (filter.as_object(), doc.as_object()) else {
            return false;
        };
        filter.iter().all(|(k, v)| doc.get(k) == Some(v))
    }

    /// Apply a field projection, always retaining `_id`.
    fn project(doc: &Value, options: &FindOptions) -> Value {
        let Some(fields) = options.fields.as_ref() else {
            return doc.clone();
        };
        let Some(obj) = doc.as_object() else {
            return doc.clone();
        };
        let mut out = serde_json::Map::new();
        if let Some(id) = obj.get("_id") {
            out.insert("_id".to_string(), id.clone());
        }
        for f in fields {
            if let Some(v) = obj.get(f) {
                out.insert(f.clone(), v.clone());
            }
        }
        Value::Object(out)
    }

    fn id_of(doc: &Value) -> Option<DocId> {
        match doc.get("_id")? {
            Value::String(s) => Some(DocId::Plain(s.clone())),
            Value::Object(m) => m
                .get("$oid")
                .and_then(|v| v.as_str())
                .map(|s| DocId::Native(s.to_string())),
            _ => None,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find(&self, filter: &Value, options: &FindOptions) -> StoreResult<Vec<Value>> {
        let docs = self.docs.read();
        Ok(docs
            .iter()
            .filter(|d| Self::matches(filter, d))
            .map(|d| Self::project(d, options))
            .collect())
    }

    async fn find_one(&self, filter: &Value) -> StoreResult<Option<Value>> {
        let docs = self.docs.read();
        Ok(docs.iter().find(|d| Self::matches(filter, d)).cloned())
    }

    async fn insert(&self, mut doc: Value) -> StoreResult<DocId> {
        if !doc.is_object() {
            return Err(StoreError::backend("insert requires a JSON object"));
        }
        let id = match Self::id_of(&doc) {
            Some(id) => id,
            None if doc.get("_id").is_some() => {
                return Err(StoreError::backend("unsupported _id type"));
            }
            None => {
                let id = DocId::Native(Self::generate_id()?);
                doc["_id"] = id.as_value();
                id
            }
        };
        self.docs.write().push(doc);
        Ok(id)
    }

    async fn upsert(&self, filter: &Value, doc: Value) -> StoreResult<()> {
        if !doc.is_object() {
            return Err(StoreError::backend("upsert requires a JSON object"));
        }
        let mut docs = self.docs.write();
        if let Some(slot) = docs.iter_mut().find(|d| Self::matches(filter, d)) {
            *slot = doc;
        } else {
            docs.push(doc);
        }
        Ok(())
    }

    async fn remove(&self, filter: &Value) -> StoreResult<()> {
        self.docs.write().retain(|d| !Self::matches(filter, d));
        Ok(())
    }

    fn is_native_id(&self, s: &str) -> bool {
        s.len() == 24 && s.chars().all(|c| c.is_ascii_hexdigit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_native_id() {
        let store = MemoryStore::new();
        let id = store.insert(json!({"name": "a"})).await.unwrap();
        match &id {
            DocId::Native(s) => {
                assert_eq!(s.len(), 24);
                assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
            }
            DocId::Plain(_) => panic!("assigned id should be native"),
        }
        let fetched = store
            .find_one(&json!({"_id": id.as_value()}))
            .await
            .unwrap()
            .expect("inserted document is findable by its id");
        assert_eq!(fetched["name"], "a");
    }

    #[tokio::test]
    async fn insert_keeps_supplied_id() {
        let store = MemoryStore::new();
        let id = store
            .insert(json!({"_id": "plain-key", "name": "b"}))
            .await
            .unwrap();
        assert_eq!(id, DocId::Plain("plain-key".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn upsert_replaces_then_inserts() {
        let store = MemoryStore::new();
        store
            .insert(json!({"_id": "k1", "name": "old"}))
            .await
            .unwrap();
        store
            .upsert(&json!({"_id": "k1"}), json!({"_id": "k1", "name": "new"}))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
        let doc = store.find_one(&json!({"_id": "k1"})).await.unwrap().unwrap();
        assert_eq!(doc["name"], "new");

        store
            .upsert(&json!({"_id": "k2"}), json!({"_id": "k2", "name": "fresh"}))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn remove_by_filter() {
        let store = MemoryStore::new();
        store.insert(json!({"_id": "k1", "kind": "x"})).await.unwrap();
        store.insert(json!({"_id": "k2", "kind": "y"})).await.unwrap();
        store.remove(&json!({"kind": "x"})).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.find_one(&json!({"_id": "k1"})).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_applies_filters_and_projection() {
        let store = MemoryStore::new();
        store
            .insert(json!({"_id": "k1", "kind": "x", "name": "a", "secret": 1}))
            .await
            .unwrap();
        store
            .insert(json!({"_id": "k2", "kind": "y", "name": "b"}))
            .await
            .unwrap();
        let opts = FindOptions { fields: Some(vec!["name".to_string()]) };
        let rows = store.find(&json!({"kind": "x"}), &opts).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], json!({"_id": "k1", "name": "a"}));
    }

    #[test]
    fn native_id_shape() {
        let store = MemoryStore::new();
        assert!(store.is_native_id("0123456789abcdef01234567"));
        assert!(store.is_native_id("0123456789ABCDEF01234567"));
        assert!(!store.is_native_id("0123456789abcdef0123456")); // 23 chars
        assert!(!store.is_native_id("0123456789abcdef012345678")); // 25 chars
        assert!(!store.is_native_id("0123456789abcdef0123456z"));
        assert!(!store.is_native_id(""));
    }
}
