//!
//! Identifier normalization
//! ------------------------
//! Two id representations coexist: the wire id (a plain string at the HTTP
//! boundary) and the internal id (the store-facing form, `{"$oid": ...}` for
//! native ids). Every document entering the core is coerced to internal form
//! before it reaches the store; every document leaving the core is converted
//! back to wire form. Whether a string counts as a native id is the store's
//! call, never guessed here.

use serde_json::Value;

use crate::store::{DocId, Store};

/// Resolve a document's identifier to internal form.
///
/// The id is taken from the document's `_id` field when it is a string,
/// falling back to `fallback` (typically the path parameter). When neither
/// yields an id the document is left untouched and `None` is returned, which
/// lets the store assign one on insert. Otherwise the document's `_id` is
/// rewritten to the internal representation and the resolved id returned.
pub fn to_internal_id(doc: &mut Value, fallback: Option<&str>, store: &dyn Store) -> Option<DocId> {
    let wire = match doc.get("_id").and_then(|v| v.as_str()) {
        Some(s) => s.to_string(),
        None => fallback?.to_string(),
    };
    let id = store.parse_id(&wire);
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("_id".to_string(), id.as_value());
    }
    Some(id)
}

/// Convert internal ids back to wire form, in place.
///
/// Arrays are handled element-wise. A document whose `_id` carries the
/// internal native form has it replaced with the canonical string; plain
/// string ids and documents without an id pass through unchanged. Idempotent.
pub fn to_wire_id(value: &mut Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                to_wire_id(item);
            }
        }
        Value::Object(obj) => {
            let native = obj
                .get("_id")
                .and_then(|v| v.as_object())
                .and_then(|m| m.get("$oid"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            if let Some(s) = native {
                obj.insert("_id".to_string(), Value::String(s));
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    const NATIVE: &str = "0123456789abcdef01234567";

    #[test]
    fn internal_id_prefers_document_field() {
        let store = MemoryStore::new();
        let mut doc = json!({"_id": "doc-key", "name": "a"});
        let id = to_internal_id(&mut doc, Some("fallback"), &store).unwrap();
        assert_eq!(id, DocId::Plain("doc-key".to_string()));
        assert_eq!(doc["_id"], "doc-key");
    }

    #[test]
    fn internal_id_falls_back_to_path_id() {
        let store = MemoryStore::new();
        let mut doc = json!({"name": "a"});
        let id = to_internal_id(&mut doc, Some(NATIVE), &store).unwrap();
        assert_eq!(id, DocId::Native(NATIVE.to_string()));
        assert_eq!(doc["_id"], json!({"$oid": NATIVE}));
    }

    #[test]
    fn internal_id_absent_leaves_document_untouched() {
        let store = MemoryStore::new();
        let mut doc = json!({"name": "a"});
        assert!(to_internal_id(&mut doc, None, &store).is_none());
        assert_eq!(doc, json!({"name": "a"}));
    }

    #[test]
    fn wire_id_unwraps_native_form() {
        let mut doc = json!({"_id": {"$oid": NATIVE}, "name": "a"});
        to_wire_id(&mut doc);
        assert_eq!(doc, json!({"_id": NATIVE, "name": "a"}));
    }

    #[test]
    fn wire_id_recurses_into_arrays() {
        let mut list = json!([
            {"_id": {"$oid": NATIVE}},
            {"_id": "plain"},
            {"no_id": true}
        ]);
        to_wire_id(&mut list);
        assert_eq!(list, json!([{"_id": NATIVE}, {"_id": "plain"}, {"no_id": true}]));
    }

    #[test]
    fn wire_id_is_idempotent() {
        let mut once = json!({"_id": {"$oid": NATIVE}, "n": 1});
        to_wire_id(&mut once);
        let mut twice = once.clone();
        to_wire_id(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn round_trip_restores_wire_id() {
        let store = MemoryStore::new();
        for wire in [NATIVE, "plain-key"] {
            let mut doc = json!({"name": "a"});
            to_internal_id(&mut doc, Some(wire), &store).unwrap();
            to_wire_id(&mut doc);
            assert_eq!(doc["_id"], wire);
        }
    }
}
