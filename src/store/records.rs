//! ResourceStore - concurrent per-kind record storage
//!
//! One map per registered resource kind ("note", "task"), records keyed and
//! ordered by their id. The store knows nothing about events; emission is the
//! calling handler's job after its own success path.

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde_json::Value;

use crate::bus::SnapshotProvider;

/// Thread-safe storage for current resource records
#[derive(Debug, Default)]
pub struct ResourceStore {
    /// kind → (record id → record), inner map ordered by id
    records: DashMap<String, BTreeMap<String, Value>>,
}

impl ResourceStore {
    /// Create a store with the given resource kinds registered.
    ///
    /// Registration fixes the snapshot shape: every kind appears in full
    /// state even while empty.
    pub fn new(kinds: &[&str]) -> Self {
        let store = Self::default();
        for kind in kinds {
            store.records.insert(kind.to_string(), BTreeMap::new());
        }
        store
    }

    /// Insert or replace a record. Returns the previous record on update.
    pub fn put(&self, kind: &str, id: impl Into<String>, record: Value) -> Option<Value> {
        self.records
            .entry(kind.to_string())
            .or_default()
            .insert(id.into(), record)
    }

    /// Get a record by id
    pub fn get(&self, kind: &str, id: &str) -> Option<Value> {
        self.records.get(kind)?.get(id).cloned()
    }

    /// Remove a record, returning it if present
    pub fn remove(&self, kind: &str, id: &str) -> Option<Value> {
        self.records.get_mut(kind)?.remove(id)
    }

    /// All records of one kind, ordered by record id
    pub fn list(&self, kind: &str) -> Vec<Value> {
        self.records
            .get(kind)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of records of one kind
    pub fn len(&self, kind: &str) -> usize {
        self.records.get(kind).map(|m| m.len()).unwrap_or(0)
    }

    /// True when no kind holds any record
    pub fn is_empty(&self) -> bool {
        self.records.iter().all(|m| m.is_empty())
    }
}

impl SnapshotProvider for ResourceStore {
    fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.records.iter().map(|e| e.key().clone()).collect();
        kinds.sort();
        kinds
    }

    fn list_all(&self, kind: &str) -> Vec<Value> {
        self.list(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn put_and_get_record() {
        let store = ResourceStore::new(&["note"]);
        store.put("note", "n1", json!({"id": "n1", "title": "Groceries"}));

        let record = store.get("note", "n1").unwrap();
        assert_eq!(record["title"], "Groceries");
    }

    #[test]
    fn put_returns_previous_on_update() {
        let store = ResourceStore::new(&["note"]);
        assert!(store.put("note", "n1", json!({"v": 1})).is_none());

        let previous = store.put("note", "n1", json!({"v": 2})).unwrap();
        assert_eq!(previous["v"], 1);
        assert_eq!(store.get("note", "n1").unwrap()["v"], 2);
    }

    #[test]
    fn remove_returns_the_record() {
        let store = ResourceStore::new(&["task"]);
        store.put("task", "t1", json!({"id": "t1"}));

        let removed = store.remove("task", "t1").unwrap();
        assert_eq!(removed["id"], "t1");
        assert!(store.get("task", "t1").is_none());
        assert!(store.remove("task", "t1").is_none());
    }

    #[test]
    fn list_is_ordered_by_record_id() {
        let store = ResourceStore::new(&["note"]);
        store.put("note", "b", json!({"id": "b"}));
        store.put("note", "a", json!({"id": "a"}));
        store.put("note", "c", json!({"id": "c"}));

        let ids: Vec<String> = store
            .list("note")
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn registered_kinds_appear_even_when_empty() {
        let store = ResourceStore::new(&["note", "task"]);
        assert_eq!(store.kinds(), vec!["note".to_string(), "task".to_string()]);
        assert!(store.list_all("note").is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_kind_lists_nothing() {
        let store = ResourceStore::new(&["note"]);
        assert!(store.list("comment").is_empty());
        assert_eq!(store.len("comment"), 0);
    }

    #[test]
    fn concurrent_puts_all_stored() {
        use std::thread;

        let store = Arc::new(ResourceStore::new(&["note"]));

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.put("note", format!("n{i:03}"), json!({"index": i}));
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len("note"), 50);
    }
}
