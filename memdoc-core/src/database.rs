// memdoc-core/src/database.rs
// Named set of collections, shareable across threads

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::collection_core::Collection;
use crate::config::EngineConfig;
use crate::error::{MemDocError, Result};
use crate::{log_debug, log_info};

/// One writer or many readers per collection
pub type SharedCollection = Arc<RwLock<Collection>>;

/// Export format: `{"name": "...", "collections": {"tasks": [ ...docs ]}}`
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    name: String,
    collections: IndexMap<String, Vec<Value>>,
}

/// In-memory database - collections are created on first use
pub struct DatabaseCore {
    name: RwLock<String>,
    config: EngineConfig,
    collections: DashMap<String, SharedCollection>,
}

impl DatabaseCore {
    pub fn new(name: impl Into<String>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(DatabaseCore {
            name: RwLock::new(name.into()),
            config,
            collections: DashMap::new(),
        })
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Switch the database name (`use <db>`); collections are kept
    pub fn rename(&self, name: impl Into<String>) {
        *self.name.write() = name.into();
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get collection (creates if doesn't exist)
    pub fn collection(&self, name: &str) -> SharedCollection {
        let entry = self.collections.entry(name.to_string()).or_insert_with(|| {
            log_debug!("creating collection '{}'", name);
            // config was validated in new()
            Arc::new(RwLock::new(Collection::configured(name, self.config.clone())))
        });
        Arc::clone(entry.value())
    }

    /// Existing collection only
    pub fn get_collection(&self, name: &str) -> Result<SharedCollection> {
        self.collections
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| MemDocError::CollectionNotFound(name.to_string()))
    }

    /// List all collection names, sorted
    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Drop collection
    pub fn drop_collection(&self, name: &str) -> Result<()> {
        self.collections
            .remove(name)
            .map(|_| log_info!("dropped collection '{}'", name))
            .ok_or_else(|| MemDocError::CollectionNotFound(name.to_string()))
    }

    /// Database statistics as JSON
    pub fn stats(&self) -> Value {
        let names = self.list_collection_names();
        let mut per_collection = serde_json::Map::new();
        let mut total = 0;

        for name in &names {
            if let Some(entry) = self.collections.get(name) {
                let count = entry.value().read().len();
                total += count;
                per_collection.insert(name.clone(), json!(count));
            }
        }

        json!({
            "name": self.name(),
            "collectionCount": names.len(),
            "documentCount": total,
            "collections": per_collection,
        })
    }

    /// Every collection as one JSON string, for the host to persist
    pub fn export_json(&self) -> Result<String> {
        let mut collections = IndexMap::new();
        for name in self.list_collection_names() {
            if let Some(entry) = self.collections.get(&name) {
                let docs: Vec<Value> = entry
                    .value()
                    .read()
                    .documents()
                    .iter()
                    .map(|d| d.clone().into_value())
                    .collect();
                collections.insert(name, docs);
            }
        }

        let snapshot = Snapshot {
            name: self.name(),
            collections,
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Replace every collection with the contents of an export.
    ///
    /// The whole snapshot is validated first; on error the database is unchanged.
    /// Handles obtained before the import keep pointing at the old collections.
    pub fn import_json(&self, json: &str) -> Result<()> {
        let snapshot: Snapshot = serde_json::from_str(json)?;

        let restored = snapshot
            .collections
            .into_iter()
            .map(|(name, docs)| {
                let collection =
                    Collection::from_documents(name.clone(), self.config.clone(), docs)?;
                Ok((name, collection))
            })
            .collect::<Result<Vec<_>>>()?;

        self.collections.clear();
        for (name, collection) in restored {
            self.collections.insert(name, Arc::new(RwLock::new(collection)));
        }
        self.rename(snapshot.name);

        log_info!(
            "imported {} collections into '{}'",
            self.collections.len(),
            self.name()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::find_options::FindOptions;
    use crate::config::IdStrategy;
    use std::thread;

    fn db() -> DatabaseCore {
        DatabaseCore::new("campus", EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_collection_get_or_create() {
        let db = db();
        let people = db.collection("people");
        people.write().insert_one(json!({"name": "Akhil"})).unwrap();

        // same underlying collection
        assert_eq!(db.collection("people").read().len(), 1);
        assert_eq!(db.list_collection_names(), vec!["people"]);
    }

    #[test]
    fn test_collections_use_database_config() {
        let config = EngineConfig::default().with_id_strategy(IdStrategy::Sequential);
        let db = DatabaseCore::new("d", config).unwrap();
        let stored = db.collection("c").write().insert_one(json!({})).unwrap();
        assert_eq!(stored.get("_id"), Some(&json!(1)));
    }

    #[test]
    fn test_get_and_drop_missing() {
        let db = db();
        assert!(matches!(db.get_collection("nope"), Err(MemDocError::CollectionNotFound(_))));
        assert!(matches!(db.drop_collection("nope"), Err(MemDocError::CollectionNotFound(_))));

        db.collection("items");
        assert!(db.get_collection("items").is_ok());
        db.drop_collection("items").unwrap();
        assert!(db.list_collection_names().is_empty());
    }

    #[test]
    fn test_names_are_sorted() {
        let db = db();
        for name in ["items", "claims", "people"] {
            db.collection(name);
        }
        assert_eq!(db.list_collection_names(), vec!["claims", "items", "people"]);
    }

    #[test]
    fn test_rename() {
        let db = db();
        db.rename("lostfound");
        assert_eq!(db.name(), "lostfound");
    }

    #[test]
    fn test_stats() {
        let db = db();
        db.collection("a").write().insert_many(vec![json!({}), json!({})]).unwrap();
        db.collection("b").write().insert_one(json!({})).unwrap();

        let stats = db.stats();
        assert_eq!(stats["collectionCount"], 2);
        assert_eq!(stats["documentCount"], 3);
        assert_eq!(stats["collections"]["a"], 2);
    }

    #[test]
    fn test_export_import_round_trip() {
        let source = db();
        source
            .collection("items")
            .write()
            .insert_many(vec![
                json!({"_id": "i_1", "title": "Wallet"}),
                json!({"_id": "i_2", "title": "Keys"}),
            ])
            .unwrap();
        source.collection("people").write().insert_one(json!({"_id": "p_1"})).unwrap();

        let exported = source.export_json().unwrap();

        let target = DatabaseCore::new("other", EngineConfig::default()).unwrap();
        target.collection("stale");
        target.import_json(&exported).unwrap();

        assert_eq!(target.name(), "campus");
        assert_eq!(target.list_collection_names(), vec!["items", "people"]);
        let items = target.get_collection("items").unwrap();
        assert_eq!(items.read().documents(), source.collection("items").read().documents());
    }

    #[test]
    fn test_import_failure_leaves_database_unchanged() {
        let db = db();
        db.collection("keep").write().insert_one(json!({"_id": 1})).unwrap();

        let bad = r#"{"name": "x", "collections": {"a": [{"_id": 1}, {"_id": 1}]}}"#;
        assert!(matches!(db.import_json(bad), Err(MemDocError::DuplicateId(_))));
        assert!(db.import_json("not json").is_err());

        assert_eq!(db.name(), "campus");
        assert_eq!(db.list_collection_names(), vec!["keep"]);
    }

    #[test]
    fn test_concurrent_writers_on_shared_collection() {
        let db = db();
        let tasks = db.collection("tasks");

        thread::scope(|scope| {
            for worker in 0..4 {
                let tasks = Arc::clone(&tasks);
                scope.spawn(move || {
                    for n in 0..25 {
                        tasks.write().insert_one(json!({"worker": worker, "n": n})).unwrap();
                    }
                });
            }
        });

        let guard = tasks.read();
        assert_eq!(guard.len(), 100);
        let result = guard
            .find(&json!({"worker": 2}), &Value::Null, &FindOptions::new().with_limit(1000))
            .unwrap();
        assert_eq!(result.matched_count, 25);
    }
}
