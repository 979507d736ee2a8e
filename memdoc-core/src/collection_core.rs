// memdoc-core/src/collection_core.rs
// In-memory collection: an ordered document list plus the query executor over it

use ahash::AHashSet;
use serde::Serialize;
use serde_json::Value;

use crate::config::{EngineConfig, IdStrategy};
use crate::document::{Document, DocumentId, ID_FIELD};
use crate::error::{MemDocError, Result};
use crate::find_options::{apply_limit_skip, apply_sort, paginate, FindOptions, Page};
use crate::projection::{ProjectedDocument, Projection};
use crate::query::Query;
use crate::query_planner::QueryPlanner;
use crate::timestamp::Timestamper;
use crate::update::Update;
use crate::{log_debug, log_trace};

/// Result of `find`: counts before and after truncation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindResult {
    pub matched_count: usize,
    pub returned_count: usize,
    pub docs: Vec<ProjectedDocument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub matched_count: usize,
    /// Always equal to `matched_count`; no-op updates still count
    pub modified_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub deleted_count: usize,
}

/// A named, ordered set of documents.
///
/// Every operation parses its filter / update / projection before touching
/// the documents, so malformed input never leaves a partial change behind.
#[derive(Debug, Clone)]
pub struct Collection {
    pub name: String,
    docs: Vec<Document>,
    config: EngineConfig,
    clock: Timestamper,
    /// Highest integer `_id` seen, for sequential ids
    last_id: u64,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Collection {
            name: name.into(),
            docs: Vec::new(),
            config: EngineConfig::default(),
            clock: Timestamper::new(),
            last_id: 0,
        }
    }

    pub fn with_config(name: impl Into<String>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::configured(name, config))
    }

    /// Caller guarantees `config` is valid
    pub(crate) fn configured(name: impl Into<String>, config: EngineConfig) -> Self {
        let mut collection = Self::new(name);
        collection.config = config;
        collection
    }

    /// Rebuild a collection from stored documents without re-stamping them.
    /// Documents without `_id` get one; duplicate ids are rejected.
    pub fn from_documents(
        name: impl Into<String>,
        config: EngineConfig,
        docs: Vec<Value>,
    ) -> Result<Self> {
        let mut collection = Self::with_config(name, config)?;
        let mut seen: AHashSet<DocumentId> = AHashSet::with_capacity(docs.len());
        let mut restored = Vec::with_capacity(docs.len());

        for value in docs {
            let mut document = Document::from_value(value)?;
            let id = match document.id() {
                Some(id) => {
                    collection.note_id(&id);
                    id
                }
                None => {
                    let id = collection.next_id_from(&seen)?;
                    document.set_id(&id);
                    id
                }
            };
            if !seen.insert(id.clone()) {
                return Err(MemDocError::DuplicateId(id.to_string()));
            }
            collection.observe_stamps(&document);
            restored.push(document);
        }

        collection.docs = restored;
        Ok(collection)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Stored documents in insertion order
    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn clear(&mut self) {
        self.docs.clear();
    }

    // ========== INSERT ==========

    /// Insert one document; returns the stored copy
    pub fn insert_one(&mut self, doc: Value) -> Result<Document> {
        let document = self.prepare_insert(doc, &[])?;
        log_trace!("insert_one into '{}': _id={:?}", self.name, document.id());
        self.docs.push(document.clone());
        Ok(document)
    }

    /// Insert several documents; nothing is inserted if any of them is rejected
    pub fn insert_many(&mut self, docs: Vec<Value>) -> Result<Vec<Document>> {
        let last_id = self.last_id;
        let mut staged: Vec<Document> = Vec::with_capacity(docs.len());

        for doc in docs {
            match self.prepare_insert(doc, &staged) {
                Ok(document) => staged.push(document),
                Err(e) => {
                    self.last_id = last_id;
                    return Err(e);
                }
            }
        }

        log_debug!("insert_many into '{}': {} documents", self.name, staged.len());
        self.docs.extend(staged.iter().cloned());
        Ok(staged)
    }

    fn prepare_insert(&mut self, doc: Value, staged: &[Document]) -> Result<Document> {
        let mut document = Document::from_value(doc)?;

        let id = match document.id() {
            Some(id) => id,
            None => {
                let id = self.generate_id()?;
                document.set_id(&id);
                id
            }
        };

        if self.position_of(&id).is_some() || staged.iter().any(|d| d.id().as_ref() == Some(&id)) {
            return Err(MemDocError::DuplicateId(id.to_string()));
        }
        self.note_id(&id);

        // A caller-provided createdAt is kept
        let created_field = self.config.created_at_field.clone();
        if let Some(Value::String(created)) = document.get(&created_field) {
            self.clock.observe(created);
        }
        let stamp = self.clock.next();
        if !document.contains(&created_field) {
            document.set(created_field, Value::String(stamp.clone()));
        }
        document.set(self.config.updated_at_field.clone(), Value::String(stamp));

        Ok(document)
    }

    fn generate_id(&mut self) -> Result<DocumentId> {
        match self.config.id_strategy {
            IdStrategy::ObjectId => Ok(DocumentId::new_object_id()),
            IdStrategy::Sequential => loop {
                let id = DocumentId::new_auto(self.last_id)?;
                self.last_id += 1;
                if self.position_of(&id).is_none() {
                    break Ok(id);
                }
            },
        }
    }

    /// Id for a restored document, unique among `seen`
    fn next_id_from(&mut self, seen: &AHashSet<DocumentId>) -> Result<DocumentId> {
        loop {
            let id = self.generate_id()?;
            if !seen.contains(&id) {
                return Ok(id);
            }
        }
    }

    fn note_id(&mut self, id: &DocumentId) {
        if let DocumentId::Int(n) = id {
            // negative ids never move the counter
            if let Ok(n) = u64::try_from(*n) {
                self.last_id = self.last_id.max(n);
            }
        }
    }

    fn observe_stamps(&mut self, document: &Document) {
        for field in [&self.config.created_at_field, &self.config.updated_at_field] {
            if let Some(Value::String(stamp)) = document.get(field) {
                self.clock.observe(stamp);
            }
        }
    }

    fn position_of(&self, id: &DocumentId) -> Option<usize> {
        self.docs.iter().position(|d| d.id().as_ref() == Some(id))
    }

    // ========== READ ==========

    /// filter → sort → skip/limit → project
    pub fn find(
        &self,
        filter: &Value,
        projection: &Value,
        options: &FindOptions,
    ) -> Result<FindResult> {
        let query = Query::from_json(filter)?;
        let projection = Projection::from_json(projection, self.config.projection_policy)?;

        let mut matched = self.matching(&query);
        apply_sort(&mut matched, options, &self.config);
        let matched_count = matched.len();

        let limit = options.effective_limit(self.config.default_limit);
        let docs: Vec<ProjectedDocument> = apply_limit_skip(matched, limit, options.skip)
            .into_iter()
            .map(|doc| projection.apply(doc))
            .collect();

        log_debug!(
            "find on '{}': matched {}, returned {}",
            self.name,
            matched_count,
            docs.len()
        );

        Ok(FindResult {
            matched_count,
            returned_count: docs.len(),
            docs,
        })
    }

    /// First match in insertion order
    pub fn find_one(&self, filter: &Value) -> Result<Option<Document>> {
        let query = Query::from_json(filter)?;
        Ok(self.docs.iter().find(|d| query.matches(d)).cloned())
    }

    pub fn find_by_id(&self, id: &DocumentId) -> Option<&Document> {
        self.position_of(id).map(|i| &self.docs[i])
    }

    pub fn count_documents(&self, filter: &Value) -> Result<usize> {
        let query = Query::from_json(filter)?;
        Ok(self.docs.iter().filter(|d| query.matches(d)).count())
    }

    /// Distinct values of `field` among matching documents; array values are flattened
    pub fn distinct(&self, field: &str, filter: &Value) -> Result<Vec<Value>> {
        let query = Query::from_json(filter)?;

        let mut seen_values: AHashSet<String> = AHashSet::new();
        let mut distinct_values = Vec::new();

        for doc in self.docs.iter().filter(|d| query.matches(d)) {
            let values: Vec<&Value> = match doc.get_path(field) {
                Some(Value::Array(items)) => items.iter().collect(),
                Some(value) => vec![value],
                None => continue,
            };

            for value in values {
                // JSON text as the uniqueness key
                if seen_values.insert(serde_json::to_string(value)?) {
                    distinct_values.push(value.clone());
                }
            }
        }

        Ok(distinct_values)
    }

    /// Sorted matches cut into pages; `limit`/`skip` in `options` are ignored
    pub fn paginate(
        &self,
        filter: &Value,
        options: &FindOptions,
        page: usize,
        page_size: usize,
    ) -> Result<Page<Document>> {
        let query = Query::from_json(filter)?;
        let mut matched = self.matching(&query);
        apply_sort(&mut matched, options, &self.config);

        Ok(paginate(matched, page, page_size).map(Document::clone))
    }

    /// Query shape, index advice and scan counts for a filter
    pub fn explain(&self, filter: &Value, options: &FindOptions) -> Result<Value> {
        let query = Query::from_json(filter)?;
        let matched = self.docs.iter().filter(|d| query.matches(d)).count();
        Ok(QueryPlanner::explain_query(filter, options, self.docs.len(), matched))
    }

    fn matching(&self, query: &Query) -> Vec<&Document> {
        self.docs.iter().filter(|d| query.matches(d)).collect()
    }

    // ========== UPDATE ==========

    pub fn update_many(&mut self, filter: &Value, update: &Value) -> Result<UpdateResult> {
        let query = Query::from_json(filter)?;
        let update = Update::from_json(update, self.config.strict_updates)?;

        let targets: Vec<usize> = self
            .docs
            .iter()
            .enumerate()
            .filter(|(_, d)| query.matches(d))
            .map(|(i, _)| i)
            .collect();

        self.apply_update_at(&targets, &update);
        log_debug!("update_many on '{}': {} documents", self.name, targets.len());

        Ok(UpdateResult {
            matched_count: targets.len(),
            modified_count: targets.len(),
        })
    }

    /// Update the first match in insertion order
    pub fn update_one(&mut self, filter: &Value, update: &Value) -> Result<UpdateResult> {
        let query = Query::from_json(filter)?;
        let update = Update::from_json(update, self.config.strict_updates)?;

        let targets: Vec<usize> = self
            .docs
            .iter()
            .position(|d| query.matches(d))
            .into_iter()
            .collect();
        self.apply_update_at(&targets, &update);

        Ok(UpdateResult {
            matched_count: targets.len(),
            modified_count: targets.len(),
        })
    }

    /// One timestamp per call, later than every targeted document's previous stamp
    fn apply_update_at(&mut self, positions: &[usize], update: &Update) {
        if positions.is_empty() {
            return;
        }

        let updated_field = self.config.updated_at_field.clone();
        for &i in positions {
            if let Some(Value::String(previous)) = self.docs[i].get(&updated_field) {
                self.clock.observe(previous);
            }
        }
        let stamp = self.clock.next();

        for &i in positions {
            let document = &mut self.docs[i];
            update.apply(document);
            document.set(updated_field.clone(), Value::String(stamp.clone()));
        }
    }

    /// Replace the document with `id`. `_id` cannot change; a missing
    /// `createdAt` is carried over from the old document.
    pub fn replace_one(&mut self, id: &DocumentId, doc: Value) -> Result<Document> {
        let mut replacement = Document::from_value(doc)?;
        let pos = self
            .position_of(id)
            .ok_or_else(|| MemDocError::DocumentNotFound(id.to_string()))?;

        match replacement.id() {
            Some(new_id) if &new_id != id => {
                return Err(MemDocError::InvalidDocument(format!(
                    "replacement {} '{}' does not match '{}'",
                    ID_FIELD, new_id, id
                )))
            }
            Some(_) => {}
            None => replacement.set_id(id),
        }

        if let Some(Value::String(previous)) = self.docs[pos].get(&self.config.updated_at_field) {
            self.clock.observe(previous);
        }
        let stamp = self.clock.next();

        let created_field = self.config.created_at_field.clone();
        if !replacement.contains(&created_field) {
            let created = self.docs[pos]
                .get(&created_field)
                .cloned()
                .unwrap_or_else(|| Value::String(stamp.clone()));
            replacement.set(created_field, created);
        }
        replacement.set(self.config.updated_at_field.clone(), Value::String(stamp));

        self.docs[pos] = replacement.clone();
        Ok(replacement)
    }

    /// Copy the document with `id` under a fresh `_id` and fresh timestamps
    pub fn duplicate_one(&mut self, id: &DocumentId) -> Result<Document> {
        let mut copy = self
            .find_by_id(id)
            .cloned()
            .ok_or_else(|| MemDocError::DocumentNotFound(id.to_string()))?;

        let new_id = self.generate_id()?;
        copy.set_id(&new_id);

        let stamp = self.clock.next();
        copy.set(self.config.created_at_field.clone(), Value::String(stamp.clone()));
        copy.set(self.config.updated_at_field.clone(), Value::String(stamp));

        self.docs.push(copy.clone());
        Ok(copy)
    }

    // ========== DELETE ==========

    pub fn delete_many(&mut self, filter: &Value) -> Result<DeleteResult> {
        let query = Query::from_json(filter)?;

        let before = self.docs.len();
        self.docs.retain(|d| !query.matches(d));
        let deleted_count = before - self.docs.len();

        log_debug!("delete_many on '{}': {} documents", self.name, deleted_count);
        Ok(DeleteResult { deleted_count })
    }

    /// Delete the first match in insertion order
    pub fn delete_one(&mut self, filter: &Value) -> Result<DeleteResult> {
        let query = Query::from_json(filter)?;

        let deleted_count = match self.docs.iter().position(|d| query.matches(d)) {
            Some(i) => {
                self.docs.remove(i);
                1
            }
            None => 0,
        };

        Ok(DeleteResult { deleted_count })
    }
}
