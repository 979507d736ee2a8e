// src/document.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::error::{MemDocError, Result};
use crate::path;

pub const ID_FIELD: &str = "_id";

/// Mongo-style document: an ordered field map that carries `_id` once stored
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Value>,
}

/// Document ID types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum DocumentId {
    Int(i64),
    String(String),
}

impl DocumentId {
    /// Next auto-increment ID; fails once `i64::MAX` has been handed out
    pub fn new_auto(last_id: u64) -> Result<Self> {
        last_id
            .checked_add(1)
            .and_then(|next| i64::try_from(next).ok())
            .map(DocumentId::Int)
            .ok_or_else(|| MemDocError::IdSpaceExhausted(last_id.to_string()))
    }

    /// New ObjectId-like ID (UUID v4)
    pub fn new_object_id() -> Self {
        DocumentId::String(Uuid::new_v4().to_string())
    }

    /// Read an `_id` value; only strings and integers are valid IDs
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(DocumentId::String(s.clone())),
            Value::Number(n) => n.as_i64().map(DocumentId::Int),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            DocumentId::Int(n) => Value::from(*n),
            DocumentId::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Int(n) => write!(f, "{}", n),
            DocumentId::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for DocumentId {
    fn from(n: i64) -> Self {
        DocumentId::Int(n)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        DocumentId::String(s.to_string())
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(fields: Map<String, Value>) -> Result<Self> {
        if let Some(id) = fields.get(ID_FIELD) {
            if DocumentId::from_value(id).is_none() {
                return Err(MemDocError::InvalidDocument(format!(
                    "_id must be a string or an integer, got {}",
                    id
                )));
            }
        }
        Ok(Document { fields })
    }

    /// Document from a JSON value; only objects are documents
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Self::from_map(fields),
            other => Err(MemDocError::InvalidDocument(format!(
                "expected an object, got {}",
                crate::value::type_name(&other)
            ))),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.fields)?)
    }

    pub fn id(&self) -> Option<DocumentId> {
        self.fields.get(ID_FIELD).and_then(DocumentId::from_value)
    }

    /// Set `_id`; a new `_id` goes first in field order
    pub(crate) fn set_id(&mut self, id: &DocumentId) {
        if let Some(slot) = self.fields.get_mut(ID_FIELD) {
            *slot = id.to_value();
            return;
        }

        let mut fields = Map::with_capacity(self.fields.len() + 1);
        fields.insert(ID_FIELD.to_string(), id.to_value());
        fields.extend(std::mem::take(&mut self.fields));
        self.fields = fields;
    }

    /// Top-level field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Dotted-path field
    pub fn get_path(&self, field_path: &str) -> Option<&Value> {
        path::get_path(&self.fields, field_path)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

impl TryFrom<Value> for Document {
    type Error = MemDocError;

    fn try_from(value: Value) -> Result<Self> {
        Document::from_value(value)
    }
}
