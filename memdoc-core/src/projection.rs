// src/projection.rs
// Field projection: include / exclude lists applied to result documents

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::config::ProjectionPolicy;
use crate::document::{Document, ID_FIELD};
use crate::error::{MemDocError, Result};
use crate::path::get_path;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    /// Every field
    #[default]
    All,
    /// Only these paths, in projection order (dotted paths allowed)
    Include(Vec<String>),
    /// Every top-level key except these
    Exclude(Vec<String>),
}

impl Projection {
    /// Parse `{field: 1 | 0 | true | false}`. `null` and `{}` mean "all fields".
    pub fn from_json(json: &Value, policy: ProjectionPolicy) -> Result<Self> {
        let spec = match json {
            Value::Null => return Ok(Projection::All),
            Value::Object(spec) => spec,
            other => {
                return Err(MemDocError::InvalidProjection(format!(
                    "projection must be an object, got {}",
                    other
                )))
            }
        };

        let mut include = Vec::new();
        let mut exclude = Vec::new();

        for (field, flag) in spec {
            if is_included(field, flag)? {
                include.push(field.clone());
            } else {
                exclude.push(field.clone());
            }
        }

        if include.is_empty() {
            return Ok(if exclude.is_empty() {
                Projection::All
            } else {
                Projection::Exclude(exclude)
            });
        }

        // Mixed include/exclude
        if policy == ProjectionPolicy::Reject {
            if let Some(field) = exclude.iter().find(|f| f.as_str() != ID_FIELD) {
                return Err(MemDocError::InvalidProjection(format!(
                    "cannot mix inclusion and exclusion (excluded '{}')",
                    field
                )));
            }
        }

        Ok(Projection::Include(include))
    }

    pub fn apply(&self, document: &Document) -> ProjectedDocument {
        project_fields(self, document.fields())
    }
}

fn is_included(field: &str, flag: &Value) -> Result<bool> {
    match flag {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_f64() == Some(1.0) => Ok(true),
        Value::Number(n) if n.as_f64() == Some(0.0) => Ok(false),
        other => Err(MemDocError::InvalidProjection(format!(
            "'{}': expected 0, 1, true or false, got {}",
            field, other
        ))),
    }
}

fn project_fields(projection: &Projection, fields: &Map<String, Value>) -> ProjectedDocument {
    let entries = match projection {
        Projection::All => fields
            .iter()
            .map(|(k, v)| (k.clone(), Some(v.clone())))
            .collect(),

        // Missing paths stay as explicit absent entries
        Projection::Include(paths) => paths
            .iter()
            .map(|path| (path.clone(), get_path(fields, path).cloned()))
            .collect(),

        Projection::Exclude(keys) => fields
            .iter()
            .filter(|(k, _)| !keys.iter().any(|key| key == *k))
            .map(|(k, v)| (k.clone(), Some(v.clone())))
            .collect(),
    };

    ProjectedDocument { entries }
}

/// Projection result. `None` marks an included path the document does not have;
/// such entries are left out when serialized.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectedDocument {
    entries: IndexMap<String, Option<Value>>,
}

impl ProjectedDocument {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).and_then(Option::as_ref)
    }

    /// Key present in the result, with or without a value
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_absent(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(None))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object without the absent entries
    pub fn to_value(&self) -> Value {
        let fields: Map<String, Value> = self
            .entries
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
            .collect();
        Value::Object(fields)
    }
}

impl Serialize for ProjectedDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let present = self.entries.values().filter(|v| v.is_some()).count();
        let mut map = serializer.serialize_map(Some(present))?;
        for (key, value) in &self.entries {
            if let Some(value) = value {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

impl From<ProjectedDocument> for Value {
    fn from(doc: ProjectedDocument) -> Self {
        doc.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task() -> Document {
        Document::from_value(json!({
            "_id": "t1",
            "title": "Setup MongoDB",
            "status": "done",
            "hours": 0.5,
            "meta": {"owner": "Akhi"}
        }))
        .unwrap()
    }

    fn parse(json: Value) -> Projection {
        Projection::from_json(&json, ProjectionPolicy::PreferInclude).unwrap()
    }

    #[test]
    fn test_empty_projection_returns_everything() {
        assert_eq!(parse(json!({})), Projection::All);
        assert_eq!(parse(Value::Null), Projection::All);

        let projected = parse(json!({})).apply(&task());
        assert_eq!(projected.to_value(), task().into_value());
    }

    #[test]
    fn test_include_mode_without_id() {
        let projected = parse(json!({"title": 1, "status": true})).apply(&task());

        assert_eq!(projected.to_value(), json!({"title": "Setup MongoDB", "status": "done"}));
        assert!(!projected.contains_key("_id"));
    }

    #[test]
    fn test_include_keeps_projection_order() {
        let projected = parse(json!({"status": 1, "_id": 1, "title": 1})).apply(&task());
        let keys: Vec<&str> = projected.keys().collect();
        assert_eq!(keys, vec!["status", "_id", "title"]);
    }

    #[test]
    fn test_include_dotted_path_uses_literal_key() {
        let projected = parse(json!({"meta.owner": 1})).apply(&task());
        assert_eq!(projected.to_value(), json!({"meta.owner": "Akhi"}));
    }

    #[test]
    fn test_include_missing_field_is_absent() {
        let projected = parse(json!({"title": 1, "reviewer": 1})).apply(&task());

        assert!(projected.contains_key("reviewer"));
        assert!(projected.is_absent("reviewer"));
        assert_eq!(projected.get("reviewer"), None);
        assert_eq!(
            serde_json::to_string(&projected).unwrap(),
            r#"{"title":"Setup MongoDB"}"#
        );
    }

    #[test]
    fn test_exclude_mode() {
        let projected = parse(json!({"hours": 0, "meta": false})).apply(&task());
        assert_eq!(
            projected.to_value(),
            json!({"_id": "t1", "title": "Setup MongoDB", "status": "done"})
        );
    }

    #[test]
    fn test_exclude_is_top_level_only() {
        let projected = parse(json!({"meta.owner": 0})).apply(&task());
        assert_eq!(projected.get("meta"), Some(&json!({"owner": "Akhi"})));
    }

    #[test]
    fn test_mixed_prefers_inclusion() {
        let projected = parse(json!({"title": 1, "hours": 0})).apply(&task());
        assert_eq!(projected.to_value(), json!({"title": "Setup MongoDB"}));
    }

    #[test]
    fn test_mixed_rejected_by_policy() {
        let err = Projection::from_json(&json!({"title": 1, "hours": 0}), ProjectionPolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, MemDocError::InvalidProjection(_)));

        // _id exclusion alongside inclusion is always fine
        let ok = Projection::from_json(&json!({"title": 1, "_id": 0}), ProjectionPolicy::Reject);
        assert_eq!(ok.unwrap(), Projection::Include(vec!["title".into()]));
    }

    #[test]
    fn test_invalid_flags() {
        for bad in [json!({"title": 2}), json!({"title": "yes"}), json!({"title": null})] {
            assert!(matches!(
                Projection::from_json(&bad, ProjectionPolicy::PreferInclude),
                Err(MemDocError::InvalidProjection(_))
            ));
        }
        assert!(Projection::from_json(&json!(["title"]), ProjectionPolicy::PreferInclude).is_err());
    }

    #[test]
    fn test_float_flags() {
        assert_eq!(parse(json!({"title": 1.0})), Projection::Include(vec!["title".into()]));
        assert_eq!(parse(json!({"title": 0.0})), Projection::Exclude(vec!["title".into()]));
    }

    #[test]
    fn test_projection_does_not_touch_source() {
        let source = task();
        let _ = parse(json!({"hours": 0})).apply(&source);
        assert_eq!(source, task());
    }
}
