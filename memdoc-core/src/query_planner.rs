// src/query_planner.rs
// Query shape analysis and index advice.
//
// The engine always scans; the planner only describes the query and suggests
// the indexes a persistent store would want for it.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

use crate::find_options::FindOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub key: String,
    pub dir: i64,
}

/// Fields of a filter grouped by how they are constrained
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryShape {
    /// Bare values, `$eq`, `$in`
    pub equality: Vec<String>,
    /// `$gt`, `$gte`, `$lt`, `$lte`
    pub range: Vec<String>,
    pub regex: Vec<String>,
    /// `$all`, `$size`, `$elemMatch`
    pub array: Vec<String>,
    /// `$ne`, `$nin`, `$exists`, `$not` and unknown operators
    pub other: Vec<String>,
    /// `$or` / `$nor` combinators present at the top level
    pub logical: Vec<String>,
    /// `$text` search term
    pub text: Option<String>,
    pub sort: Option<SortSpec>,
}

impl QueryShape {
    pub fn is_empty(&self) -> bool {
        self.equality.is_empty()
            && self.range.is_empty()
            && self.regex.is_empty()
            && self.array.is_empty()
            && self.other.is_empty()
            && self.logical.is_empty()
            && self.text.is_none()
            && self.sort.is_none()
    }
}

/// Suggested index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRecommendation {
    /// Compound (or single-field) key: `(field, direction)`
    Compound(Vec<(String, i64)>),
    /// Text index over every string field
    Text,
}

impl fmt::Display for IndexRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexRecommendation::Text => f.write_str("TEXT($**)"),
            IndexRecommendation::Compound(keys) => {
                let parts: Vec<String> = keys
                    .iter()
                    .map(|(field, dir)| format!("{}: {}", field, dir))
                    .collect();
                write!(f, "{{ {} }}", parts.join(", "))
            }
        }
    }
}

/// Query planner - describes queries and recommends indexes
pub struct QueryPlanner;

impl QueryPlanner {
    /// Classify the fields of a filter and record the sort
    pub fn analyze(filter: &Value, options: &FindOptions) -> QueryShape {
        let mut shape = QueryShape::default();

        if let Value::Object(map) = filter {
            Self::collect(map, &mut shape);
        }

        shape.sort = options.sort_key.as_ref().map(|key| SortSpec {
            key: key.clone(),
            dir: if options.is_ascending() { 1 } else { -1 },
        });

        shape
    }

    fn collect(filter: &Map<String, Value>, shape: &mut QueryShape) {
        for (key, condition) in filter {
            match key.as_str() {
                // AND branches constrain the same documents; flatten them
                "$and" => {
                    for branch in condition.as_array().into_iter().flatten() {
                        if let Value::Object(branch) = branch {
                            Self::collect(branch, shape);
                        }
                    }
                }
                "$or" | "$nor" => push_unique(&mut shape.logical, key),
                "$text" => {
                    shape.text = condition
                        .get("$search")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                }
                op if op.starts_with('$') => push_unique(&mut shape.other, op),
                field => Self::classify_field(field, condition, shape),
            }
        }
    }

    fn classify_field(field: &str, condition: &Value, shape: &mut QueryShape) {
        let operators = match condition {
            Value::Object(ops) if ops.is_empty() || ops.keys().any(|k| k.starts_with('$')) => ops,
            _ => {
                push_unique(&mut shape.equality, field);
                return;
            }
        };

        for op in operators.keys() {
            let bucket = match op.as_str() {
                "$eq" | "$in" => &mut shape.equality,
                "$gt" | "$gte" | "$lt" | "$lte" => &mut shape.range,
                "$regex" => &mut shape.regex,
                "$options" => continue,
                "$all" | "$size" | "$elemMatch" => &mut shape.array,
                _ => &mut shape.other,
            };
            push_unique(bucket, field);
        }
    }

    /// Indexes for a shape: text first, then one compound key in
    /// equality, sort, range order, then multikey indexes for array fields
    pub fn recommend_indexes(shape: &QueryShape) -> Vec<IndexRecommendation> {
        let mut recommendations = Vec::new();

        if shape.text.is_some() {
            recommendations.push(IndexRecommendation::Text);
        }

        let mut keys: Vec<(String, i64)> = Vec::new();
        let mut add_key = |field: &str, dir: i64| {
            if !keys.iter().any(|(existing, _)| existing == field) {
                keys.push((field.to_string(), dir));
            }
        };

        for field in &shape.equality {
            add_key(field, 1);
        }
        if let Some(sort) = &shape.sort {
            add_key(&sort.key, sort.dir);
        }
        for field in shape.range.iter().chain(shape.regex.iter()) {
            add_key(field, 1);
        }

        let compound_fields: Vec<String> = keys.iter().map(|(f, _)| f.clone()).collect();
        if !keys.is_empty() {
            recommendations.push(IndexRecommendation::Compound(keys));
        }

        for field in &shape.array {
            if !compound_fields.contains(field) {
                recommendations.push(IndexRecommendation::Compound(vec![(field.clone(), 1)]));
            }
        }

        recommendations
    }

    /// Explain output for a scan that examined `examined` documents and matched `matched`
    pub fn explain_query(
        filter: &Value,
        options: &FindOptions,
        examined: usize,
        matched: usize,
    ) -> Value {
        let shape = Self::analyze(filter, options);
        let recommendations: Vec<String> = Self::recommend_indexes(&shape)
            .iter()
            .map(ToString::to_string)
            .collect();

        json!({
            "queryPlan": "CollectionScan",
            "indexUsed": null,
            "stage": "FULL_SCAN",
            "estimatedCost": "O(n)",
            "docsExamined": examined,
            "docsMatched": matched,
            "queryShape": shape,
            "recommendedIndexes": recommendations,
        })
    }
}

fn push_unique(fields: &mut Vec<String>, field: &str) {
    if !fields.iter().any(|f| f == field) {
        fields.push(field.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_query_analysis() {
        let shape = QueryPlanner::analyze(
            &json!({"status": "open", "region": {"$in": ["eu", "us"]}}),
            &FindOptions::new(),
        );

        assert_eq!(shape.equality, vec!["status", "region"]);
        assert!(shape.range.is_empty());
        assert_eq!(shape.sort, None);
    }

    #[test]
    fn test_range_query_analysis() {
        let shape = QueryPlanner::analyze(
            &json!({"age": {"$gte": 18, "$lt": 65}, "name": {"$regex": "^a", "$options": "i"}}),
            &FindOptions::new(),
        );

        assert_eq!(shape.range, vec!["age"]);
        assert_eq!(shape.regex, vec!["name"]);
        assert!(shape.other.is_empty());
    }

    #[test]
    fn test_and_is_flattened_or_is_logical() {
        let shape = QueryPlanner::analyze(
            &json!({
                "$and": [{"team": "core"}, {"cost": {"$gt": 10}}],
                "$or": [{"a": 1}, {"b": 2}]
            }),
            &FindOptions::new(),
        );

        assert_eq!(shape.equality, vec!["team"]);
        assert_eq!(shape.range, vec!["cost"]);
        assert_eq!(shape.logical, vec!["$or"]);
    }

    #[test]
    fn test_array_text_and_other() {
        let shape = QueryPlanner::analyze(
            &json!({
                "tags": {"$all": ["a"]},
                "deleted": {"$exists": false},
                "$text": {"$search": "payments"}
            }),
            &FindOptions::new(),
        );

        assert_eq!(shape.array, vec!["tags"]);
        assert_eq!(shape.other, vec!["deleted"]);
        assert_eq!(shape.text.as_deref(), Some("payments"));
    }

    #[test]
    fn test_sort_recorded() {
        let options = FindOptions::new().with_sort("lastUpdated", 5);
        let shape = QueryPlanner::analyze(&json!({}), &options);
        assert_eq!(shape.sort, Some(SortSpec { key: "lastUpdated".into(), dir: -1 }));
        assert!(!shape.is_empty());
        assert!(QueryPlanner::analyze(&json!({}), &FindOptions::new()).is_empty());
    }

    #[test]
    fn test_recommend_equality_sort_range_order() {
        let shape = QueryPlanner::analyze(
            &json!({"monthlyCost": {"$lt": 500}, "region": "eu", "status": "running"}),
            &FindOptions::new().with_sort("lastUpdated", -1),
        );

        let recs = QueryPlanner::recommend_indexes(&shape);
        assert_eq!(
            recs,
            vec![IndexRecommendation::Compound(vec![
                ("region".into(), 1),
                ("status".into(), 1),
                ("lastUpdated".into(), -1),
                ("monthlyCost".into(), 1),
            ])]
        );
        assert_eq!(
            recs[0].to_string(),
            "{ region: 1, status: 1, lastUpdated: -1, monthlyCost: 1 }"
        );
    }

    #[test]
    fn test_recommend_text_and_multikey() {
        let shape = QueryPlanner::analyze(
            &json!({"$text": {"$search": "pci"}, "tags": {"$elemMatch": {"k": 1}}}),
            &FindOptions::new(),
        );

        let recs = QueryPlanner::recommend_indexes(&shape);
        assert_eq!(
            recs,
            vec![
                IndexRecommendation::Text,
                IndexRecommendation::Compound(vec![("tags".into(), 1)]),
            ]
        );
        assert_eq!(recs[0].to_string(), "TEXT($**)");
    }

    #[test]
    fn test_recommend_nothing_for_empty_query() {
        let shape = QueryPlanner::analyze(&json!({}), &FindOptions::new());
        assert!(QueryPlanner::recommend_indexes(&shape).is_empty());
    }

    #[test]
    fn test_explain_query() {
        let plan = QueryPlanner::explain_query(
            &json!({"status": "open"}),
            &FindOptions::new().with_sort("priority", -1),
            5,
            2,
        );

        assert_eq!(plan["queryPlan"], "CollectionScan");
        assert_eq!(plan["docsExamined"], 5);
        assert_eq!(plan["docsMatched"], 2);
        assert_eq!(plan["queryShape"]["equality"], json!(["status"]));
        assert_eq!(plan["recommendedIndexes"], json!(["{ status: 1, priority: -1 }"]));
    }
}
