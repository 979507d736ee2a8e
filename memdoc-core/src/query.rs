// src/query.rs
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::{MemDocError, Result};
use crate::path::get_path;
use crate::value::{compare_values, contains_value, values_equal};
use crate::{log_debug, log_trace};
use std::cmp::Ordering;

/// Field-level operators
#[derive(Debug, Clone)]
pub enum QueryOperator {
    // Comparison
    Eq(Value),           // $eq
    Ne(Value),           // $ne
    Gt(Value),           // $gt
    Gte(Value),          // $gte
    Lt(Value),           // $lt
    Lte(Value),          // $lte
    In(Vec<Value>),      // $in
    Nin(Vec<Value>),     // $nin

    // Strings and arrays
    Regex(Regex),        // $regex (+ $options)
    All(Vec<Value>),     // $all
    Size(f64),           // $size
    ElemMatch(Box<Query>), // $elemMatch

    // Other
    Exists(bool),        // $exists
    Not(Vec<QueryOperator>), // $not

    /// Unrecognized operator, or an operand that can never match.
    /// Always evaluates false.
    Unknown(String),
}

/// Right-hand side of a field key
#[derive(Debug, Clone)]
pub enum Condition {
    /// Bare value: equality, or membership when the field holds an array
    Literal(Value),
    /// Operator map; every operator must hold
    Operators(Vec<QueryOperator>),
}

#[derive(Debug, Clone)]
pub enum Clause {
    And(Vec<Query>),
    Or(Vec<Query>),
    Nor(Vec<Query>),
    /// `$text: { $search }`, stored lowercased
    Text(String),
    Field { path: String, condition: Condition },
    /// Unrecognized top-level `$` key. Always evaluates false.
    Unknown(String),
}

/// Parsed filter expression. All clauses AND together; no clauses matches everything.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub clauses: Vec<Clause>,
}

impl Query {
    pub fn new() -> Self {
        Query { clauses: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Query parsing from JSON
    pub fn from_json(json: &Value) -> Result<Self> {
        Self::parse(json, "")
    }

    fn parse(json: &Value, location: &str) -> Result<Self> {
        let map = json.as_object().ok_or_else(|| {
            MemDocError::malformed_filter(
                "filter",
                display_location(location),
                "expected an object",
            )
        })?;

        let mut clauses = Vec::with_capacity(map.len());
        for (key, condition) in map {
            let here = join_location(location, key);
            let clause = match key.as_str() {
                "$and" => Clause::And(Self::parse_branches(key, condition, &here)?),
                "$or" => Clause::Or(Self::parse_branches(key, condition, &here)?),
                "$nor" => Clause::Nor(Self::parse_branches(key, condition, &here)?),
                "$text" => Clause::Text(Self::parse_text(condition, &here)?),
                op if op.starts_with('$') => Clause::Unknown(op.to_string()),
                field => Clause::Field {
                    path: field.to_string(),
                    condition: Self::parse_condition(condition, &here)?,
                },
            };
            clauses.push(clause);
        }

        Ok(Query { clauses })
    }

    /// Parse the sub-filters of a logical operator ($and, $or, $nor)
    fn parse_branches(op: &str, value: &Value, location: &str) -> Result<Vec<Query>> {
        let branches = value.as_array().ok_or_else(|| {
            MemDocError::malformed_filter(op, location, format!("{} requires an array", op))
        })?;

        branches
            .iter()
            .enumerate()
            .map(|(i, branch)| Self::parse(branch, &format!("{}[{}]", location, i)))
            .collect()
    }

    fn parse_text(value: &Value, location: &str) -> Result<String> {
        match value.get("$search") {
            Some(Value::String(term)) => Ok(term.to_lowercase()),
            _ => Err(MemDocError::malformed_filter(
                "$text",
                location,
                "$text requires {\"$search\": <string>}",
            )),
        }
    }

    fn parse_condition(value: &Value, location: &str) -> Result<Condition> {
        match value {
            Value::Object(map) if is_operator_map(map) => {
                Ok(Condition::Operators(Self::parse_operators(map, location)?))
            }
            other => Ok(Condition::Literal(other.clone())),
        }
    }

    /// Operator parsing
    fn parse_operators(map: &Map<String, Value>, location: &str) -> Result<Vec<QueryOperator>> {
        let mut operators = Vec::with_capacity(map.len());

        for (op, val) in map {
            let operator = match op.as_str() {
                "$eq" => QueryOperator::Eq(val.clone()),
                "$ne" => QueryOperator::Ne(val.clone()),
                "$gt" => QueryOperator::Gt(val.clone()),
                "$gte" => QueryOperator::Gte(val.clone()),
                "$lt" => QueryOperator::Lt(val.clone()),
                "$lte" => QueryOperator::Lte(val.clone()),
                "$in" => match val {
                    Value::Array(arr) => QueryOperator::In(arr.clone()),
                    _ => QueryOperator::Unknown("$in (non-array operand)".into()),
                },
                "$nin" => match val {
                    Value::Array(arr) => QueryOperator::Nin(arr.clone()),
                    _ => QueryOperator::Unknown("$nin (non-array operand)".into()),
                },
                "$all" => match val {
                    Value::Array(arr) => QueryOperator::All(arr.clone()),
                    _ => QueryOperator::Unknown("$all (non-array operand)".into()),
                },
                "$size" => match val.as_f64() {
                    Some(n) => QueryOperator::Size(n),
                    None => QueryOperator::Unknown("$size (non-numeric operand)".into()),
                },
                "$regex" => {
                    QueryOperator::Regex(compile_regex(val, map.get("$options"), location)?)
                }
                // consumed together with $regex
                "$options" if map.contains_key("$regex") => continue,
                "$elemMatch" => {
                    if !val.is_object() {
                        return Err(MemDocError::malformed_filter(
                            "$elemMatch",
                            location,
                            "$elemMatch requires an object filter",
                        ));
                    }
                    QueryOperator::ElemMatch(Box::new(Self::parse(val, location)?))
                }
                "$exists" => match val {
                    Value::Bool(b) => QueryOperator::Exists(*b),
                    _ => {
                        return Err(MemDocError::malformed_filter(
                            "$exists",
                            location,
                            "$exists requires bool",
                        ))
                    }
                },
                "$not" => match val {
                    Value::Object(inner) => {
                        QueryOperator::Not(Self::parse_operators(inner, location)?)
                    }
                    _ => {
                        return Err(MemDocError::malformed_filter(
                            "$not",
                            location,
                            "$not requires an operator object",
                        ))
                    }
                },
                _ => QueryOperator::Unknown(op.clone()),
            };
            operators.push(operator);
        }

        Ok(operators)
    }

    /// Does the document match the query
    pub fn matches(&self, document: &Document) -> bool {
        self.matches_fields(document.fields())
    }

    pub(crate) fn matches_fields(&self, fields: &Map<String, Value>) -> bool {
        self.clauses.iter().all(|clause| Self::matches_clause(clause, fields))
    }

    fn matches_clause(clause: &Clause, fields: &Map<String, Value>) -> bool {
        match clause {
            Clause::And(queries) => queries.iter().all(|q| q.matches_fields(fields)),
            Clause::Or(queries) => queries.iter().any(|q| q.matches_fields(fields)),
            Clause::Nor(queries) => !queries.iter().any(|q| q.matches_fields(fields)),
            Clause::Text(term) => text_contains(fields, term),
            Clause::Field { path, condition } => {
                Self::matches_condition(get_path(fields, path), condition)
            }
            Clause::Unknown(op) => {
                log_debug!("unknown top-level operator '{}' never matches", op);
                false
            }
        }
    }

    fn matches_condition(value: Option<&Value>, condition: &Condition) -> bool {
        match condition {
            Condition::Literal(target) => match value {
                Some(Value::Array(items)) => contains_value(items, target),
                Some(v) => values_equal(v, target),
                None => false,
            },
            Condition::Operators(operators) => operators
                .iter()
                .all(|operator| Self::matches_operator(value, operator)),
        }
    }

    /// Operator check against a resolved field value (`None` = absent)
    fn matches_operator(value: Option<&Value>, operator: &QueryOperator) -> bool {
        match operator {
            QueryOperator::Eq(target) => value.is_some_and(|v| values_equal(v, target)),

            QueryOperator::Ne(target) => !value.is_some_and(|v| values_equal(v, target)),

            QueryOperator::Gt(target) => ordered(value, target, |o| o == Ordering::Greater),

            QueryOperator::Gte(target) => ordered(value, target, |o| o != Ordering::Less),

            QueryOperator::Lt(target) => ordered(value, target, |o| o == Ordering::Less),

            QueryOperator::Lte(target) => ordered(value, target, |o| o != Ordering::Greater),

            // Array fields match when any element is in the operand list
            QueryOperator::In(targets) => match value {
                Some(Value::Array(items)) => items.iter().any(|item| contains_value(targets, item)),
                Some(v) => contains_value(targets, v),
                None => false,
            },

            QueryOperator::Nin(targets) => match value {
                Some(Value::Array(items)) => {
                    !items.iter().any(|item| contains_value(targets, item))
                }
                Some(v) => !contains_value(targets, v),
                None => true,
            },

            QueryOperator::Regex(re) => {
                value.and_then(Value::as_str).is_some_and(|s| re.is_match(s))
            }

            QueryOperator::All(targets) => match value {
                Some(Value::Array(items)) => targets.iter().all(|t| contains_value(items, t)),
                _ => false,
            },

            QueryOperator::Size(expected) => match value {
                Some(Value::Array(items)) => items.len() as f64 == *expected,
                _ => false,
            },

            QueryOperator::ElemMatch(query) => match value {
                Some(Value::Array(items)) => {
                    let empty = Map::new();
                    items.iter().any(|item| match item {
                        Value::Object(fields) => query.matches_fields(fields),
                        _ => query.matches_fields(&empty),
                    })
                }
                _ => false,
            },

            QueryOperator::Exists(should_exist) => value.is_some() == *should_exist,

            QueryOperator::Not(operators) => !operators
                .iter()
                .all(|operator| Self::matches_operator(value, operator)),

            QueryOperator::Unknown(op) => {
                log_debug!("unknown operator '{}' never matches", op);
                false
            }
        }
    }
}

/// Match a document against a JSON filter
pub fn matches(document: &Document, filter: &Value) -> Result<bool> {
    let query = Query::from_json(filter)?;
    Ok(query.matches(document))
}

/// `{}` and any map with a `$` key are operator maps; other objects are literals
fn is_operator_map(map: &Map<String, Value>) -> bool {
    map.is_empty() || map.keys().any(|k| k.starts_with('$'))
}

fn ordered(value: Option<&Value>, target: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    value
        .and_then(|v| compare_values(v, target))
        .is_some_and(accept)
}

fn compile_regex(pattern: &Value, options: Option<&Value>, location: &str) -> Result<Regex> {
    let pattern = match pattern {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => {
            return Err(MemDocError::malformed_filter(
                "$regex",
                location,
                "$regex requires a string pattern",
            ))
        }
    };

    let mut builder = RegexBuilder::new(&pattern);
    builder.case_insensitive(true);

    if let Some(options) = options {
        let flags = options.as_str().ok_or_else(|| {
            MemDocError::malformed_filter("$options", location, "$options must be a string")
        })?;
        for flag in flags.chars() {
            match flag {
                'i' => {}
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                other => {
                    return Err(MemDocError::malformed_filter(
                        "$options",
                        location,
                        format!("unsupported regex flag '{}'", other),
                    ))
                }
            }
        }
    }

    builder.build().map_err(|e| {
        MemDocError::malformed_filter(
            "$regex",
            location,
            format!("invalid pattern '{}': {}", pattern, e),
        )
    })
}

/// Case-insensitive substring search over the serialized document (keys included)
fn text_contains(fields: &Map<String, Value>, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }

    let haystack = match serde_json::to_string(fields) {
        Ok(json) => json.to_lowercase(),
        Err(_) => return false,
    };
    let found = haystack.contains(term);
    log_trace!("$text '{}' -> {}", term, found);
    found
}

fn join_location(location: &str, key: &str) -> String {
    if location.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", location, key)
    }
}

fn display_location(location: &str) -> &str {
    if location.is_empty() {
        "<root>"
    } else {
        location
    }
}
