// src/update.rs
// Update operators: $set, $inc, $push, $pull, $unset, $addToSet

use serde_json::{Map, Number, Value};

use crate::document::{Document, ID_FIELD};
use crate::error::{MemDocError, Result};
use crate::path::{get_path, get_path_mut, remove_path, root_segment, set_path};
use crate::config::EngineConfig;
use crate::timestamp::Timestamper;
use crate::value::{contains_value, type_name, values_equal};
use crate::{log_debug, log_warn};

/// Single field mutation, in the order it appears in the update document
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperator {
    Set { path: String, value: Value },
    Inc { path: String, delta: Number },
    Push { path: String, value: Value },
    Pull { path: String, value: Value },
    Unset { path: String },
    AddToSet { path: String, value: Value },
}

impl UpdateOperator {
    pub fn path(&self) -> &str {
        match self {
            UpdateOperator::Set { path, .. }
            | UpdateOperator::Inc { path, .. }
            | UpdateOperator::Push { path, .. }
            | UpdateOperator::Pull { path, .. }
            | UpdateOperator::Unset { path }
            | UpdateOperator::AddToSet { path, .. } => path,
        }
    }
}

/// Parsed update document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    operators: Vec<UpdateOperator>,
}

impl Update {
    /// Parse an update document.
    ///
    /// With `strict` unset, unknown operators, non-object payloads, `_id`
    /// targets and non-numeric `$inc` deltas are dropped with a warning.
    /// With `strict` set they are `MalformedUpdate` errors.
    pub fn from_json(update: &Value, strict: bool) -> Result<Self> {
        let ops = update.as_object().ok_or_else(|| {
            MemDocError::malformed_update(
                "update",
                "<root>",
                format!("expected an object, got {}", type_name(update)),
            )
        })?;

        let mut operators = Vec::new();

        for (op, payload) in ops {
            if !is_known_operator(op) {
                reject(strict, op, "<root>", "unknown update operator")?;
                continue;
            }

            let fields = match payload {
                Value::Object(fields) => fields,
                other => {
                    reject(
                        strict,
                        op,
                        "<root>",
                        &format!("payload must be an object, got {}", type_name(other)),
                    )?;
                    continue;
                }
            };

            for (path, value) in fields {
                if root_segment(path) == ID_FIELD {
                    reject(strict, op, path, "_id is immutable")?;
                    continue;
                }

                if let Some(operator) = parse_operator(op, path, value, strict)? {
                    operators.push(operator);
                }
            }
        }

        Ok(Update { operators })
    }

    pub fn operators(&self) -> &[UpdateOperator] {
        &self.operators
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Apply every operator in order. Timestamps are the caller's concern.
    pub fn apply(&self, document: &mut Document) {
        let fields = document.fields_mut();
        for operator in &self.operators {
            apply_operator(fields, operator);
        }
    }
}

/// Parse `update` leniently, apply it and stamp `updatedAt` with a value
/// later than the one the document held before.
///
/// Uses the default config; see [`apply_update_with`] for other field names.
pub fn apply_update(document: &mut Document, update: &Value) -> Result<()> {
    apply_update_with(document, update, &EngineConfig::default())
}

/// Like [`apply_update`], honouring `updated_at_field` and `strict_updates`
pub fn apply_update_with(
    document: &mut Document,
    update: &Value,
    config: &EngineConfig,
) -> Result<()> {
    let parsed = Update::from_json(update, config.strict_updates)?;

    let mut clock = Timestamper::new();
    if let Some(Value::String(previous)) = document.get(&config.updated_at_field) {
        clock.observe(previous);
    }

    parsed.apply(document);
    document.set(config.updated_at_field.clone(), Value::String(clock.next()));
    Ok(())
}

fn is_known_operator(op: &str) -> bool {
    matches!(
        op,
        "$set" | "$inc" | "$push" | "$pull" | "$unset" | "$addToSet"
    )
}

fn parse_operator(
    op: &str,
    path: &str,
    value: &Value,
    strict: bool,
) -> Result<Option<UpdateOperator>> {
    let path = path.to_string();
    let operator = match op {
        "$set" => UpdateOperator::Set { path, value: value.clone() },
        "$inc" => match value {
            Value::Number(delta) => UpdateOperator::Inc { path, delta: delta.clone() },
            other => {
                reject(
                    strict,
                    op,
                    &path,
                    &format!("increment must be a number, got {}", type_name(other)),
                )?;
                return Ok(None);
            }
        },
        "$push" => UpdateOperator::Push { path, value: value.clone() },
        "$pull" => UpdateOperator::Pull { path, value: value.clone() },
        "$unset" => UpdateOperator::Unset { path },
        "$addToSet" => UpdateOperator::AddToSet { path, value: value.clone() },
        _ => return Ok(None),
    };
    Ok(Some(operator))
}

/// Error in strict mode, warning otherwise
fn reject(strict: bool, op: &str, path: &str, reason: &str) -> Result<()> {
    if strict {
        return Err(MemDocError::malformed_update(op, path, reason));
    }
    log_warn!("skipping {} at '{}': {}", op, path, reason);
    Ok(())
}

fn apply_operator(fields: &mut Map<String, Value>, operator: &UpdateOperator) {
    match operator {
        UpdateOperator::Set { path, value } => set_path(fields, path, value.clone()),

        UpdateOperator::Inc { path, delta } => {
            let current = get_path(fields, path).and_then(Value::as_number);
            let next = increment(current, delta);
            set_path(fields, path, next);
        }

        // Non-arrays (absent included) start over as []
        UpdateOperator::Push { path, value } => {
            if let Some(Value::Array(items)) = get_path_mut(fields, path) {
                items.push(value.clone());
            } else {
                set_path(fields, path, Value::Array(vec![value.clone()]));
            }
        }

        UpdateOperator::AddToSet { path, value } => {
            if let Some(Value::Array(items)) = get_path_mut(fields, path) {
                if !contains_value(items, value) {
                    items.push(value.clone());
                }
            } else {
                set_path(fields, path, Value::Array(vec![value.clone()]));
            }
        }

        UpdateOperator::Pull { path, value } => match get_path_mut(fields, path) {
            Some(Value::Array(items)) => items.retain(|item| !values_equal(item, value)),
            _ => log_debug!("$pull at '{}': not an array, left untouched", path),
        },

        UpdateOperator::Unset { path } => {
            remove_path(fields, path);
        }
    }
}

/// Absent or non-numeric current values count as 0. Integers stay integers
/// unless the sum overflows.
fn increment(current: Option<&Number>, delta: &Number) -> Value {
    let current_int = match current {
        Some(n) => n.as_i64(),
        None => Some(0),
    };

    if let (Some(a), Some(b)) = (current_int, delta.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Value::from(sum);
        }
    }

    let a = current.and_then(Number::as_f64).unwrap_or(0.0);
    let b = delta.as_f64().unwrap_or(0.0);
    Value::from(a + b)
}
