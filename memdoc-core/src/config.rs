// memdoc-core/src/config.rs
// Engine configuration: id generation, timestamp fields, defaults for find()

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MemDocError, Result};

/// How `_id` values are generated for documents inserted without one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum IdStrategy {
    /// UUID v4 string
    #[default]
    ObjectId,
    /// Auto-increment integer per collection
    Sequential,
}

/// What to do with a projection that mixes `1` and `0` keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ProjectionPolicy {
    /// Inclusion wins, exclusion keys are ignored
    #[default]
    PreferInclude,
    /// Mixing non-`_id` keys is an `InvalidProjection` error
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub id_strategy: IdStrategy,
    pub created_at_field: String,
    pub updated_at_field: String,
    /// Limit used by find() when the caller gives none. `None` returns everything.
    pub default_limit: Option<usize>,
    /// Sort key that is compared through `rank_table` instead of its raw value
    pub rank_field: String,
    pub rank_table: IndexMap<String, i64>,
    pub strict_updates: bool,
    pub projection_policy: ProjectionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let rank_table = [("low", 1), ("medium", 2), ("high", 3), ("urgent", 4)]
            .into_iter()
            .map(|(name, rank)| (name.to_string(), rank))
            .collect();

        EngineConfig {
            id_strategy: IdStrategy::ObjectId,
            created_at_field: "createdAt".to_string(),
            updated_at_field: "updatedAt".to_string(),
            default_limit: Some(50),
            rank_field: "priority".to_string(),
            rank_table,
            strict_updates: false,
            projection_policy: ProjectionPolicy::PreferInclude,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config from a host-provided JSON object; missing keys keep their defaults
    pub fn from_json(json: &Value) -> Result<Self> {
        let config: EngineConfig = serde_json::from_value(json.clone())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.created_at_field.is_empty() || self.updated_at_field.is_empty() {
            return Err(MemDocError::InvalidConfig(
                "timestamp field names must not be empty".into(),
            ));
        }
        if self.created_at_field == "_id" || self.updated_at_field == "_id" {
            return Err(MemDocError::InvalidConfig(
                "timestamp fields cannot be _id".into(),
            ));
        }
        if self.default_limit == Some(0) {
            return Err(MemDocError::InvalidConfig(
                "default_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn with_id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    pub fn with_default_limit(mut self, limit: Option<usize>) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_strict_updates(mut self, strict: bool) -> Self {
        self.strict_updates = strict;
        self
    }

    pub fn with_projection_policy(mut self, policy: ProjectionPolicy) -> Self {
        self.projection_policy = policy;
        self
    }

    pub fn with_rank(mut self, field: impl Into<String>, table: IndexMap<String, i64>) -> Self {
        self.rank_field = field.into();
        self.rank_table = table;
        self
    }

    /// Rank of a value of `rank_field`; unknown or non-string values rank 0
    pub fn rank_of(&self, value: Option<&Value>) -> i64 {
        value
            .and_then(Value::as_str)
            .and_then(|name| self.rank_table.get(name))
            .copied()
            .unwrap_or(0)
    }
}
