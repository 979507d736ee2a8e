// memdoc-core/src/find_options.rs
// Find query options: sort, limit, skip, pagination

use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorBorrowed, CollatorPreferences};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::config::EngineConfig;
use crate::document::Document;
use crate::error::Result;
use crate::log_warn;
use crate::value::{compare_numbers, type_priority};

/// Options for find queries.
///
/// Deserializes from `{"limit": 5, "skip": 0, "sortKey": "priority", "sortDir": -1}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FindOptions {
    /// Maximum number of documents; values below 1 count as 1
    pub limit: Option<i64>,

    /// Documents to skip after sorting
    pub skip: Option<usize>,

    /// Dotted path to sort on. No key keeps insertion order.
    pub sort_key: Option<String>,

    /// 1 ascending; anything else (or nothing) descending
    pub sort_dir: Option<i64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from host JSON; `null` means defaults
    pub fn from_json(json: &Value) -> Result<Self> {
        if json.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(json.clone())?)
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_sort(mut self, key: impl Into<String>, dir: i64) -> Self {
        self.sort_key = Some(key.into());
        self.sort_dir = Some(dir);
        self
    }

    /// Limit to apply: the caller's (clamped to >= 1), else the configured default
    pub fn effective_limit(&self, default_limit: Option<usize>) -> Option<usize> {
        match self.limit {
            Some(limit) => Some(limit.max(1) as usize),
            None => default_limit,
        }
    }

    pub fn is_ascending(&self) -> bool {
        self.sort_dir == Some(1)
    }
}

/// Stable sort on `sort_key`.
///
/// The configured rank field compares by rank; strings use ICU collation,
/// numbers compare numerically and different types order by type bucket.
pub fn apply_sort(docs: &mut [&Document], options: &FindOptions, config: &EngineConfig) {
    let Some(sort_key) = options.sort_key.as_deref() else {
        return;
    };

    let ascending = options.is_ascending();
    let directed = |ord: Ordering| if ascending { ord } else { ord.reverse() };

    if sort_key == config.rank_field {
        docs.sort_by(|a, b| {
            let rank_a = config.rank_of(a.get_path(sort_key));
            let rank_b = config.rank_of(b.get_path(sort_key));
            directed(rank_a.cmp(&rank_b))
        });
        return;
    }

    let collator = new_collator();
    docs.sort_by(|a, b| {
        directed(compare_for_sort(
            a.get_path(sort_key),
            b.get_path(sort_key),
            collator.as_ref(),
        ))
    });
}

fn new_collator() -> Option<CollatorBorrowed<'static>> {
    match Collator::try_new(CollatorPreferences::default(), CollatorOptions::default()) {
        Ok(collator) => Some(collator),
        Err(e) => {
            log_warn!("collator unavailable ({:?}), sorting strings by code point", e);
            None
        }
    }
}

/// Total order over sort values: absent/null < number < string < bool < object < array
fn compare_for_sort(
    a: Option<&Value>,
    b: Option<&Value>,
    collator: Option<&CollatorBorrowed<'static>>,
) -> Ordering {
    match (a, b) {
        (Some(Value::Number(n1)), Some(Value::Number(n2))) => {
            compare_numbers(n1, n2).unwrap_or(Ordering::Equal)
        }

        (Some(Value::String(s1)), Some(Value::String(s2))) => match collator {
            Some(collator) => collator.compare(s1, s2),
            None => s1.cmp(s2),
        },

        (Some(Value::Bool(b1)), Some(Value::Bool(b2))) => b1.cmp(b2),

        // Same bucket (absent/null, objects, arrays) ties; otherwise bucket order
        _ => type_priority(a).cmp(&type_priority(b)),
    }
}

/// Apply skip then limit
pub fn apply_limit_skip<T>(docs: Vec<T>, limit: Option<usize>, skip: Option<usize>) -> Vec<T> {
    let skip_count = skip.unwrap_or(0);

    if skip_count >= docs.len() {
        return Vec::new();
    }

    let docs = docs.into_iter().skip(skip_count);
    match limit {
        Some(limit_count) => docs.take(limit_count).collect(),
        None => docs.collect(),
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub total: usize,
    pub page_count: usize,
    /// 1-based, clamped into `1..=page_count`
    pub page: usize,
    pub page_size: usize,
    pub docs: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total: self.total,
            page_count: self.page_count,
            page: self.page,
            page_size: self.page_size,
            docs: self.docs.into_iter().map(f).collect(),
        }
    }
}

/// Cut `items` into pages of `page_size` (at least 1) and return page `page`
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let page_count = total.div_ceil(page_size).max(1);
    let page = page.clamp(1, page_count);

    let docs = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        total,
        page_count,
        page,
        page_size,
        docs,
    }
}
