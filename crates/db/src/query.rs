//! Documents and the filter / projection / sort query model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored document: a store-assigned identifier plus its field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Predicate over a single document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals `value`; when the field holds an array, matches if any element equals `value`.
    Eq { field: String, value: Value },
    /// String field equals `value` under Unicode case folding.
    EqIgnoreCase { field: String, value: String },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn eq_ignore_case(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::EqIgnoreCase {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Case-insensitive comparison key under full Unicode case folding
/// (`ß` folds to `ss`). Accents stay significant.
pub fn fold_case(value: &str) -> String {
    caseless::default_case_fold_str(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

/// Query against one collection. Without a sort, documents come back in insertion order;
/// a sort keeps insertion order among ties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub projection: Option<Vec<String>>,
    pub sort: Option<Sort>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Restrict returned fields; the identifier is always kept.
    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            direction,
        });
        self
    }

    /// Drop every field the projection does not list. No-op without a projection.
    pub fn apply_projection(&self, document: &mut Document) {
        if let Some(fields) = &self.projection {
            document.fields.retain(|key, _| fields.iter().any(|f| f == key));
        }
    }
}
