// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemDocError {
    #[error("Malformed filter at '{path}' ({operator}): {reason}")]
    MalformedFilter {
        operator: String,
        path: String,
        reason: String,
    },

    #[error("Malformed update at '{path}' ({operator}): {reason}")]
    MalformedUpdate {
        operator: String,
        path: String,
        reason: String,
    },

    #[error("Invalid projection: {0}")]
    InvalidProjection(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Duplicate _id: {0}")]
    DuplicateId(String),

    #[error("Document '{0}' not found")]
    DocumentNotFound(String),

    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    #[error("Sequential _id space exhausted after {0}")]
    IdSpaceExhausted(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MemDocError {
    pub(crate) fn malformed_filter(
        operator: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        MemDocError::MalformedFilter {
            operator: operator.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_update(
        operator: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        MemDocError::MalformedUpdate {
            operator: operator.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MemDocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_filter_message_names_operator_and_path() {
        let err = MemDocError::malformed_filter("$and", "$and", "expected an array");
        assert_eq!(
            err.to_string(),
            "Malformed filter at '$and' ($and): expected an array"
        );
    }

    #[test]
    fn test_serde_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: MemDocError = parse.unwrap_err().into();
        assert!(matches!(err, MemDocError::Serialization(_)));
    }
}
