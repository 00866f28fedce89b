//! Error types for the document store gateway

use thiserror::Error;

/// Failures raised by a [`crate::DocumentStore`] backend.
///
/// An absent document is never an error: lookups return `Ok(None)` instead.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store connection is closed")]
    Closed,

    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("document in '{collection}' is not a JSON object")]
    NotAnObject { collection: String },

    #[error("failed to (de)serialize document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported store endpoint '{0}'")]
    UnsupportedEndpoint(String),

    #[error("'{0}' is not a valid collection or field name")]
    InvalidName(String),

    #[error("store backend error: {0}")]
    Backend(#[from] surrealdb::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_collection_names_the_collection() {
        let err = StoreError::UnknownCollection("authors".to_string());
        assert_eq!(err.to_string(), "unknown collection 'authors'");
    }

    #[test]
    fn serialization_errors_convert() {
        let raw = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StoreError = raw.into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
