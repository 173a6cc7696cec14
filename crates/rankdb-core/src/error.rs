//! Error types for all RankDB operations.

use thiserror::Error;

use crate::engine::EngineError;
use crate::item::ValueType;

/// Top-level error type for RankDB operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("engine operation '{op}' failed")]
    Engine {
        op: &'static str,
        #[source]
        source: EngineError,
    },
}

impl Error {
    pub(crate) fn engine(op: &'static str, source: EngineError) -> Self {
        Error::Engine { op, source }
    }
}

/// Caller-input validation failures. Never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("kind must not be empty")]
    EmptyKind,

    #[error("id must not be empty")]
    EmptyId,

    #[error("field name must not be empty")]
    EmptyFieldName,

    #[error("kind must not contain ':': {0}")]
    InvalidKindName(String),

    #[error("field name must not contain ':': {0}")]
    InvalidFieldName(String),

    #[error("indexed field '{field}' has a non-finite score")]
    NonFiniteScore { field: String },
}

/// Indexing-contract violations detected at write time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("kind not defined: {0}")]
    TypeNotDefined(String),

    #[error("kind '{kind}' declares indexed field '{field}' but the item does not supply it")]
    MissingIndexedField { kind: String, field: String },

    #[error("declared indexed field '{field}' of kind '{kind}' must be numeric, got {actual}")]
    NonNumericIndex {
        kind: String,
        field: String,
        actual: ValueType,
    },

    #[error("value type not indexable (field: {field}): {actual}")]
    NotIndexableType { field: String, actual: ValueType },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("sort field is required")]
    SortFieldRequired,

    #[error("sort field must be indexed for kind '{kind}': {field}")]
    FieldNotIndexed { kind: String, field: String },
}

/// Corrupt or incompatible stored bytes. Surfaced, never silently skipped:
/// dropping a record would desynchronize an index from its primary records.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode item: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("decode item: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("index member has no primary record: {key}")]
    MissingRecord { key: String },
}

pub type Result<T> = std::result::Result<T, Error>;
