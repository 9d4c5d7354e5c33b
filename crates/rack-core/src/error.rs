use thiserror::Error;

use crate::fields::SemanticField;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to access config store {path}: {source}")]
    StoreIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config store {path}: {source}")]
    StoreParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration errors raised while applying a [`crate::FieldMapping`].
///
/// Both variants block the whole table: the mapper never returns partial rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// One or more mandatory semantic fields have no source column assigned.
    #[error("mapping not set for mandatory fields: {}", field_list(.missing))]
    MappingIncomplete { missing: Vec<SemanticField> },

    /// A mapped source column does not exist in the fetched table.
    ///
    /// `available` lists every column of the table in source order so the
    /// administrator can see what the source actually provides.
    #[error("mapped column '{column}' (for {field}) not found. Found: {available:?}")]
    ColumnNotFound {
        field: SemanticField,
        column: String,
        available: Vec<String>,
    },
}

fn field_list(fields: &[SemanticField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
