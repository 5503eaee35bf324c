//! Core error types for the predicate query compiler
//!
//! Every error is raised while compiling a filter or sort specification.
//! A compiled predicate or comparator never fails at evaluation time.

use thiserror::Error;

/// Error raised when a filter or sort specification cannot be compiled
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// A property path is malformed or names a member the entity does not have
    #[error("Cannot resolve path '{path}': {reason}")]
    PathResolution { path: String, reason: String },

    /// A literal cannot be converted to the type required by its property
    #[error("Cannot convert {source_kind} value {value} to {target}")]
    Coercion {
        value: String,
        source_kind: &'static str,
        target: String,
    },

    /// The operator is not defined for the resolved property type
    #[error("Operator {operator} is not supported on '{property}' ({value_type})")]
    UnsupportedOperator {
        operator: String,
        property: String,
        value_type: String,
    },

    /// A sort rule targets a collection path and no aggregation was supplied
    #[error("Sort on collection path '{path}' requires an aggregation policy")]
    CollectionSortAmbiguity { path: String },
}

impl QueryError {
    pub fn path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathResolution {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn coercion(
        value: impl Into<String>,
        source_kind: &'static str,
        target: impl ToString,
    ) -> Self {
        Self::Coercion {
            value: value.into(),
            source_kind,
            target: target.to_string(),
        }
    }

    pub fn unsupported(
        operator: impl ToString,
        property: impl Into<String>,
        value_type: impl ToString,
    ) -> Self {
        Self::UnsupportedOperator {
            operator: operator.to_string(),
            property: property.into(),
            value_type: value_type.to_string(),
        }
    }

    /// Stable machine-readable code for the error kind
    pub fn error_code(&self) -> &'static str {
        match self {
            QueryError::PathResolution { .. } => "path_resolution",
            QueryError::Coercion { .. } => "coercion",
            QueryError::UnsupportedOperator { .. } => "unsupported_operator",
            QueryError::CollectionSortAmbiguity { .. } => "collection_sort_ambiguity",
        }
    }
}
