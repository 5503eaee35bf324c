//! Result type aliases

use crate::error::QueryError;

/// Standard Result type for compile operations
pub type QueryResult<T> = Result<T, QueryError>;
