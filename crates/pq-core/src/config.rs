//! Compiler configuration and loading

use serde::{Deserialize, Serialize};

/// How string operands are compared
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StringComparison {
    /// Byte-wise, case-sensitive
    #[default]
    Ordinal,
    /// Case-insensitive (Unicode lowercase folding)
    IgnoreCase,
}

impl StringComparison {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ordinal" | "exact" => Some(Self::Ordinal),
            "ignore_case" | "ignorecase" | "insensitive" => Some(Self::IgnoreCase),
            _ => None,
        }
    }
}

/// Reduction applied to a collection path so it can be used as a sort key
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollectionAggregate {
    /// Smallest non-null element
    Min,
    /// Largest non-null element
    Max,
    /// First element in collection order
    First,
}

impl CollectionAggregate {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "first" => Some(Self::First),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::First => "first",
        }
    }
}

/// Defaults applied to every compile call made from this configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CompilerConfig {
    /// String comparison mode for equality and string-matching operators
    pub string_comparison: StringComparison,
    /// Drop collection sort rules instead of failing when no aggregate is set
    pub skip_collection_paths: bool,
    /// Aggregation used for collection sort rules
    pub collection_aggregate: Option<CollectionAggregate>,
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl CompilerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("PQ_STRING_COMPARISON") {
            config.string_comparison =
                StringComparison::from_str(&v).ok_or_else(|| ConfigError::InvalidValue {
                    key: "PQ_STRING_COMPARISON".to_string(),
                    message: format!("expected 'ordinal' or 'ignore_case', got '{}'", v),
                })?;
        }

        if let Some(v) = lookup("PQ_SKIP_COLLECTION_SORTS") {
            config.skip_collection_paths = match v.to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "PQ_SKIP_COLLECTION_SORTS".to_string(),
                        message: format!("expected a boolean, got '{}'", v),
                    })
                }
            };
        }

        if let Some(v) = lookup("PQ_COLLECTION_SORT_AGGREGATE") {
            config.collection_aggregate = match v.to_lowercase().as_str() {
                "" | "none" => None,
                other => Some(CollectionAggregate::from_str(other).ok_or_else(|| {
                    ConfigError::InvalidValue {
                        key: "PQ_COLLECTION_SORT_AGGREGATE".to_string(),
                        message: format!("expected 'min', 'max', 'first' or 'none', got '{}'", v),
                    }
                })?),
            };
        }

        tracing::debug!(
            string_comparison = ?config.string_comparison,
            skip_collection_paths = config.skip_collection_paths,
            collection_aggregate = ?config.collection_aggregate,
            "Compiler configuration loaded"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.string_comparison, StringComparison::Ordinal);
        assert!(!config.skip_collection_paths);
        assert!(config.collection_aggregate.is_none());
    }

    #[test]
    fn test_config_from_lookup() {
        let config = CompilerConfig::from_lookup(lookup(&[
            ("PQ_STRING_COMPARISON", "ignore_case"),
            ("PQ_SKIP_COLLECTION_SORTS", "1"),
            ("PQ_COLLECTION_SORT_AGGREGATE", "MAX"),
        ]))
        .unwrap();

        assert_eq!(config.string_comparison, StringComparison::IgnoreCase);
        assert!(config.skip_collection_paths);
        assert_eq!(config.collection_aggregate, Some(CollectionAggregate::Max));
    }

    #[test]
    fn test_invalid_config_value() {
        let err = CompilerConfig::from_lookup(lookup(&[("PQ_SKIP_COLLECTION_SORTS", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("PQ_SKIP_COLLECTION_SORTS"));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: CompilerConfig =
            serde_json::from_str(r#"{"collection_aggregate":"first"}"#).unwrap();
        assert_eq!(config.collection_aggregate, Some(CollectionAggregate::First));
        assert_eq!(config.string_comparison, StringComparison::Ordinal);
    }
}
