//! Sort Rules
//!
//! Sort rules name a property path and a direction. A rule whose path
//! reaches a collection can only be used as a key once it is reduced to one
//! value per entity (see [`crate::sorting`]).

use serde::{Deserialize, Serialize};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order (nulls first)
    #[default]
    Asc,
    /// Descending order (nulls last)
    Desc,
}

/// A single sort key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SortRule {
    /// Dotted property path
    pub property: String,
    #[serde(default)]
    pub descending: bool,
}

impl SortRule {
    pub fn new(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            property: property.into(),
            descending: direction == SortDirection::Desc,
        }
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Asc)
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Desc)
    }

    pub fn direction(&self) -> SortDirection {
        if self.descending {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

/// Ordered list of sort rules; earlier rules take precedence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortOrder {
    rules: Vec<SortRule>,
}

impl SortOrder {
    pub fn new() -> Self {
        Self { rules: vec![] }
    }

    pub fn by(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            rules: vec![SortRule::new(property, direction)],
        }
    }

    pub fn by_asc(property: impl Into<String>) -> Self {
        Self::by(property, SortDirection::Asc)
    }

    pub fn by_desc(property: impl Into<String>) -> Self {
        Self::by(property, SortDirection::Desc)
    }

    /// Add a sort rule (builder pattern)
    pub fn then(mut self, rule: SortRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn then_asc(self, property: impl Into<String>) -> Self {
        self.then(SortRule::asc(property))
    }

    pub fn then_desc(self, property: impl Into<String>) -> Self {
        self.then(SortRule::desc(property))
    }

    pub fn rules(&self) -> &[SortRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

impl From<Vec<SortRule>> for SortOrder {
    fn from(rules: Vec<SortRule>) -> Self {
        Self { rules }
    }
}
