//! Query Model
//!
//! A Query bundles an ordered sequence of filter groups with a sort order.
//! Compiling it against an entity type yields a [`CompiledQuery`] that can
//! be applied to any number of in-memory collections.

use pq_core::{CompilerConfig, QueryResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compile::{compile_groups, CompileOptions};
use crate::filters::{FilterGroup, FilterRule};
use crate::predicate::Predicate;
use crate::schema::Entity;
use crate::sorting::{compile_sort, Comparator, SortOptions};
use crate::sorts::SortOrder;

/// A filter and sort specification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Query {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Filter groups, joined by each group's `inter_operator`
    #[serde(default)]
    pub filters: Vec<FilterGroup>,
    /// Sort rules in precedence order
    #[serde(default)]
    pub sorts: SortOrder,
}

impl Query {
    /// Create a new empty query with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a filter group
    pub fn with_group(mut self, group: FilterGroup) -> Self {
        self.filters.push(group);
        self
    }

    /// Set the sort order
    pub fn with_sorts(mut self, sorts: SortOrder) -> Self {
        self.sorts = sorts;
        self
    }

    /// Check if this query has any filters
    pub fn has_filters(&self) -> bool {
        self.filters.iter().any(|group| !group.is_empty())
    }

    /// Check if this query has custom sorting
    pub fn has_sorts(&self) -> bool {
        !self.sorts.is_empty()
    }

    /// Every rule across all groups, depth-first
    pub fn all_rules(&self) -> Vec<&FilterRule> {
        self.filters.iter().flat_map(|group| group.all_rules()).collect()
    }

    /// Compile with options derived from a configuration
    pub fn compile<T: Entity>(&self, config: &CompilerConfig) -> QueryResult<CompiledQuery<T>> {
        self.compile_with(&CompileOptions::from_config(config), &SortOptions::from_config(config))
    }

    /// Compile with explicit options
    pub fn compile_with<T: Entity>(
        &self,
        filter_options: &CompileOptions,
        sort_options: &SortOptions,
    ) -> QueryResult<CompiledQuery<T>> {
        let predicate = compile_groups(&self.filters, filter_options)?;
        let comparator = compile_sort(self.sorts.rules(), sort_options)?;
        debug!(
            query = %self.name,
            groups = self.filters.len(),
            filtered = self.has_filters(),
            sorted = self.has_sorts(),
            sort_keys = comparator.len(),
            "Compiled query"
        );
        Ok(CompiledQuery {
            predicate,
            comparator,
        })
    }
}

/// A query compiled against one entity type
#[derive(Debug)]
pub struct CompiledQuery<T: 'static> {
    pub predicate: Predicate<T>,
    pub comparator: Comparator<T>,
}

impl<T: 'static> Clone for CompiledQuery<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            comparator: self.comparator.clone(),
        }
    }
}

impl<T: 'static> CompiledQuery<T> {
    /// Filter, then sort, the given entities
    pub fn apply<'a, I>(&self, items: I) -> Vec<&'a T>
    where
        I: IntoIterator<Item = &'a T>,
    {
        let predicate = &self.predicate;
        self.comparator
            .sorted(items.into_iter().filter(|item| predicate.matches(item)))
    }

    /// Number of entities that pass the filter
    pub fn count<'a, I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = &'a T>,
    {
        items.into_iter().filter(|item| self.predicate.matches(item)).count()
    }
}
