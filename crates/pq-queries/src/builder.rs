//! Query Builder
//!
//! Fluent API for constructing queries. Every call consumes the builder and
//! returns a new one, so a partially built query can be cloned and extended
//! in two directions without either branch seeing the other's rules.

use serde_json::Value as Json;

use crate::filters::{FilterGroup, FilterNode, FilterOperator, FilterRule, LogicalOperator};
use crate::query::Query;
use crate::sorts::{SortOrder, SortRule};

/// Builder for constructing queries fluently
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    name: String,
    groups: Vec<FilterGroup>,
    sorts: SortOrder,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            name: "New Query".to_string(),
            ..Default::default()
        }
    }

    /// Set the query name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    // Filter methods

    /// Start a new group; following rules are added to it
    pub fn group(mut self, logical_operator: LogicalOperator) -> Self {
        self.groups.push(FilterGroup::new(logical_operator));
        self
    }

    /// Append a complete group
    pub fn with_group(mut self, group: FilterGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Set how the current group joins the next one
    pub fn then(mut self, inter_operator: LogicalOperator) -> Self {
        if let Some(group) = self.groups.last_mut() {
            group.inter_operator = inter_operator;
        }
        self
    }

    /// Negate the current group
    pub fn negate_group(mut self) -> Self {
        if let Some(group) = self.groups.last_mut() {
            group.is_negated = !group.is_negated;
        }
        self
    }

    /// Add a rule or nested group to the current group, starting an AND
    /// group if there is none
    pub fn filter(mut self, node: impl Into<FilterNode>) -> Self {
        match self.groups.last_mut() {
            Some(group) => group.rules.push(node.into()),
            None => self.groups.push(FilterGroup::and().with(node)),
        }
        self
    }

    /// Add a rule from its parts
    pub fn rule(self, property: impl Into<String>, operator: FilterOperator, value: impl Into<Json>) -> Self {
        self.filter(FilterRule::new(property, operator, value))
    }

    pub fn equal(self, property: impl Into<String>, value: impl Into<Json>) -> Self {
        self.filter(FilterRule::equal(property, value))
    }

    pub fn not_equal(self, property: impl Into<String>, value: impl Into<Json>) -> Self {
        self.filter(FilterRule::not_equal(property, value))
    }

    pub fn greater_than(self, property: impl Into<String>, value: impl Into<Json>) -> Self {
        self.filter(FilterRule::greater_than(property, value))
    }

    pub fn less_than(self, property: impl Into<String>, value: impl Into<Json>) -> Self {
        self.filter(FilterRule::less_than(property, value))
    }

    pub fn like(self, property: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filter(FilterRule::like(property, pattern))
    }

    pub fn between(self, property: impl Into<String>, min: impl Into<Json>, max: impl Into<Json>) -> Self {
        self.filter(FilterRule::between(property, min, max))
    }

    pub fn any(self, property: impl Into<String>) -> Self {
        self.filter(FilterRule::any(property))
    }

    pub fn not_any(self, property: impl Into<String>) -> Self {
        self.filter(FilterRule::not_any(property))
    }

    /// Compare two properties of the same entity
    pub fn compare(
        self,
        property: impl Into<String>,
        operator: FilterOperator,
        other: impl Into<String>,
    ) -> Self {
        self.filter(FilterRule::compare(property, operator, other))
    }

    // Sort methods

    /// Replace the sort order
    pub fn sort(mut self, sorts: SortOrder) -> Self {
        self.sorts = sorts;
        self
    }

    /// Sort ascending, replacing any previous sort
    pub fn sort_by_asc(mut self, property: impl Into<String>) -> Self {
        self.sorts = SortOrder::by_asc(property);
        self
    }

    /// Sort descending, replacing any previous sort
    pub fn sort_by_desc(mut self, property: impl Into<String>) -> Self {
        self.sorts = SortOrder::by_desc(property);
        self
    }

    pub fn then_by_asc(mut self, property: impl Into<String>) -> Self {
        self.sorts = self.sorts.then_asc(property);
        self
    }

    pub fn then_by_desc(mut self, property: impl Into<String>) -> Self {
        self.sorts = self.sorts.then_desc(property);
        self
    }

    /// Build the query
    pub fn build(self) -> Query {
        Query {
            name: self.name,
            filters: self.groups,
            sorts: self.sorts,
        }
    }
}
