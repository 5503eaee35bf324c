//! Group Composition
//!
//! Entry points that turn a [`FilterGroup`] tree, or an ordered sequence of
//! groups, into a single [`Predicate`].

use pq_core::{CompilerConfig, QueryResult, StringComparison};
use std::collections::HashSet;
use tracing::{debug, instrument};

use crate::evaluate::compile_rule;
use crate::filters::{FilterGroup, FilterNode, LogicalOperator};
use crate::path::PathCache;
use crate::predicate::Predicate;
use crate::schema::Entity;

/// Per-call compile options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileOptions {
    /// When set, rules on properties outside this set compile to `true`
    pub allowed_fields: Option<HashSet<String>>,
    pub string_comparison: StringComparison,
}

impl CompileOptions {
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            allowed_fields: None,
            string_comparison: config.string_comparison,
        }
    }

    pub fn with_allowed_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_string_comparison(mut self, mode: StringComparison) -> Self {
        self.string_comparison = mode;
        self
    }

    /// Whether a rule on `property` takes part in filtering
    pub fn allows(&self, property: &str) -> bool {
        self.allowed_fields
            .as_ref()
            .map_or(true, |fields| fields.contains(property))
    }
}

/// Compile a filter group into a predicate
#[instrument(skip_all, fields(entity = T::schema().name()))]
pub fn compile<T: Entity>(group: &FilterGroup, options: &CompileOptions) -> QueryResult<Predicate<T>> {
    let mut paths = PathCache::new();
    let predicate = compile_deduplicated(group, &mut paths, options)?;
    debug!(rules = group.rule_count(), paths = paths.len(), "Compiled filter group");
    Ok(predicate)
}

/// Compile an ordered sequence of groups. Each group's `inter_operator`
/// joins it to the next one; the fold runs left to right.
#[instrument(skip_all, fields(entity = T::schema().name(), groups = groups.len()))]
pub fn compile_groups<T: Entity>(
    groups: &[FilterGroup],
    options: &CompileOptions,
) -> QueryResult<Predicate<T>> {
    let mut paths = PathCache::new();
    let mut folded: Option<(Predicate<T>, LogicalOperator)> = None;

    for group in groups {
        let next = compile_deduplicated(group, &mut paths, options)?;
        folded = Some(match folded {
            None => (next, group.inter_operator),
            Some((acc, LogicalOperator::And)) => (acc.and(next), group.inter_operator),
            Some((acc, LogicalOperator::Or)) => (acc.or(next), group.inter_operator),
        });
    }

    debug!(paths = paths.len(), "Compiled filter groups");
    Ok(folded.map_or_else(|| Predicate::constant(true), |(predicate, _)| predicate))
}

fn compile_deduplicated<T: Entity>(
    group: &FilterGroup,
    paths: &mut PathCache<T>,
    options: &CompileOptions,
) -> QueryResult<Predicate<T>> {
    let deduplicated = group.deduplicated();
    let removed = group.rule_count().saturating_sub(deduplicated.rule_count());
    if removed > 0 {
        debug!(removed, "Removed duplicate filter nodes");
    }
    compile_group(&deduplicated, paths, options)
}

fn compile_group<T: Entity>(
    group: &FilterGroup,
    paths: &mut PathCache<T>,
    options: &CompileOptions,
) -> QueryResult<Predicate<T>> {
    let children = group
        .rules
        .iter()
        .map(|node| match node {
            FilterNode::Rule(rule) => compile_rule(rule, paths, options),
            FilterNode::Group(inner) => compile_group(inner, paths, options),
        })
        .collect::<QueryResult<Vec<_>>>()?;

    let combined = if children.is_empty() {
        Predicate::constant(true)
    } else {
        match group.logical_operator {
            LogicalOperator::And => Predicate::all(children),
            LogicalOperator::Or => Predicate::any(children),
        }
    };

    Ok(if group.is_negated { combined.not() } else { combined })
}
