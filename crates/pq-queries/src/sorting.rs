//! Sort Compilation
//!
//! Turns a list of [`SortRule`]s into a [`Comparator`]. Each rule becomes a
//! key extractor; keys are compared in order with a total order in which
//! nulls sort before any value.

use pq_core::{CollectionAggregate, CompilerConfig, QueryError, QueryResult, Value, ValueType};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::path::{Accessor, PathCache, Resolved};
use crate::schema::Entity;
use crate::sorts::SortRule;

/// Per-call sort options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortOptions {
    /// Drop collection sort rules that have no aggregate instead of failing
    pub skip_collection_paths: bool,
    /// Reduction applied to collection sort rules
    pub collection_aggregate: Option<CollectionAggregate>,
}

impl SortOptions {
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            skip_collection_paths: config.skip_collection_paths,
            collection_aggregate: config.collection_aggregate,
        }
    }

    pub fn skipping_collection_paths(mut self) -> Self {
        self.skip_collection_paths = true;
        self
    }

    pub fn with_aggregate(mut self, aggregate: CollectionAggregate) -> Self {
        self.collection_aggregate = Some(aggregate);
        self
    }
}

type KeyFn<T> = dyn for<'a> Fn(&'a T) -> Value<'a> + Send + Sync;

fn key_fn<T, F>(f: F) -> Arc<KeyFn<T>>
where
    F: for<'a> Fn(&'a T) -> Value<'a> + Send + Sync + 'static,
{
    Arc::new(f)
}

struct SortKey<T: 'static> {
    rule: SortRule,
    extract: Arc<KeyFn<T>>,
}

/// Compiled multi-key ordering over entities of type `T`
pub struct Comparator<T: 'static> {
    keys: Arc<Vec<SortKey<T>>>,
}

impl<T: 'static> Clone for Comparator<T> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
        }
    }
}

impl<T: 'static> fmt::Debug for Comparator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparator")
            .field("keys", &self.directives())
            .finish()
    }
}

impl<T: 'static> Comparator<T> {
    /// Comparator that considers every pair equal
    pub fn unordered() -> Self {
        Self {
            keys: Arc::new(vec![]),
        }
    }

    /// Compare two entities key by key
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        for key in self.keys.iter() {
            let ordering = (key.extract)(a).sort_cmp(&(key.extract)(b));
            let ordering = if key.rule.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Stable in-place sort
    pub fn sort(&self, items: &mut [T]) {
        items.sort_by(|a, b| self.compare(a, b));
    }

    /// Stable sort of borrowed entities
    pub fn sorted<'a, I>(&self, items: I) -> Vec<&'a T>
    where
        I: IntoIterator<Item = &'a T>,
    {
        let mut items: Vec<&'a T> = items.into_iter().collect();
        items.sort_by(|a, b| self.compare(a, b));
        items
    }

    /// The rules that ended up as keys, in precedence order
    pub fn directives(&self) -> Vec<SortRule> {
        self.keys.iter().map(|key| key.rule.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Compile sort rules into a comparator
#[instrument(skip_all, fields(entity = T::schema().name(), rules = rules.len()))]
pub fn compile_sort<T: Entity>(rules: &[SortRule], options: &SortOptions) -> QueryResult<Comparator<T>> {
    let mut paths = PathCache::<T>::new();
    let mut keys = Vec::with_capacity(rules.len());

    for rule in rules {
        let resolved = paths.resolve(&rule.property)?;
        let collection = needs_aggregate(rule, &resolved)?;

        let accessor = resolved.accessor.clone();
        let extract = if collection {
            match options.collection_aggregate {
                Some(aggregate) => key_fn(move |t: &T| aggregated(&accessor, aggregate, t)),
                None if options.skip_collection_paths => {
                    debug!(property = %rule.property, "Skipping collection sort rule");
                    continue;
                }
                None => {
                    return Err(QueryError::CollectionSortAmbiguity {
                        path: rule.property.clone(),
                    })
                }
            }
        } else {
            key_fn(move |t: &T| accessor.read(t))
        };

        keys.push(SortKey {
            rule: rule.clone(),
            extract,
        });
    }

    debug!(keys = keys.len(), "Compiled sort rules");
    Ok(Comparator {
        keys: Arc::new(keys),
    })
}

/// Split rules into those usable directly as keys and those that need a
/// collection aggregate. Relative order is preserved in both halves.
///
/// Rules are classified by their resolved type, the same way
/// [`compile_sort`] does, so the first half always compiles without an
/// aggregate.
pub fn partition_sort_rules<T: Entity>(rules: &[SortRule]) -> QueryResult<(Vec<SortRule>, Vec<SortRule>)> {
    let mut paths = PathCache::<T>::new();
    let mut direct = Vec::new();
    let mut collection = Vec::new();

    for rule in rules {
        let resolved = paths.resolve(&rule.property)?;
        if needs_aggregate(rule, &resolved)? {
            collection.push(rule.clone());
        } else {
            direct.push(rule.clone());
        }
    }
    Ok((direct, collection))
}

/// Whether a sort path reaches more than one value per entity
fn needs_aggregate<T: 'static>(rule: &SortRule, resolved: &Resolved<T>) -> QueryResult<bool> {
    let leaf = resolved.ty.element().unwrap_or(&resolved.ty);
    if matches!(leaf, ValueType::Record(_)) {
        return Err(QueryError::unsupported("Sort", &rule.property, &resolved.ty));
    }
    Ok(resolved.is_quantified() || resolved.is_collection())
}

/// Reduce every value reached by `accessor` to one sort key
fn aggregated<'a, T: 'static>(accessor: &Accessor<T>, aggregate: CollectionAggregate, entity: &'a T) -> Value<'a> {
    let mut reached = Vec::new();
    accessor.collect_into(entity, &mut reached);

    let mut values = Vec::with_capacity(reached.len());
    flatten(reached, &mut values);

    match aggregate {
        CollectionAggregate::First => values.into_iter().next().unwrap_or(Value::Null),
        CollectionAggregate::Min => values
            .into_iter()
            .filter(|v| !v.is_null())
            .min_by(|a, b| a.sort_cmp(b))
            .unwrap_or(Value::Null),
        CollectionAggregate::Max => values
            .into_iter()
            .filter(|v| !v.is_null())
            .max_by(|a, b| a.sort_cmp(b))
            .unwrap_or(Value::Null),
    }
}

fn flatten<'a>(values: Vec<Value<'a>>, out: &mut Vec<Value<'a>>) {
    for value in values {
        match value {
            Value::List(items) => flatten(items, out),
            other => out.push(other),
        }
    }
}
