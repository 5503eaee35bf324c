//! Property Path Resolution
//!
//! Turns a path such as `customer.address.city` or `orders[].lines[].sku`
//! into an [`Accessor`] built once against the entity's schema. Relation
//! steps are null-guarded, `seg[]` steps collect the remainder of the path
//! over every element of the collection.

use pq_core::{QueryError, QueryResult, Value, ValueType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::schema::{Entity, FieldKind, Getter, ManyGetter, OneGetter, Schema};

/// Suffix marking a collection step
pub const COLLECTION_MARKER: &str = "[]";

/// One step of a property path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'p> {
    pub name: &'p str,
    /// Marked with `[]`
    pub many: bool,
}

/// Split a path into segments
pub fn parse_path(path: &str) -> QueryResult<Vec<Segment<'_>>> {
    if path.is_empty() {
        return Err(QueryError::path(path, "path is empty"));
    }

    path.split('.')
        .map(|raw| {
            let (name, many) = match raw.strip_suffix(COLLECTION_MARKER) {
                Some(name) => (name, true),
                None => (raw, false),
            };
            if name.is_empty() {
                return Err(QueryError::path(path, "empty segment"));
            }
            if name.contains(['[', ']']) {
                return Err(QueryError::path(
                    path,
                    format!("malformed collection marker in '{}'", raw),
                ));
            }
            Ok(Segment { name, many })
        })
        .collect()
}

type GuardedFn<T> = dyn for<'a> Fn(&'a T) -> Value<'a> + Send + Sync;
type QuantifiedFn<T> = dyn for<'a> Fn(&'a T, &mut Vec<Value<'a>>) + Send + Sync;

/// Compiled read access to a property
pub enum Accessor<T: 'static> {
    /// Direct field read
    Member(Getter<T>),
    /// Read through one or more optional relations; yields `Null` when any
    /// intermediate entity is missing
    Guarded(Arc<GuardedFn<T>>),
    /// Read through a collection; yields the value for every element
    Quantified(Arc<QuantifiedFn<T>>),
}

impl<T: 'static> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Member(get) => Self::Member(*get),
            Self::Guarded(f) => Self::Guarded(Arc::clone(f)),
            Self::Quantified(f) => Self::Quantified(Arc::clone(f)),
        }
    }
}

impl<T: 'static> fmt::Debug for Accessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member(_) => f.write_str("Member"),
            Self::Guarded(_) => f.write_str("Guarded"),
            Self::Quantified(_) => f.write_str("Quantified"),
        }
    }
}

impl<T: 'static> Accessor<T> {
    pub fn guarded<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> Value<'a> + Send + Sync + 'static,
    {
        Self::Guarded(Arc::new(f))
    }

    pub fn quantified<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a T, &mut Vec<Value<'a>>) + Send + Sync + 'static,
    {
        Self::Quantified(Arc::new(f))
    }

    pub fn is_quantified(&self) -> bool {
        matches!(self, Self::Quantified(_))
    }

    /// Read the property. A quantified accessor yields a list with one entry
    /// per reached element.
    pub fn read<'a>(&self, entity: &'a T) -> Value<'a> {
        match self {
            Self::Member(get) => get(entity),
            Self::Guarded(f) => f(entity),
            Self::Quantified(f) => {
                let mut out = Vec::new();
                f(entity, &mut out);
                Value::List(out)
            }
        }
    }

    /// Append the value, or every quantified value, to `out`
    pub fn collect_into<'a>(&self, entity: &'a T, out: &mut Vec<Value<'a>>) {
        match self {
            Self::Member(get) => out.push(get(entity)),
            Self::Guarded(f) => out.push(f(entity)),
            Self::Quantified(f) => f(entity, out),
        }
    }

    /// Lift to a parent type through an optional single relation
    pub fn through_one<P: 'static>(self, get: OneGetter<P, T>) -> Accessor<P> {
        match self {
            Self::Quantified(inner) => Accessor::quantified(move |p: &P, out| {
                if let Some(t) = get(p) {
                    inner(t, out);
                }
            }),
            single => Accessor::guarded(move |p: &P| match get(p) {
                Some(t) => single.read(t),
                None => Value::Null,
            }),
        }
    }

    /// Lift to a parent type through a collection relation
    pub fn through_many<P: 'static>(self, get: ManyGetter<P, T>) -> Accessor<P> {
        Accessor::quantified(move |p: &P, out| {
            for t in get(p).unwrap_or_default() {
                self.collect_into(t, out);
            }
        })
    }
}

/// A resolved path: the static type of the leaf and how to read it
pub struct Resolved<T: 'static> {
    pub ty: ValueType,
    pub accessor: Accessor<T>,
}

impl<T: 'static> fmt::Debug for Resolved<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("ty", &self.ty)
            .field("accessor", &self.accessor)
            .finish()
    }
}

impl<T: 'static> Clone for Resolved<T> {
    fn clone(&self) -> Self {
        Self {
            ty: self.ty.clone(),
            accessor: self.accessor.clone(),
        }
    }
}

impl<T: 'static> Resolved<T> {
    pub fn new(ty: ValueType, accessor: Accessor<T>) -> Self {
        Self { ty, accessor }
    }

    /// The path reaches its leaf through a collection step
    pub fn is_quantified(&self) -> bool {
        self.accessor.is_quantified()
    }

    /// The leaf itself is a collection
    pub fn is_collection(&self) -> bool {
        self.ty.is_collection()
    }

    pub fn through_one<P: 'static>(self, get: OneGetter<P, T>) -> Resolved<P> {
        Resolved::new(self.ty, self.accessor.through_one(get))
    }

    pub fn through_many<P: 'static>(self, get: ManyGetter<P, T>) -> Resolved<P> {
        Resolved::new(self.ty, self.accessor.through_many(get))
    }
}

/// Resolve a property path against an entity type
pub fn resolve<T: Entity>(path: &str) -> QueryResult<Resolved<T>> {
    let segments = parse_path(path)?;
    resolve_segments(T::schema(), &segments, path)
}

/// Per-compilation cache so a path used by several rules resolves once
pub struct PathCache<T: 'static> {
    resolved: HashMap<String, Resolved<T>>,
}

impl<T: Entity> PathCache<T> {
    pub fn new() -> Self {
        Self {
            resolved: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, path: &str) -> QueryResult<Resolved<T>> {
        if let Some(hit) = self.resolved.get(path) {
            return Ok(hit.clone());
        }
        let resolved = resolve::<T>(path)?;
        self.resolved.insert(path.to_string(), resolved.clone());
        Ok(resolved)
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

impl<T: Entity> Default for PathCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve already-split segments against a schema
pub fn resolve_segments<T: 'static>(
    schema: &Schema<T>,
    segments: &[Segment<'_>],
    path: &str,
) -> QueryResult<Resolved<T>> {
    let (segment, rest) = segments
        .split_first()
        .ok_or_else(|| QueryError::path(path, "path is empty"))?;

    let field = schema.field(segment.name).ok_or_else(|| {
        QueryError::path(
            path,
            format!("unknown member '{}' on {}", segment.name, schema.name()),
        )
    })?;

    match field.kind() {
        FieldKind::Relation(relation) => relation.resolve(segment, rest, path),
        FieldKind::Value { ty, get } => {
            if segment.many {
                let reason = if ty.is_collection() {
                    format!("'{}[]' must be followed by a member", segment.name)
                } else {
                    format!("'{}' is not a collection", segment.name)
                };
                return Err(QueryError::path(path, reason));
            }
            if let Some(next) = rest.first() {
                return Err(QueryError::path(
                    path,
                    format!("cannot read '{}' from {} member '{}'", next.name, ty, segment.name),
                ));
            }
            Ok(Resolved::new(ty.clone(), Accessor::Member(*get)))
        }
    }
}
