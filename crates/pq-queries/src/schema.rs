//! Entity Schemas
//!
//! An entity type opts into filtering by describing its fields once, in a
//! `'static` [`Schema`]. Value fields carry a [`ValueType`] and a plain
//! getter; relation fields point at another entity type and are traversed
//! with null guards (`has_one`) or quantification (`has_many`).
//!
//! ```
//! use once_cell::sync::Lazy;
//! use pq_core::{Value, ValueType};
//! use pq_queries::schema::{Entity, Schema};
//!
//! struct Tag {
//!     label: String,
//! }
//!
//! struct Article {
//!     title: String,
//!     tags: Vec<Tag>,
//! }
//!
//! impl Entity for Tag {
//!     fn schema() -> &'static Schema<Self> {
//!         static SCHEMA: Lazy<Schema<Tag>> = Lazy::new(|| {
//!             Schema::<Tag>::new("Tag").value("label", ValueType::String, |t| Value::from(&t.label))
//!         });
//!         &SCHEMA
//!     }
//! }
//!
//! impl Entity for Article {
//!     fn schema() -> &'static Schema<Self> {
//!         static SCHEMA: Lazy<Schema<Article>> = Lazy::new(|| {
//!             Schema::<Article>::new("Article")
//!                 .value("title", ValueType::String, |a| Value::from(&a.title))
//!                 .has_many("tags", |a| Some(a.tags.as_slice()))
//!         });
//!         &SCHEMA
//!     }
//! }
//!
//! assert!(Article::schema().field("tags").is_some());
//! ```

use pq_core::{QueryError, QueryResult, Value, ValueType};

use crate::path::{self, Accessor, Resolved, Segment};

/// Reads a value field from an entity
pub type Getter<T> = for<'a> fn(&'a T) -> Value<'a>;

/// Reads an optional related entity
pub type OneGetter<T, U> = for<'a> fn(&'a T) -> Option<&'a U>;

/// Reads an optional collection of related entities
pub type ManyGetter<T, U> = for<'a> fn(&'a T) -> Option<&'a [U]>;

/// A type whose instances can be filtered and sorted by property path
pub trait Entity: Sized + Send + Sync + 'static {
    fn schema() -> &'static Schema<Self>;
}

/// Field table of an entity type
pub struct Schema<T: 'static> {
    name: &'static str,
    fields: Vec<Field<T>>,
}

/// A named field of an entity
pub struct Field<T: 'static> {
    name: &'static str,
    kind: FieldKind<T>,
}

pub enum FieldKind<T: 'static> {
    /// Scalar or scalar collection read by a getter
    Value { ty: ValueType, get: Getter<T> },
    /// Navigation to another entity type
    Relation(Box<dyn Relation<T>>),
}

impl<T: 'static> Schema<T> {
    /// Create a new empty schema
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: vec![],
        }
    }

    /// Add a value field
    pub fn value(mut self, name: &'static str, ty: ValueType, get: Getter<T>) -> Self {
        self.fields.push(Field {
            name,
            kind: FieldKind::Value { ty, get },
        });
        self
    }

    /// Add a navigation to a single, optional related entity
    pub fn has_one<U: Entity>(mut self, name: &'static str, get: OneGetter<T, U>) -> Self {
        self.fields.push(Field {
            name,
            kind: FieldKind::Relation(Box::new(HasOne { get })),
        });
        self
    }

    /// Add a navigation to a collection of related entities
    pub fn has_many<U: Entity>(mut self, name: &'static str, get: ManyGetter<T, U>) -> Self {
        self.fields.push(Field {
            name,
            kind: FieldKind::Relation(Box::new(HasMany { get })),
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Field<T>> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl<T: 'static> Field<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> &FieldKind<T> {
        &self.kind
    }
}

/// Type-erased navigation from `T` to a related entity type.
///
/// Implementations know the target type statically, which lets the resolver
/// continue a path through it without runtime type lookups.
pub trait Relation<T>: Send + Sync {
    /// Name of the target schema
    fn target(&self) -> &'static str;

    /// Resolve the remaining segments against the target type and lift the
    /// result back to `T`. `segment` is the segment naming this relation.
    fn resolve(&self, segment: &Segment<'_>, rest: &[Segment<'_>], path: &str) -> QueryResult<Resolved<T>>;
}

struct HasOne<T: 'static, U: 'static> {
    get: OneGetter<T, U>,
}

impl<T: 'static, U: Entity> Relation<T> for HasOne<T, U> {
    fn target(&self) -> &'static str {
        U::schema().name()
    }

    fn resolve(&self, segment: &Segment<'_>, rest: &[Segment<'_>], path: &str) -> QueryResult<Resolved<T>> {
        if segment.many {
            return Err(QueryError::path(
                path,
                format!("'{}' is not a collection", segment.name),
            ));
        }

        let get = self.get;
        if rest.is_empty() {
            return Ok(Resolved::new(
                ValueType::Record(self.target()),
                Accessor::guarded(move |t: &T| match get(t) {
                    Some(_) => Value::Record,
                    None => Value::Null,
                }),
            ));
        }

        let inner = path::resolve_segments(U::schema(), rest, path)?;
        Ok(inner.through_one(get))
    }
}

struct HasMany<T: 'static, U: 'static> {
    get: ManyGetter<T, U>,
}

impl<T: 'static, U: Entity> Relation<T> for HasMany<T, U> {
    fn target(&self) -> &'static str {
        U::schema().name()
    }

    fn resolve(&self, segment: &Segment<'_>, rest: &[Segment<'_>], path: &str) -> QueryResult<Resolved<T>> {
        let get = self.get;
        match (segment.many, rest.is_empty()) {
            (true, true) => Err(QueryError::path(
                path,
                format!("'{}[]' must be followed by a member", segment.name),
            )),
            (false, true) => Ok(Resolved::new(
                ValueType::list(ValueType::Record(self.target())),
                Accessor::guarded(move |t: &T| match get(t) {
                    Some(items) => Value::List(vec![Value::Record; items.len()]),
                    None => Value::Null,
                }),
            )),
            (false, false) => Err(QueryError::path(
                path,
                format!(
                    "'{}' is a collection; use '{}[]' to reach its members",
                    segment.name, segment.name
                ),
            )),
            (true, false) => {
                let inner = path::resolve_segments(U::schema(), rest, path)?;
                Ok(inner.through_many(get))
            }
        }
    }
}
