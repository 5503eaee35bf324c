//! # pq-queries
//!
//! Filter and sort compilation over in-memory entities.
//!
//! A declarative [`FilterGroup`] tree is compiled once into a [`Predicate`];
//! a list of [`SortRule`]s is compiled into a [`Comparator`]. Compilation
//! resolves every property path against the entity's [`Schema`] and coerces
//! every literal, so all errors surface up front and evaluation is a plain
//! closure call.
//!
//! ## Structure
//!
//! - `filters` - Filter rules, groups and operators (the wire model)
//! - `sorts` - Sort rules and directions
//! - `schema` - Entity schemas used in place of reflection
//! - `path` - Property path parsing and accessor construction
//! - `coerce` - Literal coercion into property types
//! - `evaluate` - Per-rule compilation
//! - `compile` - Group and multi-group composition
//! - `sorting` - Sort compilation
//! - `query` - The Query model bundling filters and sorts
//! - `builder` - Fluent API for constructing queries
//!
//! ## Example
//!
//! ```
//! use once_cell::sync::Lazy;
//! use pq_core::{Value, ValueType};
//! use pq_queries::{compile, CompileOptions, Entity, FilterGroup, FilterRule, Schema};
//!
//! struct Person {
//!     name: String,
//!     age: i32,
//! }
//!
//! impl Entity for Person {
//!     fn schema() -> &'static Schema<Self> {
//!         static SCHEMA: Lazy<Schema<Person>> = Lazy::new(|| {
//!             Schema::<Person>::new("Person")
//!                 .value("name", ValueType::String, |p| Value::from(&p.name))
//!                 .value("age", ValueType::Int32, |p| Value::from(p.age))
//!         });
//!         &SCHEMA
//!     }
//! }
//!
//! let group = FilterGroup::and()
//!     .with(FilterRule::greater_than("age", 18))
//!     .with(FilterRule::like("name", "A%"));
//! let predicate = compile::<Person>(&group, &CompileOptions::default()).unwrap();
//!
//! assert!(predicate.matches(&Person { name: "Alice".into(), age: 30 }));
//! assert!(!predicate.matches(&Person { name: "Bob".into(), age: 40 }));
//! ```

pub mod filters;
pub mod sorts;
pub mod schema;
pub mod path;
pub mod coerce;
pub mod predicate;
pub mod evaluate;
pub mod compile;
pub mod sorting;
pub mod query;
pub mod builder;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use filters::{FilterGroup, FilterNode, FilterOperator, FilterRule, LogicalOperator};
pub use sorts::{SortDirection, SortOrder, SortRule};
pub use schema::{Entity, Schema};
pub use predicate::Predicate;
pub use compile::{compile, compile_groups, CompileOptions};
pub use sorting::{compile_sort, partition_sort_rules, Comparator, SortOptions};
pub use query::{CompiledQuery, Query};
pub use builder::QueryBuilder;
