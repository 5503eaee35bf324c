//! # pq-core
//!
//! Core types, errors, and configuration shared by the predicate query crates.
//!
//! This crate provides the foundational building blocks:
//! - The compile-time error taxonomy (`QueryError`)
//! - Result type aliases
//! - The dynamic value model (`Value`, `ValueType`, `EnumDef`)
//! - Compiler configuration

pub mod error;
pub mod result;
pub mod types;
pub mod config;

pub use error::*;
pub use result::*;
pub use types::*;
pub use config::{CollectionAggregate, CompilerConfig, ConfigError, StringComparison};
