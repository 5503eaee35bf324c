//! Compiled Predicates

use std::fmt;
use std::sync::Arc;

type PredicateFn<T> = dyn Fn(&T) -> bool + Send + Sync;

/// A compiled boolean test over entities of type `T`.
///
/// Cheap to clone and safe to share across threads; it only closes over
/// values computed at compile time.
pub struct Predicate<T> {
    inner: Arc<PredicateFn<T>>,
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate { .. }")
    }
}

impl<T: 'static> Predicate<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// A predicate that ignores its input
    pub fn constant(value: bool) -> Self {
        Self::new(move |_| value)
    }

    /// Evaluate against one entity
    pub fn matches(&self, entity: &T) -> bool {
        (self.inner)(entity)
    }

    /// Keep only the entities that match
    pub fn filter<'a, I>(&'a self, items: I) -> impl Iterator<Item = &'a T> + 'a
    where
        I: IntoIterator<Item = &'a T>,
        I::IntoIter: 'a,
    {
        items.into_iter().filter(move |item| self.matches(item))
    }

    /// Logical NOT
    pub fn not(self) -> Self {
        let inner = self.inner;
        Self::new(move |t| !inner(t))
    }

    /// Logical AND
    pub fn and(self, other: Predicate<T>) -> Self {
        let (a, b) = (self.inner, other.inner);
        Self::new(move |t| a(t) && b(t))
    }

    /// Logical OR
    pub fn or(self, other: Predicate<T>) -> Self {
        let (a, b) = (self.inner, other.inner);
        Self::new(move |t| a(t) || b(t))
    }

    /// True when every predicate matches; true for an empty list
    pub fn all(predicates: Vec<Predicate<T>>) -> Self {
        match predicates.len() {
            0 => Self::constant(true),
            1 => predicates.into_iter().next().unwrap_or_else(|| Self::constant(true)),
            _ => Self::new(move |t| predicates.iter().all(|p| p.matches(t))),
        }
    }

    /// True when any predicate matches; false for an empty list
    pub fn any(predicates: Vec<Predicate<T>>) -> Self {
        match predicates.len() {
            0 => Self::constant(false),
            1 => predicates.into_iter().next().unwrap_or_else(|| Self::constant(false)),
            _ => Self::new(move |t| predicates.iter().any(|p| p.matches(t))),
        }
    }
}
