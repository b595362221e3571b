//! `FilterMap` — ordered predicate → value lookup with first-match-wins semantics
//!
//! Modules use a filter map whenever a runtime fact selects a value: a handler
//! for a route, an allow/deny decision for an origin, a mapper for an error kind.
//!
//! Resolution is a linear scan in insertion order. Entry counts are small and the
//! insertion order *is* the semantics, so a hashed or sorted structure would be
//! wrong, not just slower.

use crate::NoMatchingEntry;
use std::fmt;

/// A single-method predicate over `F`.
///
/// Implemented for every `Fn(&F) -> bool + Send + Sync` closure, and for
/// [`StringMatcher`](crate::StringMatcher) over strings.
pub trait Filter<F: ?Sized>: Send + Sync {
    /// Returns `true` if this filter accepts `value`.
    fn accepts(&self, value: &F) -> bool;
}

impl<F: ?Sized, C> Filter<F> for C
where
    C: Fn(&F) -> bool + Send + Sync,
{
    fn accepts(&self, value: &F) -> bool {
        self(value)
    }
}

/// An immutable (filter, value) pair.
pub struct FilterMapEntry<F, T> {
    filter: Box<dyn Filter<F>>,
    value: T,
}

impl<F, T> FilterMapEntry<F, T> {
    /// Returns `true` if this entry's filter accepts `query`.
    pub fn accepts(&self, query: &F) -> bool {
        self.filter.accepts(query)
    }

    /// The value this entry resolves to.
    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<F, T: fmt::Debug> fmt::Debug for FilterMapEntry<F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterMapEntry")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

/// Single-owner builder for a [`FilterMap`].
///
/// Used once at configuration time, then consumed by [`build()`](Self::build).
///
/// ```
/// use chainer::FilterMapBuilder;
///
/// let is_accept = FilterMapBuilder::new()
///     .put(|h: &String| h.eq_ignore_ascii_case("accept"), true)
///     .put(|_: &String| true, false)
///     .build();
///
/// assert_eq!(is_accept.map(&"Accept".to_string()), Ok(&true));
/// assert_eq!(is_accept.map(&"X-Foo".to_string()), Ok(&false));
/// ```
pub struct FilterMapBuilder<F, T> {
    entries: Vec<FilterMapEntry<F, T>>,
    default_value: Option<T>,
}

impl<F, T> FilterMapBuilder<F, T> {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            default_value: None,
        }
    }

    /// Append an entry. Overlapping filters must be registered most-specific-first.
    #[must_use]
    pub fn put(mut self, filter: impl Filter<F> + 'static, value: T) -> Self {
        self.entries.push(FilterMapEntry {
            filter: Box::new(filter),
            value,
        });
        self
    }

    /// Set the value returned when no entry matches. A later call replaces an earlier one.
    #[must_use]
    pub fn set_default_value(mut self, value: T) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Number of entries appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entry was appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze the entries and default.
    #[must_use]
    pub fn build(self) -> FilterMap<F, T> {
        FilterMap {
            entries: self.entries.into_boxed_slice(),
            default_value: self.default_value,
        }
    }
}

impl<F, T> Default for FilterMapBuilder<F, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Frozen, ordered list of filter → value entries plus an optional default.
pub struct FilterMap<F, T> {
    entries: Box<[FilterMapEntry<F, T>]>,
    default_value: Option<T>,
}

impl<F, T> FilterMap<F, T> {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> FilterMapBuilder<F, T> {
        FilterMapBuilder::new()
    }

    /// Resolve `query` to the value of the first accepting entry, or the default.
    ///
    /// # Errors
    ///
    /// Returns [`NoMatchingEntry`] carrying the query when nothing accepts it and
    /// no default is configured. Whether that is fatal is the caller's decision.
    pub fn map(&self, query: &F) -> Result<&T, NoMatchingEntry<F>>
    where
        F: Clone + fmt::Debug,
    {
        self.get(query).ok_or_else(|| NoMatchingEntry {
            query: query.clone(),
        })
    }

    /// Like [`map()`](Self::map) but returns `None` instead of an error.
    pub fn get(&self, query: &F) -> Option<&T> {
        self.entries
            .iter()
            .find(|entry| entry.accepts(query))
            .map(FilterMapEntry::value)
            .or(self.default_value.as_ref())
    }

    /// The entries in resolution order.
    #[must_use]
    pub fn entries(&self) -> &[FilterMapEntry<F, T>] {
        &self.entries
    }

    /// The configured default, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&T> {
        self.default_value.as_ref()
    }

    /// Returns `true` if a default is configured.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }

    /// Number of entries (excluding the default).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F, T: fmt::Debug> fmt::Debug for FilterMap<F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterMap")
            .field("entries", &self.entries)
            .field("default_value", &self.default_value)
            .finish()
    }
}
