//! Condition — Boolean expressions over a [`MetaData`] context
//!
//! Every [`Rule`](crate::Rule) is guarded by a `Condition`. Leaves are [`Check`]s,
//! which can be composed with AND/OR/NOT.
//!
//! # INV: absent → false
//!
//! A keyed check whose key holds no value evaluates to `false`. Evaluating a
//! condition never fails, so a rule can never abort a run on its own.

use crate::{ConfigError, Filter, MetaData, MetaDataKey, MAX_CONDITION_DEPTH};
use std::fmt;

/// A leaf test over the context.
pub trait Check: Send + Sync {
    /// Evaluate against the context.
    fn check(&self, meta_data: &MetaData) -> bool;

    /// Human-readable description for dumps and traces.
    fn describe(&self) -> String;
}

/// Tests the value under one key with a [`Filter`].
pub struct KeyCheck<T> {
    key: MetaDataKey<T>,
    filter: Box<dyn Filter<T>>,
    description: String,
}

impl<T: 'static> KeyCheck<T> {
    /// Create a check on `key`, described by `description`.
    pub fn new(
        key: &MetaDataKey<T>,
        filter: impl Filter<T> + 'static,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.clone(),
            filter: Box::new(filter),
            description: description.into(),
        }
    }
}

impl<T: 'static> Check for KeyCheck<T> {
    fn check(&self, meta_data: &MetaData) -> bool {
        meta_data
            .get_optional(&self.key)
            .is_some_and(|value| self.filter.accepts(value))
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Tests whether a key holds any value.
pub struct PresentCheck<T> {
    key: MetaDataKey<T>,
}

impl<T: 'static> Check for PresentCheck<T> {
    fn check(&self, meta_data: &MetaData) -> bool {
        meta_data.contains(&self.key)
    }

    fn describe(&self) -> String {
        format!("{} is set", self.key.name())
    }
}

/// Closure-backed check over the whole context.
pub struct FnCheck<C> {
    description: String,
    check: C,
}

impl<C> Check for FnCheck<C>
where
    C: Fn(&MetaData) -> bool + Send + Sync,
{
    fn check(&self, meta_data: &MetaData) -> bool {
        (self.check)(meta_data)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Composite condition with boolean logic. Evaluation short-circuits.
pub enum Condition {
    /// Always true.
    Always,
    /// A leaf check.
    Check(Box<dyn Check>),
    /// All children must hold. Empty `And` is true.
    And(Vec<Condition>),
    /// Any child must hold. Empty `Or` is false.
    Or(Vec<Condition>),
    /// Inverts the inner condition.
    Not(Box<Condition>),
}

impl Condition {
    /// Wrap a leaf check.
    pub fn check(check: impl Check + 'static) -> Self {
        Self::Check(Box::new(check))
    }

    /// Test the value under `key`; absent values never match.
    ///
    /// ```
    /// use chainer::{Condition, MetaData, MetaDataKey};
    ///
    /// let path = MetaDataKey::<String>::new("request.path");
    /// let internals = Condition::key(&path, |p: &String| p == "/internals", "path == /internals");
    ///
    /// let mut md = MetaData::new();
    /// assert!(!internals.evaluate(&md));
    /// md.set(&path, "/internals".into());
    /// assert!(internals.evaluate(&md));
    /// ```
    pub fn key<T: 'static>(
        key: &MetaDataKey<T>,
        filter: impl Filter<T> + 'static,
        description: impl Into<String>,
    ) -> Self {
        Self::check(KeyCheck::new(key, filter, description))
    }

    /// True when `key` holds a value.
    pub fn present<T: 'static>(key: &MetaDataKey<T>) -> Self {
        Self::check(PresentCheck { key: key.clone() })
    }

    /// True when `key` holds no value.
    pub fn absent<T: 'static>(key: &MetaDataKey<T>) -> Self {
        Self::Not(Box::new(Self::present(key)))
    }

    /// Closure over the whole context.
    pub fn from_fn<C>(description: impl Into<String>, check: C) -> Self
    where
        C: Fn(&MetaData) -> bool + Send + Sync + 'static,
    {
        Self::check(FnCheck {
            description: description.into(),
            check,
        })
    }

    /// Logical negation.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluate against the context.
    pub fn evaluate(&self, meta_data: &MetaData) -> bool {
        match self {
            Self::Always => true,
            Self::Check(check) => check.check(meta_data),
            Self::And(children) => children.iter().all(|c| c.evaluate(meta_data)),
            Self::Or(children) => children.iter().any(|c| c.evaluate(meta_data)),
            Self::Not(inner) => !inner.evaluate(meta_data),
        }
    }

    /// Depth of the condition tree.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Always | Self::Check(_) => 1,
            Self::And(cs) | Self::Or(cs) => 1 + cs.iter().map(Self::depth).max().unwrap_or(0),
            Self::Not(inner) => 1 + inner.depth(),
        }
    }

    /// Check the nesting limit.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DepthExceeded`] past [`MAX_CONDITION_DEPTH`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let depth = self.depth();
        if depth > MAX_CONDITION_DEPTH {
            return Err(ConfigError::DepthExceeded {
                depth,
                max: MAX_CONDITION_DEPTH,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, cs: &[Condition], op: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, c) in cs.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{c}")?;
            }
            f.write_str(")")
        }

        match self {
            Self::Always => f.write_str("always"),
            Self::Check(check) => f.write_str(&check.describe()),
            Self::And(cs) => join(f, cs, "and"),
            Self::Or(cs) => join(f, cs, "or"),
            Self::Not(inner) => write!(f, "not {inner}"),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Condition({self})")
    }
}
