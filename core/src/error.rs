//! Error taxonomy for the pipeline engine.
//!
//! Two families, split by *when* they can happen:
//!
//! - [`ConfigError`]: raised while modules register chains, processors, rules and
//!   dependencies. Fix the configuration and rebuild the registry.
//! - [`PipelineError`]: raised while a single unit of work runs through the chain
//!   graph. Always fatal to that run; the caller of
//!   [`ChainRegistry::run`](crate::ChainRegistry::run) decides how to surface it.
//!
//! [`NoMatchingEntry`] is neither: it is returned by
//! [`FilterMap::map`](crate::FilterMap::map) and the calling module decides whether
//! "nothing matched" is an error.

use crate::ChainName;
use std::fmt::Debug;
use thiserror::Error;

/// Boxed error produced by a failing processor.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A processor required a context key that no earlier step populated.
///
/// This is always a pipeline ordering bug, never a recoverable runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no value for meta data key \"{key}\"; an earlier step was expected to set it")]
pub struct MissingContextValue {
    /// Display name of the offending key.
    pub key: String,
}

/// No filter accepted the query and the filter map has no default value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no filter map entry accepts {query:?} and no default value is configured")]
pub struct NoMatchingEntry<F: Debug> {
    /// The value that was looked up.
    pub query: F,
}

/// Failures that abort a single run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// See [`MissingContextValue`].
    #[error(transparent)]
    MissingContextValue(#[from] MissingContextValue),

    /// A start chain or jump target is not registered.
    #[error("chain \"{chain}\" is not registered")]
    ChainNotFound {
        /// The chain that was referenced.
        chain: ChainName,
    },

    /// A processor signalled a failure of its own.
    #[error("processor \"{processor}\" failed: {source}")]
    Processor {
        /// Name of the failing processor.
        processor: String,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    /// Wrap an arbitrary failure raised by the named processor.
    pub fn processor(processor: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Processor {
            processor: processor.into(),
            source: source.into(),
        }
    }

    /// Returns `true` for [`PipelineError::ChainNotFound`].
    #[must_use]
    pub fn is_chain_not_found(&self) -> bool {
        matches!(self, Self::ChainNotFound { .. })
    }

    /// Returns `true` for [`PipelineError::MissingContextValue`].
    #[must_use]
    pub fn is_missing_context_value(&self) -> bool {
        matches!(self, Self::MissingContextValue(_))
    }
}

/// Errors from registry construction and config loading.
///
/// Caught while the registry is being assembled, never while requests are served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `create_chain` was called twice for the same name.
    #[error("chain \"{chain}\" is already registered")]
    DuplicateChain {
        /// The chain name.
        chain: ChainName,
    },

    /// A processor, rule or default action was attached to a chain that was never created.
    #[error("chain \"{chain}\" has not been created; call create_chain first")]
    UnknownChain {
        /// The chain name.
        chain: ChainName,
    },

    /// A rule or default action jumps to a chain that was never created.
    ///
    /// Only reported by [`ChainRegistry::validate`](crate::ChainRegistry::validate).
    #[error("chain \"{chain}\" jumps to unregistered chain \"{target}\"")]
    DanglingJump {
        /// The chain holding the jump.
        chain: ChainName,
        /// The missing target.
        target: ChainName,
    },

    /// A dependency name was registered twice.
    #[error("dependency \"{name}\" is already registered")]
    DuplicateDependency {
        /// The dependency name.
        name: String,
    },

    /// A module asked for a dependency nobody provided.
    #[error("dependency \"{name}\" is not registered")]
    MissingDependency {
        /// The dependency name.
        name: String,
    },

    /// A dependency exists but holds a different type than requested.
    #[error("dependency \"{name}\" is not a `{expected}`")]
    DependencyTypeMismatch {
        /// The dependency name.
        name: String,
        /// The requested type.
        expected: &'static str,
    },

    /// A type URL was not found in the registry.
    #[error("unknown {registry} type URL \"{type_url}\" (registered: [{}])", .available.join(", "))]
    UnknownTypeUrl {
        /// The unregistered type URL.
        type_url: String,
        /// Which registry was searched (`"processor"` or `"check"`).
        registry: &'static str,
        /// Type URLs that are registered.
        available: Vec<String>,
    },

    /// Configuration deserialization or construction failed.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// The underlying error message.
        message: String,
    },

    /// A regex pattern failed to compile.
    #[error("invalid pattern \"{pattern}\": {message}")]
    InvalidPattern {
        /// The pattern.
        pattern: String,
        /// The compiler's message.
        message: String,
    },

    /// A string match pattern exceeds the allowed length.
    #[error("pattern length is {len}, but maximum allowed is {max}")]
    PatternTooLong {
        /// Actual length.
        len: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// Condition nesting exceeds [`MAX_CONDITION_DEPTH`](crate::MAX_CONDITION_DEPTH).
    #[error("condition nesting depth is {depth}, but maximum allowed is {max}")]
    DepthExceeded {
        /// Actual depth.
        depth: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// Too many children in an `and`/`or` condition.
    #[error("compound condition has {count} children, but maximum allowed is {max}")]
    TooManyPredicates {
        /// Actual count.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },
}

impl ConfigError {
    /// Build a [`ConfigError::InvalidConfig`] from any displayable cause.
    pub fn invalid_config(source: impl ToString) -> Self {
        Self::InvalidConfig {
            message: source.to_string(),
        }
    }
}
