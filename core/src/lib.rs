//! chainer - a data-driven request pipeline engine
//!
//! A unit of work (typically one HTTP request) is carried by a [`MetaData`]
//! context through a graph of named [`Chain`]s. Each chain is an ordered list of
//! [`Processor`]s, which mutate the context, interleaved with [`Rule`]s, which
//! jump to another chain or drop the run. Features never subclass the engine:
//! they are [`ChainModule`]s that install processors and rules at configuration
//! time.
//!
//! # Architecture
//!
//! - [`MetaData`] / [`MetaDataKey<T>`] — typed context bag; the key's type parameter names the value type
//! - [`FilterMap<F, T>`] — ordered first-match-wins lookup with an optional default
//! - [`Condition`] — boolean composition of [`Check`]s over the context
//! - [`Processor`] — one context-mutating step
//! - [`Rule`] — condition plus [`Action`] (jump or drop)
//! - [`ChainRegistry`] — the frozen graph; [`ChainRegistryBuilder`] is its configuration phase
//! - [`ModuleRegistry`] — two-phase module assembly with shared dependencies
//!
//! # Key Design Insights
//!
//! 1. **Configuration vs serving**: builders are mutable and single-owner; `build()`
//!    moves their storage into an immutable registry shared across threads.
//!
//! 2. **Absent → false**: a keyed check whose key holds no value evaluates to
//!    `false`. Only processors can fail a run; rules never do.
//!
//! 3. **Cycles are legal**: a jump is an index lookup, with no cycle detection
//!    and no step budget.
//!
//! # Example
//!
//! ```
//! use chainer::prelude::*;
//!
//! let path = MetaDataKey::<String>::new("request.path");
//! let status = MetaDataKey::<u16>::new("response.status");
//!
//! let mut builder = ChainRegistryBuilder::new();
//! builder
//!     .create_chain("B", None)?
//!     .create_chain("A", None)?
//!     .route_if("B", Action::jump_to("A"), &path, |p: &String| p == "/ok", "path == /ok")?;
//! let key = status.clone();
//! builder.append_processor("A", processor_fn("set status 200", move |md| {
//!     md.set(&key, 200);
//!     Ok(())
//! }))?;
//! let registry = builder.build();
//!
//! let mut md = MetaData::new();
//! md.set(&path, "/ok".to_string());
//! let md = registry.run(md, "B").unwrap();
//! assert_eq!(md.get(&status), Ok(&200));
//! # Ok::<(), ConfigError>(())
//! ```
//!
//! # Extensions
//!
//! Domain-specific functionality lives in separate crates:
//!
//! - [`chainer-http`](https://docs.rs/chainer-http) — HTTP keys, standard chains, routing, CORS, debug
//! - [`chainer-test`](https://docs.rs/chainer-test) — Test domain for conformance (internal)

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod chain;
mod chain_registry;
mod condition;
mod error;
mod filter_map;
mod meta_data;
mod module;
mod processor;
mod rule;
mod string_match;
mod trace;

#[cfg(feature = "registry")]
mod config;
#[cfg(feature = "registry")]
mod registry;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

// Context
pub use meta_data::{KeyId, MetaData, MetaDataKey};

// Lookup
pub use filter_map::{Filter, FilterMap, FilterMapBuilder, FilterMapEntry};
pub use string_match::{StringMatchSpec, StringMatcher};

// Control flow
pub use chain::{Chain, ChainName, Step};
pub use chain_registry::{ChainRegistry, ChainRegistryBuilder};
pub use condition::{Check, Condition, FnCheck, KeyCheck, PresentCheck};
pub use processor::{processor_fn, FnProcessor, Processor};
pub use rule::{Action, Rule};

// Modules
pub use module::{
    ChainExtender, ChainModule, DependencyRegistry, ModuleRegistry, RegistryHandle,
    CHAIN_REGISTRY_DEPENDENCY,
};

// Errors
pub use error::{BoxError, ConfigError, MissingContextValue, NoMatchingEntry, PipelineError};

// Trace types
pub use trace::{RunTrace, TraceEvent};

// Registry (feature-gated)
#[cfg(feature = "registry")]
pub use config::{
    ActionConfig, ChainConfig, ConditionConfig, PipelineConfig, RuleConfig, StepConfig,
    TypedConfig, UnitConfig,
};
#[cfg(feature = "registry")]
pub use registry::{ConfigModule, IntoCheck, IntoProcessor, Registry, RegistryBuilder};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use chainer::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Control flow
        processor_fn,
        Action,
        Chain,
        // Modules
        ChainExtender,
        ChainModule,
        ChainName,
        ChainRegistry,
        ChainRegistryBuilder,
        Check,
        Condition,
        // Errors
        ConfigError,
        // Lookup
        Filter,
        FilterMap,
        FilterMapBuilder,
        // Context
        MetaData,
        MetaDataKey,
        MissingContextValue,
        ModuleRegistry,
        NoMatchingEntry,
        PipelineError,
        Processor,
        RegistryHandle,
        Rule,
        // Trace types
        RunTrace,
        StringMatcher,
        TraceEvent,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum allowed nesting depth of a [`Condition`].
///
/// Protects recursive evaluation against stack overflow. Enforced whenever a
/// rule is added to a [`ChainRegistryBuilder`].
pub const MAX_CONDITION_DEPTH: usize = 32;

/// Maximum number of children in a single `And` or `Or` condition loaded from config.
pub const MAX_PREDICATES_PER_COMPOUND: usize = 256;

/// Maximum length for non-regex string match patterns (exact, prefix, suffix, contains).
pub const MAX_PATTERN_LENGTH: usize = 8192;

/// Maximum length for regex patterns.
///
/// Shorter than [`MAX_PATTERN_LENGTH`] because regex compilation cost grows
/// faster than literal matching.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4096;
