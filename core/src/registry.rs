//! Type registry for config-driven pipeline construction.
//!
//! The registry enables **generic config loading**: JSON/YAML config →
//! a populated [`ChainRegistryBuilder`] without domain-specific glue code.
//!
//! # Architecture
//!
//! Each processor type registers itself via [`IntoProcessor`], each check type
//! via [`IntoCheck`]. At registration time the concrete type `T` is
//! monomorphized into a closure and erased behind `Box<dyn Fn>`: early type
//! erasure at registration, late invocation at load time.
//!
//! | Seam | Trait | Registry Method |
//! |------|-------|-----------------|
//! | Processors | [`IntoProcessor`] | `builder.processor::<T>(url)` |
//! | Checks | [`IntoCheck`] | `builder.check::<T>(url)` |
//!
//! # Example
//!
//! ```ignore
//! let registry = RegistryBuilder::new()
//!     .processor::<SetStatus>("chainer.http.v1.SetStatus")
//!     .check::<PathCheck>("chainer.http.v1.PathCheck")
//!     .build();
//!
//! let config: PipelineConfig = serde_json::from_str(json)?;
//! let chains = registry.load_pipeline(config)?;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::{ChainConfig, ConditionConfig, PipelineConfig, RuleConfig, StepConfig, TypedConfig};
use crate::{
    Action, ChainExtender, ChainModule, ChainRegistry, ChainRegistryBuilder, Check, Condition,
    ConfigError, Processor, Rule, MAX_PREDICATES_PER_COMPOUND,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Traits
// ═══════════════════════════════════════════════════════════════════════════════

/// Processor types that can be constructed from configuration.
///
/// Each type knows its own config shape via the associated `Config` type.
///
/// # Example
///
/// ```ignore
/// impl IntoProcessor for SetStatus {
///     type Config = SetStatusConfig;
///     fn from_config(config: Self::Config) -> Result<Box<dyn Processor>, ConfigError> {
///         Ok(Box::new(SetStatus { status: config.status }))
///     }
/// }
/// ```
pub trait IntoProcessor: Send + Sync + 'static {
    /// The configuration type deserialized from JSON/YAML.
    type Config: DeserializeOwned + Send + Sync;

    /// Construct a processor from deserialized configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] if the config is semantically invalid.
    fn from_config(config: Self::Config) -> Result<Box<dyn Processor>, ConfigError>;
}

/// Check types that can be constructed from configuration.
pub trait IntoCheck: Send + Sync + 'static {
    /// The configuration type deserialized from JSON/YAML.
    type Config: DeserializeOwned + Send + Sync;

    /// Construct a check from deserialized configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] if the config is semantically invalid,
    /// or [`ConfigError::InvalidPattern`] if a regex pattern is invalid.
    fn from_config(config: Self::Config) -> Result<Box<dyn Check>, ConfigError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Type-erased factories
// ═══════════════════════════════════════════════════════════════════════════════

type BoxedProcessorFactory =
    Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn Processor>, ConfigError> + Send + Sync>;

type BoxedCheckFactory =
    Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn Check>, ConfigError> + Send + Sync>;

fn decode<C: DeserializeOwned>(value: &serde_json::Value) -> Result<C, ConfigError> {
    serde_json::from_value(value.clone()).map_err(ConfigError::invalid_config)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for constructing a [`Registry`].
///
/// Register processor and check types with their type URLs, then call
/// [`build()`](Self::build) to produce an immutable `Registry`.
#[derive(Default)]
pub struct RegistryBuilder {
    processor_factories: HashMap<String, BoxedProcessorFactory>,
    check_factories: HashMap<String, BoxedCheckFactory>,
}

impl RegistryBuilder {
    /// Create a new empty registry builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor type with a type URL.
    #[must_use]
    pub fn processor<T: IntoProcessor>(mut self, type_url: &str) -> Self {
        self.processor_factories.insert(
            type_url.to_owned(),
            Box::new(|value: &serde_json::Value| T::from_config(decode(value)?)),
        );
        self
    }

    /// Register a check type with a type URL.
    #[must_use]
    pub fn check<T: IntoCheck>(mut self, type_url: &str) -> Self {
        self.check_factories.insert(
            type_url.to_owned(),
            Box::new(|value: &serde_json::Value| T::from_config(decode(value)?)),
        );
        self
    }

    /// Freeze the registry. No further registration is possible.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry {
            processor_factories: self.processor_factories,
            check_factories: self.check_factories,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable registry of processor and check factories.
pub struct Registry {
    processor_factories: HashMap<String, BoxedProcessorFactory>,
    check_factories: HashMap<String, BoxedCheckFactory>,
}

impl Registry {
    /// Load a standalone chain graph from configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnknownTypeUrl`]: processor or check `type_url` not registered
    /// - [`ConfigError::InvalidConfig`]: config deserialization or construction failed
    /// - [`ConfigError::DuplicateChain`]: a chain name appears twice
    /// - [`ConfigError::DepthExceeded`] / [`ConfigError::TooManyPredicates`]: limits
    pub fn load_pipeline(&self, config: PipelineConfig) -> Result<ChainRegistry, ConfigError> {
        let mut builder = ChainRegistryBuilder::new();
        self.apply(config, &mut builder)?;
        Ok(builder.build())
    }

    /// Apply configuration onto an existing builder.
    ///
    /// Chains already present in `builder` are extended rather than recreated.
    ///
    /// # Errors
    ///
    /// Same as [`load_pipeline()`](Self::load_pipeline).
    pub fn apply(
        &self,
        config: PipelineConfig,
        builder: &mut ChainRegistryBuilder,
    ) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for chain in &config.chains {
            if !seen.insert(chain.name.clone()) {
                return Err(ConfigError::DuplicateChain {
                    chain: chain.name.clone(),
                });
            }
        }

        // Create every chain first so configs may list them in any order.
        for chain in &config.chains {
            if !builder.contains_chain(chain.name.as_str()) {
                builder.create_chain(chain.name.clone(), None)?;
            }
        }
        for chain in config.chains {
            self.apply_chain(chain, builder)?;
        }
        Ok(())
    }

    fn apply_chain(
        &self,
        config: ChainConfig,
        builder: &mut ChainRegistryBuilder,
    ) -> Result<(), ConfigError> {
        let name = config.name;
        for route_if in config.route_ifs {
            builder.route_if_condition(name.clone(), self.load_rule(route_if)?)?;
        }
        for step in config.steps {
            match step {
                StepConfig::Processor(typed) => {
                    builder.append_processor(name.clone(), self.load_processor(&typed)?)?;
                }
                StepConfig::Rule(rule) => {
                    builder.append_rule(name.clone(), self.load_rule(rule)?)?;
                }
            }
        }
        if let Some(action) = config.default_action {
            builder.set_default_action(name, Some(Action::from(action)))?;
        }
        Ok(())
    }

    fn load_rule(&self, config: RuleConfig) -> Result<Rule, ConfigError> {
        let condition = self.load_condition(config.condition)?;
        condition.validate()?;
        let description = config
            .description
            .unwrap_or_else(|| condition.to_string());
        Ok(Rule::new(condition, config.action.into(), description))
    }

    fn load_condition(&self, config: ConditionConfig) -> Result<Condition, ConfigError> {
        match config {
            ConditionConfig::Check(typed) => {
                let factory = self.check_factories.get(&typed.type_url).ok_or_else(|| {
                    ConfigError::UnknownTypeUrl {
                        type_url: typed.type_url.clone(),
                        registry: "check",
                        available: sorted(self.check_factories.keys()),
                    }
                })?;
                Ok(Condition::Check(factory(&typed.config)?))
            }
            ConditionConfig::And { conditions } => {
                Ok(Condition::And(self.load_conditions(conditions)?))
            }
            ConditionConfig::Or { conditions } => Ok(Condition::Or(self.load_conditions(conditions)?)),
            ConditionConfig::Not { condition } => {
                Ok(self.load_condition(*condition)?.negate())
            }
            ConditionConfig::Always => Ok(Condition::Always),
        }
    }

    fn load_conditions(&self, configs: Vec<ConditionConfig>) -> Result<Vec<Condition>, ConfigError> {
        if configs.len() > MAX_PREDICATES_PER_COMPOUND {
            return Err(ConfigError::TooManyPredicates {
                count: configs.len(),
                max: MAX_PREDICATES_PER_COMPOUND,
            });
        }
        configs
            .into_iter()
            .map(|c| self.load_condition(c))
            .collect()
    }

    fn load_processor(&self, config: &TypedConfig) -> Result<Box<dyn Processor>, ConfigError> {
        let factory = self
            .processor_factories
            .get(&config.type_url)
            .ok_or_else(|| ConfigError::UnknownTypeUrl {
                type_url: config.type_url.clone(),
                registry: "processor",
                available: sorted(self.processor_factories.keys()),
            })?;
        factory(&config.config)
    }

    /// Returns the number of registered processor types.
    #[must_use]
    pub fn processor_count(&self) -> usize {
        self.processor_factories.len()
    }

    /// Returns the number of registered check types.
    #[must_use]
    pub fn check_count(&self) -> usize {
        self.check_factories.len()
    }

    /// Returns `true` if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processor_factories.is_empty() && self.check_factories.is_empty()
    }

    /// Returns `true` if the given processor type URL is registered.
    #[must_use]
    pub fn contains_processor(&self, type_url: &str) -> bool {
        self.processor_factories.contains_key(type_url)
    }

    /// Returns `true` if the given check type URL is registered.
    #[must_use]
    pub fn contains_check(&self, type_url: &str) -> bool {
        self.check_factories.contains_key(type_url)
    }

    /// Returns all registered processor type URLs (sorted).
    #[must_use]
    pub fn processor_type_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.processor_factories.keys().map(String::as_str).collect();
        urls.sort_unstable();
        urls
    }

    /// Returns all registered check type URLs (sorted).
    #[must_use]
    pub fn check_type_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.check_factories.keys().map(String::as_str).collect();
        urls.sort_unstable();
        urls
    }
}

fn sorted<'a>(keys: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut keys: Vec<String> = keys.cloned().collect();
    keys.sort_unstable();
    keys
}

// ═══════════════════════════════════════════════════════════════════════════════
// ConfigModule
// ═══════════════════════════════════════════════════════════════════════════════

/// A [`ChainModule`] that applies a [`PipelineConfig`] during registration.
///
/// Place it after the modules whose chains it extends.
pub struct ConfigModule {
    name: String,
    registry: Arc<Registry>,
    config: PipelineConfig,
}

impl ConfigModule {
    /// Create a module applying `config` through `registry`.
    pub fn new(name: impl Into<String>, registry: Arc<Registry>, config: PipelineConfig) -> Self {
        Self {
            name: name.into(),
            registry,
            config,
        }
    }
}

impl ChainModule for ConfigModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, extender: &mut ChainExtender<'_>) -> Result<(), ConfigError> {
        self.registry.apply(self.config.clone(), extender)
    }
}
