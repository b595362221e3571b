//! Module registration — the configuration phase
//!
//! Features install themselves into the chain graph as [`ChainModule`]s.
//! [`ModuleRegistry::build`] runs every module in two phases and then freezes
//! the result:
//!
//! 1. **provide**: each module may publish named shared dependencies.
//! 2. **register**: each module receives a [`ChainExtender`] to create chains,
//!    append processors and rules, add route-if checks, and read dependencies.
//!
//! Both phases visit modules in the order they were added. The only ordering
//! guarantee across modules is that order; within one chain, appended steps
//! keep call order.

use crate::{ChainRegistry, ChainRegistryBuilder, ConfigError};
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, info, warn};

/// Dependency name under which the core publishes a [`RegistryHandle`].
pub const CHAIN_REGISTRY_DEPENDENCY: &str = "chainer.chain_registry";

// ═══════════════════════════════════════════════════════════════════════════════
// Dependencies
// ═══════════════════════════════════════════════════════════════════════════════

/// Named, typed values shared between modules at configuration time.
#[derive(Default)]
pub struct DependencyRegistry {
    entries: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl DependencyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `value` under `name`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateDependency`] if the name is taken.
    pub fn register<T: Any + Send + Sync>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(ConfigError::DuplicateDependency { name });
        }
        debug!(dependency = %name, ty = type_name::<T>(), "dependency registered");
        self.entries.insert(name, Arc::new(value));
        Ok(())
    }

    /// Fetch the value published under `name`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingDependency`] if nothing was published
    /// - [`ConfigError::DependencyTypeMismatch`] if it is not a `T`
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ConfigError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ConfigError::MissingDependency {
                name: name.to_owned(),
            })?;
        Arc::clone(entry)
            .downcast::<T>()
            .map_err(|_| ConfigError::DependencyTypeMismatch {
                name: name.to_owned(),
                expected: type_name::<T>(),
            })
    }

    /// Returns `true` if something was published under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Published names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for DependencyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// Late-bound reference to the frozen [`ChainRegistry`].
///
/// Published before any module registers, filled in by
/// [`ModuleRegistry::build`]. Holds a weak reference, so a processor capturing
/// the handle does not keep its own registry alive.
#[derive(Clone, Default)]
pub struct RegistryHandle {
    slot: Arc<OnceLock<Weak<ChainRegistry>>>,
}

impl RegistryHandle {
    /// The registry, once built and while still alive.
    #[must_use]
    pub fn get(&self) -> Option<Arc<ChainRegistry>> {
        self.slot.get().and_then(Weak::upgrade)
    }

    fn bind(&self, registry: &Arc<ChainRegistry>) {
        // A handle is created per ModuleRegistry and bound once in build().
        let _ = self.slot.set(Arc::downgrade(registry));
    }
}

impl fmt::Debug for RegistryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryHandle")
            .field("bound", &self.slot.get().is_some())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

/// A self-contained feature that installs itself into the chain graph.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a chain module",
    note = "implement `name` and `register(&self, &mut ChainExtender<'_>)`"
)]
pub trait ChainModule {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Phase 1: publish shared dependencies. Defaults to nothing.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] aborts the build.
    fn provide(&self, dependencies: &mut DependencyRegistry) -> Result<(), ConfigError> {
        let _ = dependencies;
        Ok(())
    }

    /// Phase 2: create chains and append steps.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] aborts the build.
    fn register(&self, extender: &mut ChainExtender<'_>) -> Result<(), ConfigError>;
}

/// Handle a module receives during phase 2.
///
/// Dereferences to the [`ChainRegistryBuilder`], so every builder operation is
/// available directly.
pub struct ChainExtender<'a> {
    chains: &'a mut ChainRegistryBuilder,
    dependencies: &'a DependencyRegistry,
    module: &'a str,
}

impl ChainExtender<'_> {
    /// Fetch a shared dependency.
    ///
    /// # Errors
    ///
    /// See [`DependencyRegistry::get`].
    pub fn dependency<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ConfigError> {
        self.dependencies.get(name)
    }

    /// Handle to the registry being built.
    ///
    /// # Errors
    ///
    /// Fails only if the handle was replaced under a different type.
    pub fn registry_handle(&self) -> Result<RegistryHandle, ConfigError> {
        self.dependency::<RegistryHandle>(CHAIN_REGISTRY_DEPENDENCY)
            .map(|handle| RegistryHandle::clone(&handle))
    }

    /// All shared dependencies.
    #[must_use]
    pub fn dependencies(&self) -> &DependencyRegistry {
        self.dependencies
    }

    /// Name of the module currently registering.
    #[must_use]
    pub fn module_name(&self) -> &str {
        self.module
    }
}

impl Deref for ChainExtender<'_> {
    type Target = ChainRegistryBuilder;

    fn deref(&self) -> &Self::Target {
        self.chains
    }
}

impl DerefMut for ChainExtender<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.chains
    }
}

/// Assembles modules into a frozen [`ChainRegistry`].
///
/// # Example
///
/// ```
/// use chainer::{processor_fn, ChainExtender, ChainModule, ConfigError, MetaData, ModuleRegistry};
///
/// struct Hello;
///
/// impl ChainModule for Hello {
///     fn name(&self) -> &str {
///         "hello"
///     }
///
///     fn register(&self, ext: &mut ChainExtender<'_>) -> Result<(), ConfigError> {
///         ext.create_chain("INIT", None)?
///             .append_processor("INIT", processor_fn("noop", |_| Ok(())))?;
///         Ok(())
///     }
/// }
///
/// let registry = ModuleRegistry::new().with_module(Hello).build()?;
/// registry.run(MetaData::new(), "INIT").unwrap();
/// # Ok::<(), ConfigError>(())
/// ```
pub struct ModuleRegistry {
    modules: Vec<Box<dyn ChainModule>>,
    dependencies: DependencyRegistry,
    handle: RegistryHandle,
}

impl ModuleRegistry {
    /// Create a registry with only the [`CHAIN_REGISTRY_DEPENDENCY`] published.
    #[must_use]
    pub fn new() -> Self {
        let handle = RegistryHandle::default();
        let mut dependencies = DependencyRegistry::new();
        dependencies.entries.insert(
            CHAIN_REGISTRY_DEPENDENCY.to_owned(),
            Arc::new(handle.clone()),
        );
        Self {
            modules: Vec::new(),
            dependencies,
            handle,
        }
    }

    /// Add a module after those already added.
    #[must_use]
    pub fn with_module(mut self, module: impl ChainModule + 'static) -> Self {
        self.add_module(module);
        self
    }

    /// Add a module after those already added.
    pub fn add_module(&mut self, module: impl ChainModule + 'static) -> &mut Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Publish a dependency before any module runs.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateDependency`] if the name is taken.
    pub fn dependency<T: Any + Send + Sync>(
        mut self,
        name: impl Into<String>,
        value: T,
    ) -> Result<Self, ConfigError> {
        self.dependencies.register(name, value)?;
        Ok(self)
    }

    /// Module names in registration order.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|module| module.name())
    }

    /// Run both phases and freeze.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] any module returns.
    pub fn build(self) -> Result<Arc<ChainRegistry>, ConfigError> {
        let Self {
            modules,
            mut dependencies,
            handle,
        } = self;

        for module in &modules {
            module
                .provide(&mut dependencies)
                .inspect_err(|err| warn!(module = module.name(), error = %err, "provide failed"))?;
        }

        let mut chains = ChainRegistryBuilder::new();
        for module in &modules {
            let mut extender = ChainExtender {
                chains: &mut chains,
                dependencies: &dependencies,
                module: module.name(),
            };
            module
                .register(&mut extender)
                .inspect_err(|err| warn!(module = module.name(), error = %err, "register failed"))?;
            debug!(module = module.name(), "module registered");
        }

        let registry = Arc::new(chains.build());
        handle.bind(&registry);
        info!(modules = modules.len(), "modules assembled");
        Ok(registry)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.module_names().collect::<Vec<_>>())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
