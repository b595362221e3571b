//! `ChainRegistry` — owns the chain graph and drives runs through it
//!
//! # Lifecycle
//!
//! 1. **Configuration**: modules mutate a [`ChainRegistryBuilder`] through
//!    `create_chain`, `append_processor`, `append_rule` and `route_if`.
//! 2. **Freeze**: [`ChainRegistryBuilder::build`] moves the chains into an
//!    immutable [`ChainRegistry`]. The builder's storage is gone afterwards.
//! 3. **Serving**: any number of threads call [`ChainRegistry::run`] on the
//!    same registry, each with its own [`MetaData`].
//!
//! # Execution
//!
//! Entering a chain (at the start or through a jump) first evaluates its
//! route-if checks in registration order; the first one that holds acts. Then
//! the steps run in order: a processor is applied, a rule acts when it holds.
//! A jump resets execution to step 0 of the target; a drop ends the run.
//! When the steps are exhausted the chain's default action applies, and a
//! chain without one ends the run.
//!
//! Cycles are legal. The engine has no step budget, so a pipeline that never
//! drops and never runs out of steps does not terminate.

use crate::trace::{RunObserver, Untraced};
use crate::{
    Action, Chain, ChainName, ConfigError, Filter, MetaData, MetaDataKey, PipelineError, Processor,
    Rule, RunTrace, Step, TraceEvent,
};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, debug_span, info, trace, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Mutable chain graph, used only during configuration.
///
/// # Example
///
/// ```
/// use chainer::{processor_fn, Action, ChainRegistryBuilder, MetaData, MetaDataKey};
///
/// let status = MetaDataKey::<u16>::new("response.status");
/// let key = status.clone();
///
/// let mut builder = ChainRegistryBuilder::new();
/// builder
///     .create_chain("INIT", Some(Action::jump_to("PROCESS")))?
///     .create_chain("PROCESS", None)?
///     .append_processor("PROCESS", processor_fn("ok", move |md| {
///         md.set(&key, 200);
///         Ok(())
///     }))?;
/// let registry = builder.build();
///
/// let md = registry.run(MetaData::new(), "INIT").unwrap();
/// assert_eq!(md.get(&status), Ok(&200));
/// # Ok::<(), chainer::ConfigError>(())
/// ```
#[derive(Debug, Default)]
pub struct ChainRegistryBuilder {
    chains: Vec<Chain>,
    index: HashMap<ChainName, usize>,
}

impl ChainRegistryBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a chain. `default_action` applies once the chain's steps are
    /// exhausted; `None` ends the run there.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateChain`] if the name is taken.
    pub fn create_chain(
        &mut self,
        name: impl Into<ChainName>,
        default_action: Option<Action>,
    ) -> Result<&mut Self, ConfigError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(ConfigError::DuplicateChain { chain: name });
        }
        self.index.insert(name.clone(), self.chains.len());
        self.chains.push(Chain::new(name, default_action));
        Ok(self)
    }

    /// Append a processor to the end of a chain.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownChain`] if the chain was never created.
    pub fn append_processor(
        &mut self,
        chain: impl Into<ChainName>,
        processor: impl Processor + 'static,
    ) -> Result<&mut Self, ConfigError> {
        self.chain_mut(chain.into())?
            .push_step(Step::Process(Box::new(processor)));
        Ok(self)
    }

    /// Append a rule step to the end of a chain.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownChain`] if the chain was never created, or
    /// [`ConfigError::DepthExceeded`] if the rule's condition nests too deeply.
    pub fn append_rule(
        &mut self,
        chain: impl Into<ChainName>,
        rule: Rule,
    ) -> Result<&mut Self, ConfigError> {
        rule.condition().validate()?;
        self.chain_mut(chain.into())?.push_step(Step::Rule(rule));
        Ok(self)
    }

    /// Add an entry check on `chain`: whenever the chain is entered and the
    /// value under `key` passes `filter`, `action` applies before step 0.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownChain`] if the chain was never created.
    pub fn route_if<T: 'static>(
        &mut self,
        chain: impl Into<ChainName>,
        action: Action,
        key: &MetaDataKey<T>,
        filter: impl Filter<T> + 'static,
        description: impl Into<String>,
    ) -> Result<&mut Self, ConfigError> {
        let description = description.into();
        let condition = crate::Condition::key(key, filter, description.clone());
        self.route_if_condition(chain, Rule::new(condition, action, description))
    }

    /// Add an entry check built from an arbitrary rule.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownChain`] if the chain was never created, or
    /// [`ConfigError::DepthExceeded`] if the rule's condition nests too deeply.
    pub fn route_if_condition(
        &mut self,
        chain: impl Into<ChainName>,
        rule: Rule,
    ) -> Result<&mut Self, ConfigError> {
        rule.condition().validate()?;
        self.chain_mut(chain.into())?.push_route_if(rule);
        Ok(self)
    }

    /// Replace a chain's default action.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownChain`] if the chain was never created.
    pub fn set_default_action(
        &mut self,
        chain: impl Into<ChainName>,
        action: Option<Action>,
    ) -> Result<&mut Self, ConfigError> {
        self.chain_mut(chain.into())?.set_default_action(action);
        Ok(self)
    }

    /// Returns `true` if the chain has been created.
    #[must_use]
    pub fn contains_chain(&self, chain: &str) -> bool {
        self.index.contains_key(chain)
    }

    /// Names of the chains created so far, in creation order.
    pub fn chain_names(&self) -> impl Iterator<Item = &ChainName> {
        self.chains.iter().map(Chain::name)
    }

    /// Freeze the graph.
    #[must_use]
    pub fn build(self) -> ChainRegistry {
        let steps: usize = self.chains.iter().map(|chain| chain.steps().len()).sum();
        info!(chains = self.chains.len(), steps, "chain registry frozen");
        ChainRegistry {
            chains: self.chains,
            index: self.index,
        }
    }

    fn chain_mut(&mut self, name: ChainName) -> Result<&mut Chain, ConfigError> {
        match self.index.get(&name) {
            Some(&i) => Ok(&mut self.chains[i]),
            None => Err(ConfigError::UnknownChain { chain: name }),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// The frozen chain graph.
///
/// Holds no per-run state, so one instance serves every concurrent run.
pub struct ChainRegistry {
    chains: Vec<Chain>,
    index: HashMap<ChainName, usize>,
}

enum Flow {
    Enter(usize),
    Stop,
}

impl ChainRegistry {
    /// Run a context from `start` and hand it back.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::ChainNotFound`] if `start` or a jump target is unknown
    /// - any error a processor returns; the run stops at that processor
    pub fn run(
        &self,
        mut meta_data: MetaData,
        start: impl AsRef<str>,
    ) -> Result<MetaData, PipelineError> {
        self.run_in_place(&mut meta_data, start)?;
        Ok(meta_data)
    }

    /// Run a borrowed context from `start`.
    ///
    /// On error the context keeps whatever the steps before the failure wrote.
    ///
    /// # Errors
    ///
    /// Same as [`ChainRegistry::run`].
    pub fn run_in_place(
        &self,
        meta_data: &mut MetaData,
        start: impl AsRef<str>,
    ) -> Result<(), PipelineError> {
        self.execute(meta_data, start.as_ref(), &mut Untraced)
    }

    /// Run a borrowed context from `start`, recording every decision.
    pub fn run_with_trace(&self, meta_data: &mut MetaData, start: impl AsRef<str>) -> RunTrace {
        let start = start.as_ref();
        let mut events = Vec::new();
        let result = self.execute(meta_data, start, &mut events);
        RunTrace {
            start: ChainName::from(start.to_owned()),
            events,
            result,
        }
    }

    fn execute<O: RunObserver>(
        &self,
        meta_data: &mut MetaData,
        start: &str,
        observer: &mut O,
    ) -> Result<(), PipelineError> {
        let _span = debug_span!("chain_run", start).entered();
        let mut current = self.lookup(start)?;

        'chains: loop {
            let chain = &self.chains[current];
            let name = chain.name();
            observer.record(|| TraceEvent::Entered {
                chain: name.clone(),
            });
            trace!(chain = %name, "entering chain");

            for rule in chain.route_ifs() {
                let matched = rule.matches(meta_data);
                observer.record(|| TraceEvent::RouteIf {
                    chain: name.clone(),
                    description: rule.description().to_owned(),
                    matched,
                });
                trace!(chain = %name, rule = rule.description(), matched, "route-if evaluated");
                if matched {
                    match self.act(name, rule.action(), observer)? {
                        Flow::Enter(next) => {
                            current = next;
                            continue 'chains;
                        }
                        Flow::Stop => return Ok(()),
                    }
                }
            }

            for (index, step) in chain.steps().iter().enumerate() {
                match step {
                    Step::Process(processor) => {
                        trace!(chain = %name, index, processor = %processor.name(), "applying processor");
                        if let Err(err) = processor.apply(meta_data) {
                            warn!(chain = %name, index, processor = %processor.name(), error = %err, "processor failed");
                            return Err(err);
                        }
                        observer.record(|| TraceEvent::Processed {
                            chain: name.clone(),
                            index,
                            processor: processor.name(),
                        });
                    }
                    Step::Rule(rule) => {
                        let matched = rule.matches(meta_data);
                        observer.record(|| TraceEvent::Rule {
                            chain: name.clone(),
                            index,
                            description: rule.description().to_owned(),
                            matched,
                        });
                        trace!(chain = %name, index, rule = rule.description(), matched, "rule evaluated");
                        if matched {
                            match self.act(name, rule.action(), observer)? {
                                Flow::Enter(next) => {
                                    current = next;
                                    continue 'chains;
                                }
                                Flow::Stop => return Ok(()),
                            }
                        }
                    }
                }
            }

            observer.record(|| TraceEvent::Exhausted {
                chain: name.clone(),
            });
            match chain.default_action() {
                Some(action) => match self.act(name, action, observer)? {
                    Flow::Enter(next) => current = next,
                    Flow::Stop => return Ok(()),
                },
                None => {
                    debug!(chain = %name, "chain exhausted, run complete");
                    return Ok(());
                }
            }
        }
    }

    fn act<O: RunObserver>(
        &self,
        from: &ChainName,
        action: &Action,
        observer: &mut O,
    ) -> Result<Flow, PipelineError> {
        match action {
            Action::Jump(target) => {
                let next = self.lookup(target.as_str())?;
                debug!(from = %from, to = %target, "jump");
                observer.record(|| TraceEvent::Jumped {
                    from: from.clone(),
                    to: target.clone(),
                });
                Ok(Flow::Enter(next))
            }
            Action::Drop => {
                debug!(chain = %from, "drop");
                observer.record(|| TraceEvent::Dropped {
                    chain: from.clone(),
                });
                Ok(Flow::Stop)
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<usize, PipelineError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| PipelineError::ChainNotFound {
                chain: ChainName::from(name.to_owned()),
            })
    }

    /// Human-readable rendering of every chain, in creation order.
    #[must_use]
    pub fn dump(&self) -> String {
        self.to_string()
    }

    /// Report every jump whose target chain does not exist.
    ///
    /// Never called by the engine itself; a dangling jump only fails when a
    /// run actually takes it.
    ///
    /// # Errors
    ///
    /// One [`ConfigError::DanglingJump`] per dangling reference.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let dangling: Vec<ConfigError> = self
            .chains
            .iter()
            .flat_map(|chain| {
                chain
                    .jump_targets()
                    .filter(|target| !self.index.contains_key(*target))
                    .map(|target| ConfigError::DanglingJump {
                        chain: chain.name().clone(),
                        target: target.clone(),
                    })
            })
            .collect();
        if dangling.is_empty() {
            Ok(())
        } else {
            Err(dangling)
        }
    }

    /// Look up a chain by name.
    #[must_use]
    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.index.get(name).map(|&i| &self.chains[i])
    }

    /// Chain names in creation order.
    pub fn chain_names(&self) -> impl Iterator<Item = &ChainName> {
        self.chains.iter().map(Chain::name)
    }

    /// Number of chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Returns `true` if no chain is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl fmt::Display for ChainRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chain in &self.chains {
            write!(f, "{chain}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("chains", &self.chain_names().collect::<Vec<_>>())
            .finish()
    }
}
