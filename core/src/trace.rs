//! Run trace types for debugging pipeline behavior.
//!
//! A [`RunTrace`] records every decision the engine made while driving one
//! context through the chain graph: which chains were entered, which route-if
//! checks and rules fired, which processors ran, and how the run ended. Use
//! [`ChainRegistry::run_with_trace`](crate::ChainRegistry::run_with_trace) to
//! get one.
//!
//! # Example
//!
//! ```ignore
//! let trace = registry.run_with_trace(&mut meta_data, "INIT");
//! println!("{trace}");
//! assert_eq!(trace.chains_visited(), vec!["INIT", "PROCESS"]);
//! ```

use crate::{ChainName, PipelineError};
use std::fmt;

/// One engine decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// Execution entered a chain (start or jump target).
    Entered {
        /// The chain entered.
        chain: ChainName,
    },
    /// A route-if check was evaluated on entry.
    RouteIf {
        /// The chain being entered.
        chain: ChainName,
        /// The rule's description.
        description: String,
        /// Whether the check held.
        matched: bool,
    },
    /// A processor was applied successfully.
    Processed {
        /// The chain holding the step.
        chain: ChainName,
        /// Step position within the chain.
        index: usize,
        /// The processor's name.
        processor: String,
    },
    /// A rule step was evaluated.
    Rule {
        /// The chain holding the step.
        chain: ChainName,
        /// Step position within the chain.
        index: usize,
        /// The rule's description.
        description: String,
        /// Whether the rule held.
        matched: bool,
    },
    /// Control moved to another chain.
    Jumped {
        /// The chain jumped from.
        from: ChainName,
        /// The chain jumped to.
        to: ChainName,
    },
    /// A drop action ended the run.
    Dropped {
        /// The chain where the drop fired.
        chain: ChainName,
    },
    /// A chain ran out of steps; its default action follows.
    Exhausted {
        /// The exhausted chain.
        chain: ChainName,
    },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |matched: &bool| if *matched { "+" } else { "-" };
        match self {
            Self::Entered { chain } => write!(f, "enter {chain}"),
            Self::RouteIf {
                description,
                matched,
                ..
            } => write!(f, "  route-if [{}] {description}", mark(matched)),
            Self::Processed {
                index, processor, ..
            } => write!(f, "  {index}: processor {processor}"),
            Self::Rule {
                index,
                description,
                matched,
                ..
            } => write!(f, "  {index}: rule [{}] {description}", mark(matched)),
            Self::Jumped { from, to } => write!(f, "jump {from} -> {to}"),
            Self::Dropped { chain } => write!(f, "drop in {chain}"),
            Self::Exhausted { chain } => write!(f, "  end of {chain}"),
        }
    }
}

/// Trace of a full run.
///
/// # INV: `result` == `run_in_place()` result
///
/// The engine path is identical whether or not a trace is recorded.
#[derive(Debug)]
pub struct RunTrace {
    /// The nominal start chain.
    pub start: ChainName,
    /// Every decision, in execution order.
    pub events: Vec<TraceEvent>,
    /// How the run ended.
    pub result: Result<(), PipelineError>,
}

impl RunTrace {
    /// Chains entered, in order, including repeat visits.
    #[must_use]
    pub fn chains_visited(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Entered { chain } => Some(chain.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Processors applied, in order.
    #[must_use]
    pub fn processors_applied(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Processed { processor, .. } => Some(processor.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Returns `true` if the run ended through a drop action.
    #[must_use]
    pub fn dropped(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, TraceEvent::Dropped { .. }))
    }
}

impl fmt::Display for RunTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "run from {}", self.start)?;
        for event in &self.events {
            writeln!(f, "{event}")?;
        }
        match &self.result {
            Ok(()) => writeln!(f, "ok"),
            Err(err) => writeln!(f, "failed: {err}"),
        }
    }
}

/// Receives engine decisions. Event construction is deferred so the untraced
/// path never allocates.
pub(crate) trait RunObserver {
    fn record(&mut self, event: impl FnOnce() -> TraceEvent);
}

/// Observer for untraced runs.
pub(crate) struct Untraced;

impl RunObserver for Untraced {
    #[inline]
    fn record(&mut self, _event: impl FnOnce() -> TraceEvent) {}
}

impl RunObserver for Vec<TraceEvent> {
    fn record(&mut self, event: impl FnOnce() -> TraceEvent) {
        self.push(event());
    }
}
