//! `Rule` — a condition-guarded jump or drop

use crate::{ChainName, Condition, MetaData};
use std::fmt;

/// What a rule does when its condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Continue at step 0 of the named chain.
    Jump(ChainName),
    /// End the run. No further step anywhere executes.
    Drop,
}

impl Action {
    /// Shorthand for `Action::Jump(target.into())`.
    pub fn jump_to(target: impl Into<ChainName>) -> Self {
        Self::Jump(target.into())
    }

    /// The jump target, if any.
    #[must_use]
    pub fn target(&self) -> Option<&ChainName> {
        match self {
            Self::Jump(target) => Some(target),
            Self::Drop => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jump(target) => write!(f, "jump to {target}"),
            Self::Drop => f.write_str("drop"),
        }
    }
}

/// A conditional control-flow edge.
pub struct Rule {
    condition: Condition,
    action: Action,
    description: String,
}

impl Rule {
    /// Create a rule.
    pub fn new(condition: Condition, action: Action, description: impl Into<String>) -> Self {
        Self {
            condition,
            action,
            description: description.into(),
        }
    }

    /// Jump to `target` when `condition` holds, described by the condition itself.
    pub fn jump_if(condition: Condition, target: impl Into<ChainName>) -> Self {
        let description = condition.to_string();
        Self::new(condition, Action::jump_to(target), description)
    }

    /// Drop the run when `condition` holds, described by the condition itself.
    pub fn drop_if(condition: Condition) -> Self {
        let description = condition.to_string();
        Self::new(condition, Action::Drop, description)
    }

    /// Returns `true` if the condition holds for this context.
    pub fn matches(&self, meta_data: &MetaData) -> bool {
        self.condition.evaluate(meta_data)
    }

    /// The guarded action.
    #[must_use]
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// The guarding condition.
    #[must_use]
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.description, self.action)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("description", &self.description)
            .field("action", &self.action)
            .finish()
    }
}
