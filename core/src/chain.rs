//! `Chain` — a named, ordered sequence of processors and rules

use crate::{Action, Processor, Rule};
use std::borrow::{Borrow, Cow};
use std::fmt;

/// Value-equal chain identifier.
///
/// Two names built from the same string are equal. Well-known names can be
/// declared as constants:
///
/// ```
/// use chainer::ChainName;
///
/// const INIT: ChainName = ChainName::from_static("INIT");
/// assert_eq!(INIT, ChainName::new("INIT".to_string()));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainName(Cow<'static, str>);

impl ChainName {
    /// Create a name from a static string.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a name from any string.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ChainName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for ChainName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl From<&ChainName> for ChainName {
    fn from(name: &ChainName) -> Self {
        name.clone()
    }
}

impl Borrow<str> for ChainName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ChainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ChainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainName({:?})", self.0.as_ref())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ChainName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <String as serde::Deserialize>::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ChainName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One position inside a chain.
#[derive(Debug)]
pub enum Step {
    /// Apply a processor, then advance.
    Process(Box<dyn Processor>),
    /// Evaluate a rule: act on it when it holds, otherwise advance.
    Rule(Rule),
}

/// A named chain, owned by the [`ChainRegistry`](crate::ChainRegistry).
///
/// Entering a chain evaluates its `route_ifs` in registration order; the first
/// one that holds acts before step 0 runs. Then the steps execute in order.
/// When they are exhausted the `default_action` applies; `None` ends the run.
#[derive(Debug)]
pub struct Chain {
    name: ChainName,
    route_ifs: Vec<Rule>,
    steps: Vec<Step>,
    default_action: Option<Action>,
}

impl Chain {
    pub(crate) fn new(name: ChainName, default_action: Option<Action>) -> Self {
        Self {
            name,
            route_ifs: Vec::new(),
            steps: Vec::new(),
            default_action,
        }
    }

    pub(crate) fn push_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub(crate) fn push_route_if(&mut self, rule: Rule) {
        self.route_ifs.push(rule);
    }

    pub(crate) fn set_default_action(&mut self, action: Option<Action>) {
        self.default_action = action;
    }

    /// The chain's name.
    #[must_use]
    pub fn name(&self) -> &ChainName {
        &self.name
    }

    /// Entry checks, in evaluation order.
    #[must_use]
    pub fn route_ifs(&self) -> &[Rule] {
        &self.route_ifs
    }

    /// Steps, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// What happens after the last step.
    #[must_use]
    pub fn default_action(&self) -> Option<&Action> {
        self.default_action.as_ref()
    }

    /// Every chain this one can jump to, in order of appearance.
    pub fn jump_targets(&self) -> impl Iterator<Item = &ChainName> {
        let rules = self.route_ifs.iter().chain(self.steps.iter().filter_map(|step| match step {
            Step::Rule(rule) => Some(rule),
            Step::Process(_) => None,
        }));
        rules
            .filter_map(|rule| rule.action().target())
            .chain(self.default_action.iter().filter_map(Action::target))
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;
        for rule in &self.route_ifs {
            writeln!(f, "    route-if: {rule}")?;
        }
        for step in &self.steps {
            match step {
                Step::Process(processor) => writeln!(f, "    processor: {}", processor.name())?,
                Step::Rule(rule) => writeln!(f, "    rule: {rule}")?,
            }
        }
        match &self.default_action {
            Some(action) => writeln!(f, "    default: {action}"),
            None => writeln!(f, "    default: drop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{processor_fn, Condition};
    use std::collections::HashSet;

    #[test]
    fn names_are_value_equal() {
        let a = ChainName::from("PROCESS");
        let b = ChainName::from("PROCESS".to_string());
        assert_eq!(a, b);

        let set: HashSet<ChainName> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert!(set.contains("PROCESS"));
    }

    #[test]
    fn display_lists_every_part() {
        let mut chain = Chain::new("INIT".into(), Some(Action::jump_to("PRE_PROCESS")));
        chain.push_route_if(Rule::jump_if(Condition::Always, "DEBUG"));
        chain.push_step(Step::Process(Box::new(processor_fn("noop", |_| Ok(())))));
        chain.push_step(Step::Rule(Rule::drop_if(Condition::Always)));

        assert_eq!(
            chain.to_string(),
            "INIT:\n    route-if: always -> jump to DEBUG\n    processor: noop\n    rule: always -> drop\n    default: jump to PRE_PROCESS\n"
        );
    }

    #[test]
    fn jump_targets_in_order() {
        let mut chain = Chain::new("A".into(), Some(Action::jump_to("D")));
        chain.push_route_if(Rule::jump_if(Condition::Always, "B"));
        chain.push_step(Step::Rule(Rule::drop_if(Condition::Always)));
        chain.push_step(Step::Rule(Rule::jump_if(Condition::Always, "C")));

        let targets: Vec<&str> = chain.jump_targets().map(ChainName::as_str).collect();
        assert_eq!(targets, vec!["B", "C", "D"]);
    }
}
