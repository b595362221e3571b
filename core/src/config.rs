//! Config types for generic pipeline construction.
//!
//! These types mirror the runtime chain graph but are serde-deserializable,
//! enabling config-driven pipelines via [`Registry::load_pipeline()`](crate::Registry::load_pipeline).
//!
//! # Relationship to runtime types
//!
//! | Config type | Runtime type | Resolved by |
//! |-------------|-------------|-------------|
//! | [`PipelineConfig`] | [`ChainRegistry`](crate::ChainRegistry) | `Registry::load_pipeline()` |
//! | [`ChainConfig`] | [`Chain`](crate::Chain) | `Registry::apply()` |
//! | [`StepConfig`] | [`Step`](crate::Step) | processor factory or rule loader |
//! | [`RuleConfig`] | [`Rule`](crate::Rule) | condition loader |
//! | [`ConditionConfig`] | [`Condition`](crate::Condition) | check factory |
//! | [`ActionConfig`] | [`Action`](crate::Action) | direct |
//! | [`TypedConfig`] | `Box<dyn Processor>` / `Box<dyn Check>` | registry factory |

use crate::{Action, ChainName};
use serde::Deserialize;

/// A whole chain graph.
///
/// ```json
/// {
///   "chains": [
///     { "name": "INIT", "default_action": { "type": "jump", "chain": "PROCESS" } },
///     { "name": "PROCESS", "steps": [ { "type": "processor", "type_url": "example.SetStatus" } ] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Chains in creation order.
    pub chains: Vec<ChainConfig>,
}

/// One chain.
///
/// When the target builder already holds a chain of this name, the steps and
/// route-ifs are appended to it and `default_action`, if given, replaces its
/// default.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Chain name.
    pub name: ChainName,

    /// Entry checks, evaluated in order.
    #[serde(default)]
    pub route_ifs: Vec<RuleConfig>,

    /// Steps, executed in order.
    #[serde(default)]
    pub steps: Vec<StepConfig>,

    /// What happens after the last step. Absent ends the run.
    #[serde(default)]
    pub default_action: Option<ActionConfig>,
}

/// One step.
///
/// ```json
/// { "type": "processor", "type_url": "example.SetStatus", "config": { "status": 200 } }
/// { "type": "rule", "condition": { "type": "always" }, "action": { "type": "drop" } }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum StepConfig {
    /// A registered processor.
    #[serde(rename = "processor")]
    Processor(TypedConfig),

    /// A rule.
    #[serde(rename = "rule")]
    Rule(RuleConfig),
}

/// A condition plus an action.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// Shown in dumps and traces. Defaults to the rendered condition.
    #[serde(default)]
    pub description: Option<String>,

    /// When the rule fires.
    pub condition: ConditionConfig,

    /// What it does.
    pub action: ActionConfig,
}

/// Jump or drop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ActionConfig {
    /// Continue at step 0 of `chain`.
    #[serde(rename = "jump")]
    Jump {
        /// Target chain.
        chain: ChainName,
    },

    /// End the run.
    #[serde(rename = "drop")]
    Drop,
}

impl From<ActionConfig> for Action {
    fn from(config: ActionConfig) -> Self {
        match config {
            ActionConfig::Jump { chain } => Action::Jump(chain),
            ActionConfig::Drop => Action::Drop,
        }
    }
}

/// A condition tree.
///
/// Uses `#[serde(tag = "type")]` for discriminated union deserialization:
///
/// ```json
/// { "type": "check", "type_url": "example.PathIs", "config": { "path": "/internals" } }
/// { "type": "and", "conditions": [...] }
/// { "type": "or", "conditions": [...] }
/// { "type": "not", "condition": { ... } }
/// { "type": "always" }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ConditionConfig {
    /// A registered check.
    #[serde(rename = "check")]
    Check(TypedConfig),

    /// All children must hold.
    #[serde(rename = "and")]
    And {
        /// Children.
        conditions: Vec<ConditionConfig>,
    },

    /// Any child must hold.
    #[serde(rename = "or")]
    Or {
        /// Children.
        conditions: Vec<ConditionConfig>,
    },

    /// Inverts the inner condition.
    #[serde(rename = "not")]
    Not {
        /// The condition to negate.
        condition: Box<ConditionConfig>,
    },

    /// Always holds.
    #[serde(rename = "always")]
    Always,
}

/// Reference to a registered type with its configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TypedConfig {
    /// The type URL identifying the registered processor or check type.
    pub type_url: String,

    /// Type-specific configuration payload, deserialized as the registered
    /// type's `Config`.
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
}

fn default_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Empty configuration for types that take no construction parameters.
///
/// Accepts any value (`{}`, `null`, etc.) and ignores it.
#[derive(Debug, Clone, Copy)]
pub struct UnitConfig;

impl<'de> Deserialize<'de> for UnitConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde::de::IgnoredAny::deserialize(deserializer)?;
        Ok(UnitConfig)
    }
}
