//! chainer-test: Test domain for conformance testing
//!
//! Addresses context slots by plain string names so pipelines can be described
//! in YAML and checked against expected final contexts. This is the reference
//! extension that demonstrates how to build chainer extensions.
//!
//! # Example
//!
//! ```
//! use chainer_test::prelude::*;
//!
//! let md = TestContext::new()
//!     .with("path", "/internals")
//!     .with("method", "GET")
//!     .into_meta_data();
//!
//! assert_eq!(md.get(&key("path")).unwrap(), "/internals");
//! assert_eq!(TestContext::snapshot(&md).get("method"), Some("GET"));
//! ```

use chainer::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::{LazyLock, Mutex, PoisonError};

#[cfg(feature = "fixtures")]
pub mod fixture;

// ═══════════════════════════════════════════════════════════════════════════════
// Keys
// ═══════════════════════════════════════════════════════════════════════════════

/// Interns string names to `MetaDataKey<String>` identities.
///
/// The same name always yields a clone of the same key, so independently
/// constructed processors and checks address the same slot.
#[derive(Debug, Default)]
pub struct KeyTable {
    keys: Mutex<HashMap<String, MetaDataKey<String>>>,
}

impl KeyTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide table used by config-built processors and checks.
    #[must_use]
    pub fn global() -> &'static KeyTable {
        static GLOBAL: LazyLock<KeyTable> = LazyLock::new(KeyTable::new);
        &GLOBAL
    }

    /// The key interned under `name`, created on first use.
    pub fn key(&self, name: &str) -> MetaDataKey<String> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        keys.entry(name.to_owned())
            .or_insert_with(|| MetaDataKey::new(name.to_owned()))
            .clone()
    }

    /// Every interned key.
    #[must_use]
    pub fn keys(&self) -> Vec<MetaDataKey<String>> {
        let keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        keys.values().cloned().collect()
    }
}

/// Shorthand for `KeyTable::global().key(name)`.
pub fn key(name: &str) -> MetaDataKey<String> {
    KeyTable::global().key(name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Context
// ═══════════════════════════════════════════════════════════════════════════════

/// String-to-string view of a context, for building inputs and reading results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestContext {
    values: BTreeMap<String, String>,
}

impl TestContext {
    /// Create an empty test context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key-value pair (builder pattern).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Populate a fresh [`MetaData`] through the global key table.
    #[must_use]
    pub fn into_meta_data(self) -> MetaData {
        let mut md = MetaData::new();
        for (name, value) in self.values {
            md.set(&key(&name), value);
        }
        md
    }

    /// Read back every globally interned key that holds a value.
    #[must_use]
    pub fn snapshot(md: &MetaData) -> Self {
        let values = KeyTable::global()
            .keys()
            .into_iter()
            .filter_map(|k| {
                md.get_optional(&k)
                    .map(|value| (k.name().to_owned(), value.clone()))
            })
            .collect();
        Self { values }
    }

    /// The underlying map.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl From<BTreeMap<String, String>> for TestContext {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Processors
// ═══════════════════════════════════════════════════════════════════════════════

/// Sets `key` to `value`.
#[derive(Debug, Clone)]
pub struct SetValue {
    key: MetaDataKey<String>,
    value: String,
}

impl SetValue {
    /// Create a processor setting `key` to `value`.
    pub fn new(key_name: &str, value: impl Into<String>) -> Self {
        Self {
            key: key(key_name),
            value: value.into(),
        }
    }
}

impl Processor for SetValue {
    fn apply(&self, md: &mut MetaData) -> Result<(), PipelineError> {
        md.set(&self.key, self.value.clone());
        Ok(())
    }

    fn name(&self) -> String {
        format!("set {}={}", self.key, self.value)
    }
}

/// Appends `value` to `key`, comma-separated. Makes execution order observable.
#[derive(Debug, Clone)]
pub struct AppendValue {
    key: MetaDataKey<String>,
    value: String,
}

impl AppendValue {
    /// Create a processor appending `value` to `key`.
    pub fn new(key_name: &str, value: impl Into<String>) -> Self {
        Self {
            key: key(key_name),
            value: value.into(),
        }
    }
}

impl Processor for AppendValue {
    fn apply(&self, md: &mut MetaData) -> Result<(), PipelineError> {
        match md.get_mut(&self.key) {
            Ok(existing) => {
                existing.push(',');
                existing.push_str(&self.value);
            }
            Err(_) => {
                md.set(&self.key, self.value.clone());
            }
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("append {}+={}", self.key, self.value)
    }
}

/// Copies `from` into `to`; fails with a missing-value error when `from` is unset.
#[derive(Debug, Clone)]
pub struct CopyValue {
    from: MetaDataKey<String>,
    to: MetaDataKey<String>,
}

impl CopyValue {
    /// Create a processor copying `from` into `to`.
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: key(from),
            to: key(to),
        }
    }
}

impl Processor for CopyValue {
    fn apply(&self, md: &mut MetaData) -> Result<(), PipelineError> {
        let value = md.get(&self.from)?.clone();
        md.set(&self.to, value);
        Ok(())
    }

    fn name(&self) -> String {
        format!("copy {} -> {}", self.from, self.to)
    }
}

/// Always fails with `message`.
#[derive(Debug, Clone)]
pub struct Fail {
    message: String,
}

impl Fail {
    /// Create a failing processor.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Processor for Fail {
    fn apply(&self, _md: &mut MetaData) -> Result<(), PipelineError> {
        Err(PipelineError::processor(self.name(), self.message.clone()))
    }

    fn name(&self) -> String {
        format!("fail \"{}\"", self.message)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Checks
// ═══════════════════════════════════════════════════════════════════════════════

/// Holds when the value under `key` matches a string matcher.
pub struct ValueCheck {
    key: MetaDataKey<String>,
    matcher: StringMatcher,
}

impl ValueCheck {
    /// Create a check on `key_name`.
    pub fn new(key_name: &str, matcher: StringMatcher) -> Self {
        Self {
            key: key(key_name),
            matcher,
        }
    }
}

impl Check for ValueCheck {
    fn check(&self, md: &MetaData) -> bool {
        md.get_optional(&self.key)
            .is_some_and(|value| self.matcher.is_match(value))
    }

    fn describe(&self) -> String {
        format!("{} {}", self.key, self.matcher)
    }
}

/// Holds when `key` holds any value.
pub struct PresenceCheck {
    key: MetaDataKey<String>,
}

impl PresenceCheck {
    /// Create a presence check on `key_name`.
    pub fn new(key_name: &str) -> Self {
        Self { key: key(key_name) }
    }
}

impl Check for PresenceCheck {
    fn check(&self, md: &MetaData) -> bool {
        md.contains(&self.key)
    }

    fn describe(&self) -> String {
        format!("{} is set", self.key)
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        key, AppendValue, CopyValue, Fail, KeyTable, PresenceCheck, SetValue, TestContext,
        ValueCheck,
    };
    pub use chainer::prelude::*;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry support (feature = "registry")
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "registry")]
mod configs {
    use super::*;
    use chainer::{ConfigError, IntoCheck, IntoProcessor, StringMatchSpec};
    use serde::Deserialize;

    /// Configuration for [`SetValue`] and [`AppendValue`].
    #[derive(Deserialize)]
    pub struct KeyValueConfig {
        /// Context key name.
        pub key: String,
        /// Value to write.
        pub value: String,
    }

    /// Configuration for [`CopyValue`].
    #[derive(Deserialize)]
    pub struct CopyValueConfig {
        /// Source key name.
        pub from: String,
        /// Destination key name.
        pub to: String,
    }

    /// Configuration for [`Fail`].
    #[derive(Deserialize)]
    pub struct FailConfig {
        /// Failure message.
        #[serde(default = "default_message")]
        pub message: String,
    }

    fn default_message() -> String {
        "failed".to_owned()
    }

    /// Configuration for [`ValueCheck`].
    #[derive(Deserialize)]
    pub struct ValueCheckConfig {
        /// Context key name.
        pub key: String,
        /// How to match the value.
        pub value_match: StringMatchSpec,
    }

    /// Configuration for [`PresenceCheck`].
    #[derive(Deserialize)]
    pub struct PresenceCheckConfig {
        /// Context key name.
        pub key: String,
    }

    fn non_empty(key: &str) -> Result<(), ConfigError> {
        if key.is_empty() {
            return Err(ConfigError::invalid_config("key must not be empty"));
        }
        Ok(())
    }

    impl IntoProcessor for SetValue {
        type Config = KeyValueConfig;

        fn from_config(config: Self::Config) -> Result<Box<dyn Processor>, ConfigError> {
            non_empty(&config.key)?;
            Ok(Box::new(SetValue::new(&config.key, config.value)))
        }
    }

    impl IntoProcessor for AppendValue {
        type Config = KeyValueConfig;

        fn from_config(config: Self::Config) -> Result<Box<dyn Processor>, ConfigError> {
            non_empty(&config.key)?;
            Ok(Box::new(AppendValue::new(&config.key, config.value)))
        }
    }

    impl IntoProcessor for CopyValue {
        type Config = CopyValueConfig;

        fn from_config(config: Self::Config) -> Result<Box<dyn Processor>, ConfigError> {
            non_empty(&config.from)?;
            non_empty(&config.to)?;
            Ok(Box::new(CopyValue::new(&config.from, &config.to)))
        }
    }

    impl IntoProcessor for Fail {
        type Config = FailConfig;

        fn from_config(config: Self::Config) -> Result<Box<dyn Processor>, ConfigError> {
            Ok(Box::new(Fail::new(config.message)))
        }
    }

    impl IntoCheck for ValueCheck {
        type Config = ValueCheckConfig;

        fn from_config(config: Self::Config) -> Result<Box<dyn Check>, ConfigError> {
            non_empty(&config.key)?;
            let matcher = config.value_match.compile()?;
            Ok(Box::new(ValueCheck::new(&config.key, matcher)))
        }
    }

    impl IntoCheck for PresenceCheck {
        type Config = PresenceCheckConfig;

        fn from_config(config: Self::Config) -> Result<Box<dyn Check>, ConfigError> {
            non_empty(&config.key)?;
            Ok(Box::new(PresenceCheck::new(&config.key)))
        }
    }
}

#[cfg(feature = "registry")]
pub use configs::{
    CopyValueConfig, FailConfig, KeyValueConfig, PresenceCheckConfig, ValueCheckConfig,
};

/// Register all chainer-test types with the given builder.
///
/// - `chainer.test.v1.SetValue` → [`SetValue`]
/// - `chainer.test.v1.AppendValue` → [`AppendValue`]
/// - `chainer.test.v1.CopyValue` → [`CopyValue`]
/// - `chainer.test.v1.Fail` → [`Fail`]
/// - `chainer.test.v1.ValueCheck` → [`ValueCheck`]
/// - `chainer.test.v1.PresenceCheck` → [`PresenceCheck`]
#[cfg(feature = "registry")]
#[must_use]
pub fn register(builder: chainer::RegistryBuilder) -> chainer::RegistryBuilder {
    builder
        .processor::<SetValue>("chainer.test.v1.SetValue")
        .processor::<AppendValue>("chainer.test.v1.AppendValue")
        .processor::<CopyValue>("chainer.test.v1.CopyValue")
        .processor::<Fail>("chainer.test.v1.Fail")
        .check::<ValueCheck>("chainer.test.v1.ValueCheck")
        .check::<PresenceCheck>("chainer.test.v1.PresenceCheck")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_table_interns() {
        let table = KeyTable::new();
        let a = table.key("path");
        let b = table.key("path");
        assert_eq!(a, b);
        assert_ne!(a, table.key("method"));
        assert_eq!(table.keys().len(), 2);
    }

    #[test]
    fn test_context_round_trip() {
        let md = TestContext::new()
            .with("test.lib.a", "1")
            .with("test.lib.b", "2")
            .into_meta_data();
        let snapshot = TestContext::snapshot(&md);
        assert_eq!(snapshot.get("test.lib.a"), Some("1"));
        assert_eq!(snapshot.get("test.lib.b"), Some("2"));
    }

    #[test]
    fn test_append_records_order() {
        let mut md = MetaData::new();
        AppendValue::new("test.lib.trail", "a").apply(&mut md).unwrap();
        AppendValue::new("test.lib.trail", "b").apply(&mut md).unwrap();
        assert_eq!(md.get(&key("test.lib.trail")).unwrap(), "a,b");
    }

    #[test]
    fn test_copy_requires_source() {
        let err = CopyValue::new("test.lib.missing", "test.lib.out")
            .apply(&mut MetaData::new())
            .unwrap_err();
        assert!(err.is_missing_context_value());
    }

    #[test]
    fn test_fail_names_itself() {
        let err = Fail::new("boom").apply(&mut MetaData::new()).unwrap_err();
        assert_eq!(err.to_string(), "processor \"fail \"boom\"\" failed: boom");
    }

    #[test]
    fn test_checks() {
        let md = TestContext::new()
            .with("test.lib.role", "admin")
            .into_meta_data();
        assert!(ValueCheck::new("test.lib.role", StringMatcher::exact("admin", false)).check(&md));
        assert!(!ValueCheck::new("test.lib.role", StringMatcher::exact("viewer", false)).check(&md));
        assert!(!ValueCheck::new("test.lib.unset", StringMatcher::prefix("", false)).check(&md));
        assert!(PresenceCheck::new("test.lib.role").check(&md));
        assert!(!PresenceCheck::new("test.lib.unset").check(&md));
    }

    #[test]
    fn test_full_pipeline() {
        let mut builder = ChainRegistryBuilder::new();
        builder
            .create_chain("A", Some(Action::jump_to("B")))
            .unwrap()
            .create_chain("B", None)
            .unwrap()
            .append_processor("A", AppendValue::new("test.lib.order", "a"))
            .unwrap()
            .append_processor("B", AppendValue::new("test.lib.order", "b"))
            .unwrap();
        let registry = builder.build();

        let md = registry.run(MetaData::new(), "A").unwrap();
        assert_eq!(md.get(&key("test.lib.order")).unwrap(), "a,b");
    }
}

#[cfg(all(test, feature = "registry"))]
mod registry_tests {
    use super::*;
    use chainer::{PipelineConfig, RegistryBuilder};

    #[test]
    fn register_adds_all_types() {
        let registry = register(RegistryBuilder::new()).build();
        assert_eq!(registry.processor_count(), 4);
        assert_eq!(registry.check_count(), 2);
        assert!(registry.contains_check("chainer.test.v1.ValueCheck"));
    }

    #[test]
    fn load_pipeline_with_test_types() {
        let registry = register(RegistryBuilder::new()).build();
        let config: PipelineConfig = serde_json::from_value(serde_json::json!({
            "chains": [{
                "name": "A",
                "route_ifs": [{
                    "condition": {
                        "type": "check",
                        "type_url": "chainer.test.v1.ValueCheck",
                        "config": { "key": "test.reg.path", "value_match": { "Exact": "/internals" } }
                    },
                    "action": { "type": "drop" }
                }],
                "steps": [{
                    "type": "processor",
                    "type_url": "chainer.test.v1.SetValue",
                    "config": { "key": "test.reg.status", "value": "200" }
                }]
            }]
        }))
        .unwrap();
        let chains = registry.load_pipeline(config).unwrap();

        let md = chains
            .run(TestContext::new().with("test.reg.path", "/x").into_meta_data(), "A")
            .unwrap();
        assert_eq!(md.get(&key("test.reg.status")).unwrap(), "200");

        let md = chains
            .run(
                TestContext::new()
                    .with("test.reg.path", "/internals")
                    .into_meta_data(),
                "A",
            )
            .unwrap();
        assert!(!md.contains(&key("test.reg.status")));
        assert!(chains.dump().contains("route-if: test.reg.path exact \"/internals\" -> drop"));
    }

    #[test]
    fn empty_key_rejected() {
        let registry = register(RegistryBuilder::new()).build();
        let config: PipelineConfig = serde_json::from_value(serde_json::json!({
            "chains": [{ "name": "A", "steps": [{
                "type": "processor",
                "type_url": "chainer.test.v1.SetValue",
                "config": { "key": "", "value": "x" }
            }] }]
        }))
        .unwrap();
        assert!(registry.load_pipeline(config).is_err());
    }
}
