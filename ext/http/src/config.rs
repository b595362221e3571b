//! Config-driven HTTP checks and processors (feature `registry`).
//!
//! | Type URL | Kind | Config |
//! |----------|------|--------|
//! | `chainer.http.v1.PathCheck` | check | `{ "path": <StringMatchSpec> }` |
//! | `chainer.http.v1.MethodCheck` | check | `{ "method": "GET" }` |
//! | `chainer.http.v1.HeaderCheck` | check | `{ "name": "x-foo", "value_match"?: <StringMatchSpec> }` |
//! | `chainer.http.v1.SetStatus` | processor | `{ "status": 404 }` |
//! | `chainer.http.v1.SetHeader` | processor | `{ "name": "x-foo", "value": "bar" }` |
//! | `chainer.http.v1.SetBody` | processor | `{ "body": "..." }` |

use crate::keys::{set_response_header, REQUEST_HEADERS, REQUEST_METHOD, REQUEST_PATH, RESPONSE_BODY, RESPONSE_STATUS};
use chainer::prelude::*;
use chainer::{IntoCheck, IntoProcessor, RegistryBuilder, StringMatchSpec};
use serde::Deserialize;

// ═══════════════════════════════════════════════════════════════════════════════
// Checks
// ═══════════════════════════════════════════════════════════════════════════════

/// Request path matches a string matcher.
#[derive(Debug)]
pub struct PathCheck {
    matcher: StringMatcher,
}

impl Check for PathCheck {
    fn check(&self, md: &MetaData) -> bool {
        md.get_optional(&REQUEST_PATH)
            .is_some_and(|path| self.matcher.is_match(path))
    }

    fn describe(&self) -> String {
        format!("path {}", self.matcher)
    }
}

#[derive(Debug, Deserialize)]
pub struct PathCheckConfig {
    pub path: StringMatchSpec,
}

impl IntoCheck for PathCheck {
    type Config = PathCheckConfig;

    fn from_config(config: Self::Config) -> Result<Box<dyn Check>, ConfigError> {
        Ok(Box::new(PathCheck {
            matcher: config.path.compile()?,
        }))
    }
}

/// Request method equals a method name, case-insensitively.
#[derive(Debug)]
pub struct MethodCheck {
    method: String,
}

impl Check for MethodCheck {
    fn check(&self, md: &MetaData) -> bool {
        md.get_optional(&REQUEST_METHOD)
            .is_some_and(|method| method.eq_ignore_ascii_case(&self.method))
    }

    fn describe(&self) -> String {
        format!("method == {}", self.method)
    }
}

#[derive(Debug, Deserialize)]
pub struct MethodCheckConfig {
    pub method: String,
}

impl IntoCheck for MethodCheck {
    type Config = MethodCheckConfig;

    fn from_config(config: Self::Config) -> Result<Box<dyn Check>, ConfigError> {
        if config.method.is_empty() {
            return Err(ConfigError::invalid_config("method must not be empty"));
        }
        Ok(Box::new(MethodCheck {
            method: config.method.to_ascii_uppercase(),
        }))
    }
}

/// Request header present, and optionally matching.
#[derive(Debug)]
pub struct HeaderCheck {
    name: String,
    matcher: Option<StringMatcher>,
}

impl Check for HeaderCheck {
    fn check(&self, md: &MetaData) -> bool {
        let Some(value) = md
            .get_optional(&REQUEST_HEADERS)
            .and_then(|headers| headers.get(&self.name))
        else {
            return false;
        };
        self.matcher.as_ref().map_or(true, |m| m.is_match(value))
    }

    fn describe(&self) -> String {
        match &self.matcher {
            Some(matcher) => format!("header {} {matcher}", self.name),
            None => format!("header {} present", self.name),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HeaderCheckConfig {
    pub name: String,
    #[serde(default)]
    pub value_match: Option<StringMatchSpec>,
}

impl IntoCheck for HeaderCheck {
    type Config = HeaderCheckConfig;

    fn from_config(config: Self::Config) -> Result<Box<dyn Check>, ConfigError> {
        if config.name.is_empty() {
            return Err(ConfigError::invalid_config("header name must not be empty"));
        }
        Ok(Box::new(HeaderCheck {
            name: config.name.to_ascii_lowercase(),
            matcher: config.value_match.as_ref().map(StringMatchSpec::compile).transpose()?,
        }))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Processors
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct SetStatus {
    pub status: u16,
}

impl Processor for SetStatus {
    fn apply(&self, md: &mut MetaData) -> Result<(), PipelineError> {
        md.set(&RESPONSE_STATUS, self.status);
        Ok(())
    }

    fn name(&self) -> String {
        format!("set status {}", self.status)
    }
}

impl IntoProcessor for SetStatus {
    type Config = Self;

    fn from_config(config: Self::Config) -> Result<Box<dyn Processor>, ConfigError> {
        if !(100..=999).contains(&config.status) {
            return Err(ConfigError::invalid_config(format!(
                "status {} is not a three-digit code",
                config.status
            )));
        }
        Ok(Box::new(config))
    }
}

#[derive(Debug, Deserialize)]
pub struct SetHeader {
    pub name: String,
    pub value: String,
}

impl Processor for SetHeader {
    fn apply(&self, md: &mut MetaData) -> Result<(), PipelineError> {
        set_response_header(md, &self.name, self.value.clone());
        Ok(())
    }

    fn name(&self) -> String {
        format!("set header {}: {}", self.name, self.value)
    }
}

impl IntoProcessor for SetHeader {
    type Config = Self;

    fn from_config(config: Self::Config) -> Result<Box<dyn Processor>, ConfigError> {
        if config.name.is_empty() {
            return Err(ConfigError::invalid_config("header name must not be empty"));
        }
        Ok(Box::new(config))
    }
}

#[derive(Debug, Deserialize)]
pub struct SetBody {
    pub body: String,
}

impl Processor for SetBody {
    fn apply(&self, md: &mut MetaData) -> Result<(), PipelineError> {
        md.set(&RESPONSE_BODY, self.body.clone());
        Ok(())
    }

    fn name(&self) -> String {
        format!("set body ({} bytes)", self.body.len())
    }
}

impl IntoProcessor for SetBody {
    type Config = Self;

    fn from_config(config: Self::Config) -> Result<Box<dyn Processor>, ConfigError> {
        Ok(Box::new(config))
    }
}

/// Register all chainer-http types with the given builder.
///
/// - `chainer.http.v1.PathCheck` → [`PathCheck`]
/// - `chainer.http.v1.MethodCheck` → [`MethodCheck`]
/// - `chainer.http.v1.HeaderCheck` → [`HeaderCheck`]
/// - `chainer.http.v1.SetStatus` → [`SetStatus`]
/// - `chainer.http.v1.SetHeader` → [`SetHeader`]
/// - `chainer.http.v1.SetBody` → [`SetBody`]
#[must_use]
pub fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .check::<PathCheck>("chainer.http.v1.PathCheck")
        .check::<MethodCheck>("chainer.http.v1.MethodCheck")
        .check::<HeaderCheck>("chainer.http.v1.HeaderCheck")
        .processor::<SetStatus>("chainer.http.v1.SetStatus")
        .processor::<SetHeader>("chainer.http.v1.SetHeader")
        .processor::<SetBody>("chainer.http.v1.SetBody")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HttpEngine, HttpRequest};
    use chainer::{ConfigModule, PipelineConfig};
    use std::sync::Arc;

    fn config(json: serde_json::Value) -> PipelineConfig {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn config_module_extends_standard_chains() {
        let registry = Arc::new(register(RegistryBuilder::new()).build());
        let pipeline = config(serde_json::json!({
            "chains": [
                {
                    "name": "INIT",
                    "route_ifs": [{
                        "condition": {
                            "type": "and",
                            "conditions": [
                                { "type": "check", "type_url": "chainer.http.v1.MethodCheck", "config": { "method": "get" } },
                                { "type": "check", "type_url": "chainer.http.v1.PathCheck", "config": { "path": { "Exact": "/health" } } }
                            ]
                        },
                        "action": { "type": "jump", "chain": "HEALTH" }
                    }]
                },
                {
                    "name": "HEALTH",
                    "steps": [
                        { "type": "processor", "type_url": "chainer.http.v1.SetStatus", "config": { "status": 204 } },
                        { "type": "processor", "type_url": "chainer.http.v1.SetHeader", "config": { "name": "Cache-Control", "value": "no-store" } }
                    ],
                    "default_action": { "type": "drop" }
                }
            ]
        }));
        let engine = HttpEngine::builder()
            .module(ConfigModule::new("health", registry, pipeline))
            .build()
            .unwrap();

        let response = engine
            .handle(HttpRequest::builder().method("GET").path("/health").build())
            .unwrap();
        assert_eq!(response.status, 204);
        assert_eq!(response.header("cache-control"), Some("no-store"));
        assert!(engine
            .registry()
            .dump()
            .contains("route-if: (method == GET and path exact \"/health\") -> jump to HEALTH"));
    }

    #[test]
    fn header_check() {
        let check = HeaderCheck::from_config(HeaderCheckConfig {
            name: "X-Token".into(),
            value_match: Some(StringMatchSpec::Prefix("abc".into())),
        })
        .unwrap();
        let md = HttpRequest::builder()
            .header("x-token", "abc123")
            .build()
            .into_meta_data();
        assert!(check.check(&md));
        assert_eq!(check.describe(), "header x-token prefix \"abc\"");

        let present = HeaderCheck::from_config(HeaderCheckConfig {
            name: "x-other".into(),
            value_match: None,
        })
        .unwrap();
        assert!(!present.check(&md));
    }

    #[test]
    fn invalid_configs_rejected() {
        assert!(SetStatus::from_config(SetStatus { status: 42 }).is_err());
        assert!(MethodCheck::from_config(MethodCheckConfig { method: String::new() }).is_err());
        assert!(PathCheck::from_config(PathCheckConfig {
            path: StringMatchSpec::Regex("(".into())
        })
        .is_err());
    }
}
