//! CORS — origin decisions through a `FilterMap<String, bool>`.
//!
//! Origins are decided first-match-wins; an origin nothing mentions is denied.
//! A preflight (`OPTIONS` carrying an `Origin` header) is answered in
//! `PRE_PROCESS` and jumps to `POST_PROCESS` without reaching a handler.

use crate::chains::{POST_PROCESS, PRE_PROCESS};
use crate::keys::{set_response_header, REQUEST_HEADERS, REQUEST_METHOD, RESPONSE_STATUS};
use crate::Headers;
use chainer::prelude::*;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Installs origin checks and preflight handling on `PRE_PROCESS`.
pub struct CorsModule {
    policy: Arc<CorsPolicy>,
}

struct CorsPolicy {
    origins: FilterMap<String, bool>,
    allow_methods: String,
    allow_headers: String,
    max_age: Option<u32>,
}

impl CorsModule {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> CorsModuleBuilder {
        CorsModuleBuilder::default()
    }

    /// Whether `origin` is allowed.
    #[must_use]
    pub fn allows(&self, origin: &str) -> bool {
        self.policy.allows(origin)
    }
}

impl CorsPolicy {
    fn allows(&self, origin: &str) -> bool {
        self.origins
            .get(&origin.to_owned())
            .copied()
            .unwrap_or(false)
    }
}

impl fmt::Debug for CorsModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorsModule")
            .field("origin_rules", &self.policy.origins.len())
            .field("allow_methods", &self.policy.allow_methods)
            .finish_non_exhaustive()
    }
}

impl ChainModule for CorsModule {
    fn name(&self) -> &str {
        "http.cors"
    }

    fn register(&self, ext: &mut ChainExtender<'_>) -> Result<(), ConfigError> {
        let preflight = Condition::And(vec![
            Condition::key(&REQUEST_METHOD, |m: &String| m == "OPTIONS", "method == OPTIONS"),
            Condition::key(
                &REQUEST_HEADERS,
                |h: &Headers| h.contains("origin"),
                "origin header present",
            ),
        ]);
        ext.append_processor(
            PRE_PROCESS,
            ApplyCors {
                policy: Arc::clone(&self.policy),
            },
        )?
        .append_rule(
            PRE_PROCESS,
            Rule::new(preflight, Action::Jump(POST_PROCESS), "cors preflight"),
        )?;
        Ok(())
    }
}

/// Builder for [`CorsModule`].
pub struct CorsModuleBuilder {
    origins: FilterMapBuilder<String, bool>,
    allow_methods: Vec<String>,
    allow_headers: Vec<String>,
    max_age: Option<u32>,
}

impl Default for CorsModuleBuilder {
    fn default() -> Self {
        Self {
            origins: FilterMapBuilder::new(),
            allow_methods: ["GET", "HEAD", "POST"].map(str::to_owned).to_vec(),
            allow_headers: Vec::new(),
            max_age: None,
        }
    }
}

impl CorsModuleBuilder {
    /// Allow origins accepted by `filter`.
    #[must_use]
    pub fn allow_origin(mut self, filter: impl Filter<String> + 'static) -> Self {
        self.origins = self.origins.put(filter, true);
        self
    }

    /// Deny origins accepted by `filter`. Only useful before a broader allow.
    #[must_use]
    pub fn deny_origin(mut self, filter: impl Filter<String> + 'static) -> Self {
        self.origins = self.origins.put(filter, false);
        self
    }

    /// Methods listed in preflight answers.
    #[must_use]
    pub fn allow_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allow_methods = methods
            .into_iter()
            .map(|m| m.as_ref().to_ascii_uppercase())
            .collect();
        self
    }

    /// Request headers listed in preflight answers.
    #[must_use]
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allow_headers = headers
            .into_iter()
            .map(|h| h.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    /// How long a browser may cache a preflight answer, in seconds.
    #[must_use]
    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Build the module.
    #[must_use]
    pub fn build(self) -> CorsModule {
        CorsModule {
            policy: Arc::new(CorsPolicy {
                origins: self.origins.set_default_value(false).build(),
                allow_methods: self.allow_methods.join(", "),
                allow_headers: self.allow_headers.join(", "),
                max_age: self.max_age,
            }),
        }
    }
}

struct ApplyCors {
    policy: Arc<CorsPolicy>,
}

impl fmt::Debug for ApplyCors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyCors").finish_non_exhaustive()
    }
}

impl Processor for ApplyCors {
    fn apply(&self, md: &mut MetaData) -> Result<(), PipelineError> {
        let Some(origin) = md
            .get_optional(&REQUEST_HEADERS)
            .and_then(|headers| headers.get("origin"))
            .map(str::to_owned)
        else {
            return Ok(());
        };
        let preflight = md
            .get_optional(&REQUEST_METHOD)
            .is_some_and(|method| method == "OPTIONS");
        let allowed = self.policy.allows(&origin);
        debug!(%origin, allowed, preflight, "cors");

        if allowed {
            set_response_header(md, "access-control-allow-origin", origin);
            set_response_header(md, "vary", "Origin");
        }
        if preflight {
            if allowed {
                md.set(&RESPONSE_STATUS, 204);
                set_response_header(
                    md,
                    "access-control-allow-methods",
                    self.policy.allow_methods.clone(),
                );
                if !self.policy.allow_headers.is_empty() {
                    set_response_header(
                        md,
                        "access-control-allow-headers",
                        self.policy.allow_headers.clone(),
                    );
                }
                if let Some(max_age) = self.policy.max_age {
                    set_response_header(md, "access-control-max-age", max_age.to_string());
                }
            } else {
                md.set(&RESPONSE_STATUS, 403);
            }
        }
        Ok(())
    }

    fn name(&self) -> String {
        "apply cors".to_owned()
    }
}
