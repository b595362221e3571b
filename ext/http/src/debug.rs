//! Introspection endpoint: `GET /internals` answers with the chain dump.

use crate::chains::INIT;
use crate::keys::{set_response_header, REQUEST_PATH, RESPONSE_BODY, RESPONSE_STATUS};
use chainer::prelude::*;
use tracing::debug;

/// Name of the chain the debug route-if jumps to.
pub const DEBUG: ChainName = ChainName::from_static("DEBUG");

/// Diverts requests for one path from `INIT` to a `DEBUG` chain that writes
/// [`ChainRegistry::dump`] as the body and drops.
#[derive(Debug, Clone)]
pub struct DebugModule {
    path: String,
}

impl DebugModule {
    /// Serve the dump at `/internals`.
    #[must_use]
    pub fn new() -> Self {
        Self::at("/internals")
    }

    /// Serve the dump at `path`.
    #[must_use]
    pub fn at(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Default for DebugModule {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainModule for DebugModule {
    fn name(&self) -> &str {
        "http.debug"
    }

    fn register(&self, ext: &mut ChainExtender<'_>) -> Result<(), ConfigError> {
        let registry = ext.registry_handle()?;
        ext.create_chain(DEBUG, Some(Action::Drop))?
            .append_processor(DEBUG, DumpChains { registry })?
            .route_if(
                INIT,
                Action::Jump(DEBUG),
                &REQUEST_PATH,
                StringMatcher::exact(self.path.as_str(), false),
                format!("path == {}", self.path),
            )?;
        Ok(())
    }
}

#[derive(Debug)]
struct DumpChains {
    registry: RegistryHandle,
}

impl Processor for DumpChains {
    fn apply(&self, md: &mut MetaData) -> Result<(), PipelineError> {
        let registry = self
            .registry
            .get()
            .ok_or_else(|| PipelineError::processor(self.name(), "chain registry is not available"))?;
        let dump = registry.dump();
        debug!(bytes = dump.len(), "serving chain dump");
        md.set(&RESPONSE_STATUS, 200);
        set_response_header(md, "content-type", "text/plain");
        md.set(&RESPONSE_BODY, dump);
        Ok(())
    }

    fn name(&self) -> String {
        "dump chains".to_owned()
    }
}
