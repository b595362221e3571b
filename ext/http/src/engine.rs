//! `HttpEngine` — the in-memory boundary a transport adapter calls.

use crate::chains::{CoreModule, INIT};
use crate::{HttpRequest, HttpResponse};
use chainer::prelude::*;
use std::sync::Arc;
use tracing::debug_span;

/// A frozen HTTP pipeline.
///
/// ```
/// use chainer::MetaData;
/// use chainer_http::prelude::*;
///
/// let engine = HttpEngine::builder()
///     .module(
///         RoutingModule::builder()
///             .get("/hello", |md: &mut MetaData| -> Result<(), HandlerError> {
///                 md.set(&RESPONSE_BODY, "hi".to_owned());
///                 Ok(())
///             })
///             .build(),
///     )
///     .build()
///     .unwrap();
///
/// let response = engine
///     .handle(HttpRequest::builder().method("GET").path("/hello").build())
///     .unwrap();
/// assert_eq!(response.status, 200);
/// assert_eq!(response.body, "hi");
/// ```
#[derive(Debug, Clone)]
pub struct HttpEngine {
    registry: Arc<ChainRegistry>,
}

impl HttpEngine {
    /// Start a builder with [`CoreModule`] already added.
    #[must_use]
    pub fn builder() -> HttpEngineBuilder {
        HttpEngineBuilder {
            modules: ModuleRegistry::new().with_module(CoreModule),
        }
    }

    /// Run one request from `INIT` and collect the response.
    ///
    /// # Errors
    ///
    /// Any [`PipelineError`] the run raises; handler failures are not among
    /// them, since they are mapped to responses inside the pipeline.
    pub fn handle(&self, request: HttpRequest) -> Result<HttpResponse, PipelineError> {
        let _span = debug_span!("http_request", method = %request.method(), path = %request.path())
            .entered();
        let mut md = request.into_meta_data();
        self.registry.run_in_place(&mut md, INIT)?;
        Ok(HttpResponse::from_meta_data(&mut md))
    }

    /// The frozen chain graph.
    #[must_use]
    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }
}

/// Builder for [`HttpEngine`].
#[derive(Debug)]
pub struct HttpEngineBuilder {
    modules: ModuleRegistry,
}

impl HttpEngineBuilder {
    /// Add a module after those already added.
    #[must_use]
    pub fn module(mut self, module: impl ChainModule + 'static) -> Self {
        self.modules.add_module(module);
        self
    }

    /// Publish a shared dependency before any module runs.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateDependency`] if the name is taken.
    pub fn dependency<T: std::any::Any + Send + Sync>(
        mut self,
        name: impl Into<String>,
        value: T,
    ) -> Result<Self, ConfigError> {
        self.modules = self.modules.dependency(name, value)?;
        Ok(self)
    }

    /// Assemble every module and freeze.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] a module returns.
    pub fn build(self) -> Result<HttpEngine, ConfigError> {
        Ok(HttpEngine {
            registry: self.modules.build()?,
        })
    }
}
