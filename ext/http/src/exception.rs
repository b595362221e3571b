//! Exception mapping — handler errors to responses.
//!
//! The mapper is chosen from a `FilterMap<HandlerError, Arc<dyn ExceptionMapper>>`
//! whose default answers 500, so every recorded exception produces a response.

use crate::chains::EXCEPTION_OCCURRED;
use crate::keys::{set_response_header, EXCEPTION, RESPONSE_BODY, RESPONSE_STATUS};
use crate::HandlerError;
use chainer::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Turns a handler error into response keys.
pub trait ExceptionMapper: Send + Sync {
    /// Write status, headers and body for `error`.
    fn map(&self, error: &HandlerError, md: &mut MetaData);
}

/// Answers a fixed status with the error message as a plain-text body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMapper {
    status: u16,
}

impl StatusMapper {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self { status }
    }
}

impl ExceptionMapper for StatusMapper {
    fn map(&self, error: &HandlerError, md: &mut MetaData) {
        md.set(&RESPONSE_STATUS, self.status);
        set_response_header(md, "content-type", "text/plain");
        md.set(&RESPONSE_BODY, error.to_string());
    }
}

/// Answers [`HandlerError::status`] for the error's kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct KindMapper;

impl ExceptionMapper for KindMapper {
    fn map(&self, error: &HandlerError, md: &mut MetaData) {
        StatusMapper::new(error.status()).map(error, md);
    }
}

type MapperMap = FilterMap<HandlerError, Arc<dyn ExceptionMapper>>;

/// Installs exception mapping on `EXCEPTION_OCCURRED`.
pub struct ExceptionModule {
    mappers: Arc<MapperMap>,
}

impl ExceptionModule {
    /// A module that answers 500 for everything.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start a new builder.
    #[must_use]
    pub fn builder() -> ExceptionModuleBuilder {
        ExceptionModuleBuilder::default()
    }
}

impl Default for ExceptionModule {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExceptionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionModule")
            .field("mappers", &self.mappers.len())
            .finish()
    }
}

impl ChainModule for ExceptionModule {
    fn name(&self) -> &str {
        "http.exception"
    }

    fn register(&self, ext: &mut ChainExtender<'_>) -> Result<(), ConfigError> {
        ext.append_processor(
            EXCEPTION_OCCURRED,
            MapException {
                mappers: Arc::clone(&self.mappers),
            },
        )?;
        Ok(())
    }
}

/// Builder for [`ExceptionModule`].
pub struct ExceptionModuleBuilder {
    mappers: FilterMapBuilder<HandlerError, Arc<dyn ExceptionMapper>>,
    fallback: Arc<dyn ExceptionMapper>,
}

impl Default for ExceptionModuleBuilder {
    fn default() -> Self {
        Self {
            mappers: FilterMapBuilder::new(),
            fallback: Arc::new(StatusMapper::new(500)),
        }
    }
}

impl ExceptionModuleBuilder {
    /// Map errors accepted by `filter` with `mapper`.
    #[must_use]
    pub fn on(
        mut self,
        filter: impl Filter<HandlerError> + 'static,
        mapper: impl ExceptionMapper + 'static,
    ) -> Self {
        self.mappers = self.mappers.put(filter, Arc::new(mapper));
        self
    }

    /// Replace the 500 fallback.
    #[must_use]
    pub fn fallback(mut self, mapper: impl ExceptionMapper + 'static) -> Self {
        self.fallback = Arc::new(mapper);
        self
    }

    /// Build the module.
    #[must_use]
    pub fn build(self) -> ExceptionModule {
        ExceptionModule {
            mappers: Arc::new(self.mappers.set_default_value(self.fallback).build()),
        }
    }
}

struct MapException {
    mappers: Arc<MapperMap>,
}

impl fmt::Debug for MapException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapException").finish_non_exhaustive()
    }
}

impl Processor for MapException {
    fn apply(&self, md: &mut MetaData) -> Result<(), PipelineError> {
        let error = md.get(&EXCEPTION)?.clone();
        // The default value makes the lookup total.
        if let Some(mapper) = self.mappers.get(&error) {
            mapper.map(&error, md);
        }
        Ok(())
    }

    fn name(&self) -> String {
        "map exception".to_owned()
    }
}
