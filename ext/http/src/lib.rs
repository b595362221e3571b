//! chainer-http: HTTP domain for the chain pipeline
//!
//! This crate provides the pieces a web framework layers over the engine:
//!
//! 1. **Keys**: typed context slots for request and response facts ([`keys`])
//! 2. **Standard chains**: the request lifecycle, installed by [`CoreModule`]
//! 3. **Feature modules**: routing, CORS, exception mapping and introspection,
//!    each a [`ChainModule`](chainer::ChainModule) that only appends to the
//!    standard chains
//! 4. **Engine**: [`HttpEngine`], the boundary a transport adapter calls
//!
//! # Architecture
//!
//! ```text
//! transport → HttpRequest
//!         ↓ into_meta_data()
//! MetaData → INIT → PRE_PROCESS → … → POST_PROCESS
//!         ↓ from_meta_data()
//! HttpResponse → transport
//! ```
//!
//! # Example
//!
//! ```
//! use chainer::{MetaData, StringMatcher};
//! use chainer_http::prelude::*;
//!
//! let engine = HttpEngine::builder()
//!     .module(CorsModule::builder().allow_origin(StringMatcher::exact("https://app.example", false)).build())
//!     .module(
//!         RoutingModule::builder()
//!             .get("/users", |md: &mut MetaData| -> Result<(), HandlerError> {
//!                 md.set(&RESPONSE_BODY, "[]".to_owned());
//!                 Ok(())
//!             })
//!             .build(),
//!     )
//!     .module(ExceptionModule::new())
//!     .module(DebugModule::new())
//!     .build()?;
//!
//! let response = engine
//!     .handle(HttpRequest::builder().method("GET").path("/users").build())
//!     .unwrap();
//! assert_eq!(response.body, "[]");
//!
//! let response = engine
//!     .handle(HttpRequest::builder().method("GET").path("/internals").build())
//!     .unwrap();
//! assert_eq!(response.body, engine.registry().dump());
//! # Ok::<(), chainer::ConfigError>(())
//! ```

pub mod chains;
mod cors;
mod debug;
mod engine;
mod exception;
mod handler;
pub mod keys;
mod message;
mod routing;

#[cfg(feature = "registry")]
mod config;

pub use chains::CoreModule;
pub use cors::{CorsModule, CorsModuleBuilder};
pub use debug::{DebugModule, DEBUG};
pub use engine::{HttpEngine, HttpEngineBuilder};
pub use exception::{
    ExceptionMapper, ExceptionModule, ExceptionModuleBuilder, KindMapper, StatusMapper,
};
pub use handler::{Handler, HandlerError};
pub use message::{Headers, HttpRequest, HttpRequestBuilder, HttpResponse};
pub use routing::{RouteQuery, RoutingModule, RoutingModuleBuilder};

#[cfg(feature = "registry")]
pub use config::{
    register, HeaderCheck, HeaderCheckConfig, MethodCheck, MethodCheckConfig, PathCheck,
    PathCheckConfig, SetBody, SetHeader, SetStatus,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::chains::{
        DETERMINE_HANDLER, EXCEPTION_OCCURRED, INIT, INVOKE_HANDLER, POST_INVOKE, POST_PROCESS,
        PRE_PROCESS, PROCESS,
    };
    pub use super::keys::{
        EXCEPTION, HANDLER, QUERY_PARAMETERS, REQUEST_BODY, REQUEST_HEADERS, REQUEST_METHOD,
        REQUEST_PATH, RESPONSE_BODY, RESPONSE_HEADERS, RESPONSE_STATUS,
    };
    pub use super::{
        CoreModule, CorsModule, DebugModule, ExceptionMapper, ExceptionModule, Handler,
        HandlerError, Headers, HttpEngine, HttpRequest, HttpResponse, RoutingModule,
        StatusMapper,
    };
}
