//! Routing — method + path → handler through a [`FilterMap`].
//!
//! Routes are tried in the order they were added; the first whose method and
//! path both accept the request wins. No match answers 404 and jumps straight
//! to `POST_PROCESS`, so `INVOKE_HANDLER` never sees a request without a
//! handler.

use crate::chains::{DETERMINE_HANDLER, POST_PROCESS};
use crate::keys::{HANDLER, REQUEST_METHOD, REQUEST_PATH, RESPONSE_BODY, RESPONSE_STATUS};
use crate::Handler;
use chainer::prelude::*;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// What routes are matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteQuery {
    pub method: String,
    pub path: String,
}

type RouteMap = FilterMap<RouteQuery, Arc<dyn Handler>>;

/// Installs route resolution on `DETERMINE_HANDLER`.
pub struct RoutingModule {
    routes: Arc<RouteMap>,
    descriptions: Vec<String>,
}

impl RoutingModule {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> RoutingModuleBuilder {
        RoutingModuleBuilder::default()
    }

    /// `METHOD matcher` for each route, in match order.
    #[must_use]
    pub fn routes(&self) -> &[String] {
        &self.descriptions
    }
}

impl fmt::Debug for RoutingModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingModule")
            .field("routes", &self.descriptions)
            .finish()
    }
}

impl ChainModule for RoutingModule {
    fn name(&self) -> &str {
        "http.routing"
    }

    fn register(&self, ext: &mut ChainExtender<'_>) -> Result<(), ConfigError> {
        ext.append_processor(
            DETERMINE_HANDLER,
            ResolveRoute {
                routes: Arc::clone(&self.routes),
            },
        )?
        .append_rule(
            DETERMINE_HANDLER,
            Rule::new(
                Condition::absent(&HANDLER),
                Action::Jump(POST_PROCESS),
                "no route",
            ),
        )?;
        Ok(())
    }
}

/// Builder for [`RoutingModule`].
#[derive(Default)]
pub struct RoutingModuleBuilder {
    routes: FilterMapBuilder<RouteQuery, Arc<dyn Handler>>,
    descriptions: Vec<String>,
}

impl RoutingModuleBuilder {
    /// Add a route. `method` of `None` accepts every method.
    #[must_use]
    pub fn route(
        mut self,
        method: Option<&str>,
        path: StringMatcher,
        handler: impl Handler + 'static,
    ) -> Self {
        let method = method.map(str::to_ascii_uppercase);
        self.descriptions.push(format!(
            "{} {path}",
            method.as_deref().unwrap_or("*")
        ));
        let filter = move |query: &RouteQuery| {
            method.as_ref().map_or(true, |m| *m == query.method) && path.is_match(&query.path)
        };
        self.routes = self.routes.put(filter, Arc::new(handler) as Arc<dyn Handler>);
        self
    }

    /// Shorthand for an exact-path `GET` route.
    #[must_use]
    pub fn get(self, path: &str, handler: impl Handler + 'static) -> Self {
        self.route(Some("GET"), StringMatcher::exact(path, false), handler)
    }

    /// Shorthand for an exact-path `POST` route.
    #[must_use]
    pub fn post(self, path: &str, handler: impl Handler + 'static) -> Self {
        self.route(Some("POST"), StringMatcher::exact(path, false), handler)
    }

    /// Build the module.
    #[must_use]
    pub fn build(self) -> RoutingModule {
        RoutingModule {
            routes: Arc::new(self.routes.build()),
            descriptions: self.descriptions,
        }
    }
}

/// Sets [`HANDLER`] from the route table, or answers 404.
struct ResolveRoute {
    routes: Arc<RouteMap>,
}

impl fmt::Debug for ResolveRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveRoute")
            .field("routes", &self.routes.len())
            .finish()
    }
}

impl Processor for ResolveRoute {
    fn apply(&self, md: &mut MetaData) -> Result<(), PipelineError> {
        let query = RouteQuery {
            method: md.get(&REQUEST_METHOD)?.clone(),
            path: md.get(&REQUEST_PATH)?.clone(),
        };
        match self.routes.map(&query) {
            Ok(handler) => {
                debug!(method = %query.method, path = %query.path, "route resolved");
                md.set(&HANDLER, Arc::clone(handler));
            }
            Err(_) => {
                debug!(method = %query.method, path = %query.path, "no route");
                md.set(&RESPONSE_STATUS, 404);
                md.set(
                    &RESPONSE_BODY,
                    format!("no route for {} {}", query.method, query.path),
                );
            }
        }
        Ok(())
    }

    fn name(&self) -> String {
        "resolve route".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CoreModule, HandlerError, HttpEngine, HttpRequest};

    fn ok(body: &'static str) -> impl Handler {
        move |md: &mut MetaData| -> Result<(), HandlerError> {
            md.set(&RESPONSE_BODY, body.to_owned());
            Ok(())
        }
    }

    fn engine() -> HttpEngine {
        HttpEngine::builder()
            .module(
                RoutingModule::builder()
                    .get("/users", ok("list"))
                    .post("/users", ok("create"))
                    .route(None, StringMatcher::prefix("/users/", false), ok("one"))
                    .route(None, StringMatcher::prefix("/", false), ok("fallback"))
                    .build(),
            )
            .build()
            .unwrap()
    }

    fn body(engine: &HttpEngine, method: &str, path: &str) -> String {
        let request = HttpRequest::builder().method(method).path(path).build();
        engine.handle(request).unwrap().body
    }

    #[test]
    fn method_and_path_select_handler() {
        let engine = engine();
        assert_eq!(body(&engine, "GET", "/users"), "list");
        assert_eq!(body(&engine, "post", "/users"), "create");
        assert_eq!(body(&engine, "DELETE", "/users/7"), "one");
        assert_eq!(body(&engine, "PUT", "/users"), "fallback");
    }

    #[test]
    fn no_route_answers_404() {
        let engine = HttpEngine::builder()
            .module(RoutingModule::builder().get("/users", ok("list")).build())
            .build()
            .unwrap();
        let request = HttpRequest::builder().method("GET").path("/nope").build();
        let response = engine.handle(request).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.body, "no route for GET /nope");
    }

    #[test]
    fn no_route_skips_invoke() {
        let registry = ModuleRegistry::new()
            .with_module(CoreModule)
            .with_module(RoutingModule::builder().build())
            .build()
            .unwrap();
        let mut md = HttpRequest::builder()
            .method("GET")
            .path("/")
            .build()
            .into_meta_data();
        let trace = registry.run_with_trace(&mut md, crate::chains::INIT);
        assert!(trace.result.is_ok());
        assert_eq!(
            trace.chains_visited().last(),
            Some(&"POST_PROCESS")
        );
        assert!(!trace.chains_visited().contains(&"INVOKE_HANDLER"));
    }

    #[test]
    fn describes_routes() {
        let module = RoutingModule::builder()
            .get("/a", ok("a"))
            .route(None, StringMatcher::prefix("/b", true), ok("b"))
            .build();
        assert_eq!(
            module.routes(),
            ["GET exact \"/a\"", "* prefix \"/b\" (ignore case)"]
        );
    }
}
