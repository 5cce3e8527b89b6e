//! Request routing.
//!
//! A [`Router`] is assembled with a [`RouterBuilder`]: routes and middlewares are registered
//! first, then [`RouterBuilder::build`] freezes them and composes the middleware chain once.
//! A built router is immutable, it can be cloned and dispatched from any number of tasks.
//!
//! On dispatch the middleware chain runs first; its innermost handler percent-decodes the
//! request path, scans the routes in [`RouteOrder`], picks the first one whose method is equal
//! and whose template is compatible with the decoded path, stores the captured [`PathParams`] in the request extensions and
//! invokes the route's handler. Without such a route the not-found handler answers, by default
//! with `404 not found`.
//!
//! Routes are tried by specificity unless [`RouterBuilder::route_order`] says otherwise: a
//! template with more literal segments wins over one with captures, whatever the registration
//! order. This is not the composite-key-length ordering of `[METHOD]template` strings, which
//! stays available as [`RouteOrder::KeyLength`].
//!
//! # Examples
//!
//! ```
//! use micro_mux::router::get;
//! use micro_mux::{handler_fn, Request, RequestExt, Router};
//!
//! async fn hello(req: Request) -> String {
//!     format!("hello {}", req.path_param("name").unwrap_or("nobody"))
//! }
//!
//! let router = Router::builder().route("/hello/{name}", get(handler_fn(hello))).build();
//! assert_eq!(router.routes().len(), 1);
//! ```

mod route;

pub use route::Route;
pub use route::RouteOrder;

use crate::handler::{BoxedHandler, RequestHandler};
use crate::matcher::{extract_params, is_compatible};
use crate::middleware::{Middleware, MiddlewareChain};
use crate::responder::plain_text;
use crate::{PathParams, Request, ResponseBody, handler_fn};
use async_trait::async_trait;
use http::{Method, Response, StatusCode};
use route::boxed;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

/// An immutable set of routes wrapped in a middleware chain.
#[derive(Clone)]
pub struct Router {
    table: Arc<RouteTable>,
    entry: BoxedHandler,
}

/// The route found for a request and the parameters captured from its path.
#[derive(Debug)]
pub struct RouteMatch<'router> {
    route: &'router Route,
    params: PathParams,
}

impl<'router> RouteMatch<'router> {
    pub fn route(&self) -> &'router Route {
        self.route
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }
}

impl Router {
    /// Creates a new router builder
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Runs the request through the middleware chain and the matched route.
    ///
    /// Never fails: a request without matching route gets the not-found response.
    pub async fn dispatch(&self, req: Request) -> Response<ResponseBody> {
        self.entry.invoke(req).await
    }

    /// Finds the route serving `method` and `path`, without running any middleware.
    ///
    /// `path` is matched as given, it is not percent-decoded.
    pub fn at(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.table.at(method, path)
    }

    /// Routes in the order they are tried.
    pub fn routes(&self) -> &[Route] {
        &self.table.routes
    }

    pub fn route_order(&self) -> RouteOrder {
        self.table.order
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").field("order", &self.table.order).field("routes", &self.table.routes).finish()
    }
}

/// The innermost handler of the chain: route lookup and invocation.
struct RouteTable {
    routes: Vec<Route>,
    order: RouteOrder,
    not_found: BoxedHandler,
}

impl RouteTable {
    fn at(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let route =
            self.routes.iter().find(|route| route.method() == method && is_compatible(route.template(), path))?;

        match extract_params(route.template(), path) {
            Ok(params) => Some(RouteMatch { route, params }),
            Err(e) => {
                warn!(template = route.template(), path, cause = %e, "compatible route failed to extract params");
                None
            }
        }
    }
}

/// Percent-decodes a request path, a path not decoding to UTF-8 is kept as is.
fn decode_path(path: &str) -> Cow<'_, str> {
    urlencoding::decode(path).unwrap_or_else(|e| {
        debug!(path, cause = %e, "path is not utf-8 once decoded, matching it raw");
        Cow::Borrowed(path)
    })
}

#[async_trait]
impl RequestHandler for RouteTable {
    async fn invoke(&self, mut req: Request) -> Response<ResponseBody> {
        let found = {
            let path = decode_path(req.uri().path());
            self.at(req.method(), &path)
        };
        let Some(RouteMatch { route, params }) = found else {
            debug!(method = %req.method(), path = req.uri().path(), "no route matched");
            return self.not_found.invoke(req).await;
        };

        debug!(method = %req.method(), path = req.uri().path(), template = route.template(), "route matched");
        if let Some(existing) = req.extensions_mut().get_mut::<PathParams>() {
            existing.merge(params);
        } else {
            req.extensions_mut().insert(params);
        }

        route.handler().invoke(req).await
    }
}

async fn default_not_found(_req: Request) -> Response<ResponseBody> {
    plain_text(StatusCode::NOT_FOUND, "not found")
}

/// Collects routes and middlewares, [`build`](RouterBuilder::build) freezes them into a [`Router`].
pub struct RouterBuilder {
    routes: Vec<Route>,
    middlewares: MiddlewareChain,
    order: RouteOrder,
    not_found: Option<BoxedHandler>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self { routes: vec![], middlewares: MiddlewareChain::new(), order: RouteOrder::default(), not_found: None }
    }

    /// Registers `handler` for `method` requests whose path is compatible with `template`.
    ///
    /// The template is not validated: a malformed template is accepted and simply never
    /// matches anything but itself. Any method is accepted, an extension method only matches
    /// requests using that exact verb.
    pub fn add_route<H>(mut self, template: impl Into<String>, method: Method, handler: H) -> Self
    where
        H: RequestHandler + 'static,
    {
        let route = Route::new(template.into(), method, self.routes.len(), boxed(handler));
        self.order.insert(&mut self.routes, route);
        self
    }

    /// Registers a handler built with one of the method helpers such as [`get`] or [`post`].
    pub fn route(self, template: impl Into<String>, method_handler: MethodHandler) -> Self {
        let MethodHandler { method, handler } = method_handler;
        self.add_route(template, method, handler)
    }

    /// Appends a middleware, middlewares run in the order they are added.
    pub fn use_middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Sets the order routes are tried in, routes already added are re-sorted.
    pub fn route_order(mut self, order: RouteOrder) -> Self {
        self.order = order;
        order.sort(&mut self.routes);
        self
    }

    /// Replaces the handler answering requests no route matches.
    pub fn not_found<H: RequestHandler + 'static>(mut self, handler: H) -> Self {
        self.not_found = Some(boxed(handler));
        self
    }

    /// Freezes routes and middlewares, composing the middleware chain once.
    pub fn build(self) -> Router {
        let not_found = self.not_found.unwrap_or_else(|| boxed(handler_fn(default_not_found)));
        let table = Arc::new(RouteTable { routes: self.routes, order: self.order, not_found });

        let terminal: BoxedHandler = Arc::clone(&table) as BoxedHandler;
        let entry = self.middlewares.compose(terminal);

        debug!(routes = table.routes.len(), middlewares = self.middlewares.len(), order = ?table.order, "router built");
        Router { table, entry }
    }
}

impl std::fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("routes", &self.routes)
            .field("middlewares", &self.middlewares)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// A handler bound to a method, see [`RouterBuilder::route`].
pub struct MethodHandler {
    method: Method,
    handler: BoxedHandler,
}

impl std::fmt::Debug for MethodHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodHandler").field("method", &self.method).finish_non_exhaustive()
    }
}

macro_rules! method_handler {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Binds `handler` to HTTP ", stringify!($upper_case_method), " requests.")]
        pub fn $method<H: RequestHandler + 'static>(handler: H) -> MethodHandler {
            MethodHandler { method: Method::$upper_case_method, handler: boxed(handler) }
        }
    };
}

method_handler!(get, GET);
method_handler!(post, POST);
method_handler!(put, PUT);
method_handler!(delete, DELETE);
method_handler!(head, HEAD);
method_handler!(options, OPTIONS);
method_handler!(patch, PATCH);
