//! Middleware composition.
//!
//! A middleware turns the "next" handler into a decorated handler. It may act before and after
//! calling next, or answer on its own and never call it, which short-circuits every middleware
//! registered after it together with the matched route.
//!
//! A [`MiddlewareChain`] keeps middlewares in registration order and composes them in reverse,
//! so at request time the first registered middleware runs first:
//!
//! ```text
//! chain [m1, m2] + terminal  =>  m1(m2(terminal))
//! ```
//!
//! # Examples
//!
//! ```
//! use micro_mux::middleware::MiddlewareChain;
//! use micro_mux::{handler_fn, BoxedHandler, Request, RequestHandler};
//! use std::sync::Arc;
//!
//! let mut chain = MiddlewareChain::new();
//! chain.push(|next: BoxedHandler| {
//!     handler_fn(move |req: Request| {
//!         let next = Arc::clone(&next);
//!         async move { next.invoke(req).await }
//!     })
//! });
//!
//! let terminal: BoxedHandler = Arc::new(handler_fn(|_req: Request| async { "hello" }));
//! let _handler = chain.compose(terminal);
//! ```

mod cors;
mod request_id;

pub use cors::CorsConfig;
pub use cors::CorsMiddleware;
pub use request_id::RequestId;
pub use request_id::RequestIdMiddleware;
pub use request_id::make_request_id;

use crate::handler::{BoxedHandler, RequestHandler};
use std::sync::Arc;

/// Builds a handler around the next one in the chain.
///
/// Any `Fn(BoxedHandler) -> H` where `H` is a [`RequestHandler`] is a middleware.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<F, H> Middleware for F
where
    F: Fn(BoxedHandler) -> H + Send + Sync,
    H: RequestHandler + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new((self)(next))
    }
}

pub trait MiddlewareExt: Middleware {
    /// Composes two middlewares into one, `self` runs before `middleware`.
    fn and_then<M>(self, middleware: M) -> MiddlewareComposer<Self, M>
    where
        Self: Sized,
        M: Middleware,
    {
        MiddlewareComposer::new(self, middleware)
    }
}

impl<T: Middleware> MiddlewareExt for T {}

#[derive(Debug, Clone, Copy)]
pub struct MiddlewareComposer<M1, M2> {
    outer: M1,
    inner: M2,
}

impl<M1, M2> MiddlewareComposer<M1, M2> {
    pub fn new(outer: M1, inner: M2) -> Self {
        Self { outer, inner }
    }
}

impl<M1, M2> Middleware for MiddlewareComposer<M1, M2>
where
    M1: Middleware,
    M2: Middleware,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let inner = self.inner.wrap(next);
        self.outer.wrap(inner)
    }
}

/// Middlewares in registration order.
#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self { middlewares: vec![] }
    }

    /// Appends a middleware, it will run after every middleware pushed before it.
    pub fn push<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Box::new(middleware));
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Wraps `terminal` with every middleware, innermost first.
    pub fn compose(&self, terminal: BoxedHandler) -> BoxedHandler {
        self.middlewares.iter().rev().fold(terminal, |next, middleware| middleware.wrap(next))
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain").field("len", &self.middlewares.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Request, ResponseBody, handler_fn};
    use http::{Response, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Mutex;

    type Trace = Arc<Mutex<Vec<String>>>;

    /// records "name>" before calling next and "<name" after it
    fn tracing_middleware(name: &'static str, trace: Trace) -> impl Middleware {
        move |next: BoxedHandler| {
            let trace = Arc::clone(&trace);
            handler_fn(move |req: Request| {
                let next = Arc::clone(&next);
                let trace = Arc::clone(&trace);
                async move {
                    trace.lock().unwrap().push(format!("{name}>"));
                    let resp = next.invoke(req).await;
                    trace.lock().unwrap().push(format!("<{name}"));
                    resp
                }
            })
        }
    }

    fn terminal(trace: Trace) -> BoxedHandler {
        Arc::new(handler_fn(move |_req: Request| {
            let trace = Arc::clone(&trace);
            async move {
                trace.lock().unwrap().push("handler".into());
                (StatusCode::BAD_REQUEST, "AHOY")
            }
        }))
    }

    async fn body_string(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_chain_returns_terminal() {
        let trace = Trace::default();
        let chain = MiddlewareChain::new();
        assert!(chain.is_empty());

        let handler = chain.compose(terminal(Arc::clone(&trace)));
        let resp = handler.invoke(Request::new("".into())).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(*trace.lock().unwrap(), vec!["handler"]);
    }

    #[tokio::test]
    async fn test_registration_order_is_execution_order() {
        let trace = Trace::default();
        let mut chain = MiddlewareChain::new();
        chain.push(tracing_middleware("m1", Arc::clone(&trace))).push(tracing_middleware("m2", Arc::clone(&trace)));
        assert_eq!(chain.len(), 2);

        let handler = chain.compose(terminal(Arc::clone(&trace)));
        let resp = handler.invoke(Request::new("".into())).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(resp).await, "AHOY");
        assert_eq!(*trace.lock().unwrap(), vec!["m1>", "m2>", "handler", "<m2", "<m1"]);
    }

    #[tokio::test]
    async fn test_short_circuit() {
        let trace = Trace::default();
        let mut chain = MiddlewareChain::new();

        let stopper_trace = Arc::clone(&trace);
        chain.push(move |_next: BoxedHandler| {
            let trace = Arc::clone(&stopper_trace);
            handler_fn(move |_req: Request| {
                let trace = Arc::clone(&trace);
                async move { trace.lock().unwrap().push("stop".into()) }
            })
        });
        chain.push(tracing_middleware("m2", Arc::clone(&trace)));

        let handler = chain.compose(terminal(Arc::clone(&trace)));
        let resp = handler.invoke(Request::new("".into())).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(*trace.lock().unwrap(), vec!["stop"]);
    }

    #[tokio::test]
    async fn test_and_then() {
        let trace = Trace::default();
        let composed =
            tracing_middleware("first", Arc::clone(&trace)).and_then(tracing_middleware("second", Arc::clone(&trace)));

        let handler = composed.wrap(terminal(Arc::clone(&trace)));
        handler.invoke(Request::new("".into())).await;

        assert_eq!(*trace.lock().unwrap(), vec!["first>", "second>", "handler", "<second", "<first"]);
    }
}
