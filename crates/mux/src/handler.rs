use crate::responder::Responder;
use crate::{Request, ResponseBody};
use async_trait::async_trait;
use http::Response;
use std::marker::PhantomData;
use std::sync::Arc;

/// Handles one request and produces its response.
///
/// The router never inspects what a handler does: errors are turned into responses by the
/// handler itself, for example with [`internal_server_error`](crate::responder::internal_server_error).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: Request) -> Response<ResponseBody>;
}

/// A shared, type-erased handler, as passed along the middleware chain.
pub type BoxedHandler = Arc<dyn RequestHandler>;

#[async_trait]
impl<H: RequestHandler + ?Sized> RequestHandler for Arc<H> {
    async fn invoke(&self, req: Request) -> Response<ResponseBody> {
        self.as_ref().invoke(req).await
    }
}

#[async_trait]
impl<H: RequestHandler + ?Sized> RequestHandler for Box<H> {
    async fn invoke(&self, req: Request) -> Response<ResponseBody> {
        self.as_ref().invoke(req).await
    }
}

/// a holder for an async `Fn(Request)` whose output is a [`Responder`]
pub struct FnHandler<F, Fut> {
    f: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnHandler<F, Fut>
where
    F: Fn(Request) -> Fut,
{
    fn new(f: F) -> Self {
        Self { f, _phantom: PhantomData }
    }
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F, Fut>
where
    F: Fn(Request) -> Fut,
{
    FnHandler::new(f)
}

impl<F, Fut> std::fmt::Debug for FnHandler<F, Fut> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F, Fut>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future + Send,
    Fut::Output: Responder,
{
    async fn invoke(&self, req: Request) -> Response<ResponseBody> {
        (self.f)(req).await.into_response()
    }
}
