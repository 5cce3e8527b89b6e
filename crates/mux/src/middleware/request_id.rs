use crate::handler::{BoxedHandler, RequestHandler};
use crate::middleware::Middleware;
use crate::{Request, ResponseBody};
use async_trait::async_trait;
use http::Response;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use tracing::{Instrument, info_span};

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REQUEST_ID_LEN: usize = 20;

/// Generates a random request id of 20 characters from `A-Z0-9`.
///
/// Ids are neither cryptographically secure nor guaranteed unique.
pub fn make_request_id() -> String {
    let mut rng = rand::thread_rng();
    (0..REQUEST_ID_LEN).map(|_| char::from(CHARSET[rng.gen_range(0..CHARSET.len())])).collect()
}

/// Identifier of a request, stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(make_request_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Assigns a [`RequestId`] to every request that does not carry one yet.
///
/// Everything downstream runs inside a `request` span with a `request_id` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestIdMiddleware;

impl Middleware for RequestIdMiddleware {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(RequestIdHandler { next })
    }
}

struct RequestIdHandler {
    next: BoxedHandler,
}

#[async_trait]
impl RequestHandler for RequestIdHandler {
    async fn invoke(&self, mut req: Request) -> Response<ResponseBody> {
        let request_id = match req.extensions().get::<RequestId>() {
            Some(request_id) => request_id.clone(),
            None => {
                let request_id = RequestId::generate();
                req.extensions_mut().insert(request_id.clone());
                request_id
            }
        };

        let span = info_span!("request", request_id = %request_id, method = %req.method(), path = req.uri().path());
        self.next.invoke(req).instrument(span).await
    }
}
