//! Mounts a [`Router`] on any host speaking [`tower::Service`], e.g. a hyper server through
//! `hyper_util::service::TowerToHyperService`.

use crate::body::BoxError;
use crate::{RequestBody, ResponseBody, Router};
use bytes::Bytes;
use futures::future::BoxFuture;
use http::Response;
use http_body::Body;
use std::convert::Infallible;
use std::task::{Context, Poll};
use tower::Service;

impl<B> Service<http::Request<B>> for Router
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    #[inline]
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let router = self.clone();
        let req = req.map(RequestBody::new);
        Box::pin(async move { Ok(router.dispatch(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use crate::router::get;
    use crate::{Request, RequestExt, Router, handler_fn};
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::{BodyExt, Full};
    use tower::{Service, ServiceExt};

    fn router() -> Router {
        Router::builder()
            .route(
                "/echo/{name}",
                get(handler_fn(|req: Request| async move {
                    let name = req.path_param("name").unwrap_or_default().to_owned();
                    let body = req.into_body().collect().await.map(|c| c.to_bytes()).unwrap_or_default();
                    format!("{name}:{}", String::from_utf8_lossy(&body))
                })),
            )
            .build()
    }

    #[tokio::test]
    async fn test_call_as_service() {
        let mut service = router();
        let req = http::Request::get("/echo/mux").body(Full::new(Bytes::from_static(b"payload"))).unwrap();

        let ready = ServiceExt::<http::Request<Full<Bytes>>>::ready(&mut service).await.unwrap();
        let resp = ready.call(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"mux:payload");
    }

    #[tokio::test]
    async fn test_oneshot_not_found() {
        let req = http::Request::get("/nowhere").body(String::new()).unwrap();

        let resp = router().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
