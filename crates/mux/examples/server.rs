//! Serves a router over HTTP/1 with hyper.
//!
//! ```sh
//! curl -i http://127.0.0.1:8080/ahoy/mux/hoya
//! curl -i -X OPTIONS -H 'Origin: https://app.example.com' -H 'Access-Control-Request-Method: POST' \
//!     http://127.0.0.1:8080/ahoy/mux/hoya
//! ```

use http::{Response, StatusCode};
use http_body_util::BodyExt;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use micro_mux::middleware::{CorsConfig, CorsMiddleware, RequestIdMiddleware};
use micro_mux::router::{get, post};
use micro_mux::{Json, Request, RequestExt, ResponseBody, Router, handler_fn, internal_server_error, json, plain_text};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Serialize)]
struct Greeting<'a> {
    name: &'a str,
    request_id: Option<String>,
}

async fn ahoy(req: Request) -> Response<ResponseBody> {
    let name = req.path_param("somekey").unwrap_or_default();
    info!(name, "greeting");
    json(StatusCode::OK, &Greeting { name, request_id: req.request_id().map(ToString::to_string) })
}

async fn echo(req: Request) -> Response<ResponseBody> {
    match req.into_body().collect().await {
        Ok(collected) => plain_text(StatusCode::OK, String::from_utf8_lossy(&collected.to_bytes())),
        Err(e) => internal_server_error(&*e),
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cors = CorsConfig { allowed_origins: vec!["https://*.example.com".into()], ..CorsConfig::default() };
    let router = Router::builder()
        .use_middleware(RequestIdMiddleware)
        .use_middleware(CorsMiddleware::new(cors))
        .route("/ahoy/{somekey}/hoya", get(handler_fn(ahoy)))
        .route("/echo", post(handler_fn(echo)))
        .route("/health", get(handler_fn(|_req: Request| async { Json(serde_json::json!({ "status": "up" })) })))
        .build();

    info!(port = 8080, "start listening");
    let listener = match TcpListener::bind("127.0.0.1:8080").await {
        Ok(listener) => listener,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let service = TowerToHyperService::new(router.clone());
        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                error!(%remote_addr, cause = %e, "connection error");
            }
        });
    }
}
