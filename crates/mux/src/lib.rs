//! A small HTTP request router.
//!
//! Routes pair a path template such as `/users/{id}/posts` with a method and a
//! [`RequestHandler`]. Templates are matched segment by segment, `{name}` segments capture the
//! corresponding path segment into [`PathParams`]. Middlewares wrap route dispatch and may
//! short-circuit it, [`middleware`] bundles CORS and request-id middlewares.
//!
//! ```
//! use http::StatusCode;
//! use micro_mux::middleware::{CorsMiddleware, RequestIdMiddleware};
//! use micro_mux::router::{get, post};
//! use micro_mux::{handler_fn, plain_text, Request, RequestExt, Router};
//!
//! let router = Router::builder()
//!     .use_middleware(CorsMiddleware::default())
//!     .use_middleware(RequestIdMiddleware)
//!     .route("/users/{id}", get(handler_fn(|req: Request| async move {
//!         plain_text(StatusCode::OK, req.path_param("id").unwrap_or_default())
//!     })))
//!     .route("/users", post(handler_fn(|_req: Request| async { (StatusCode::CREATED, "created") })))
//!     .build();
//! # let _ = router;
//! ```

mod body;
mod handler;
mod request;
mod responder;
mod service;

pub mod matcher;
pub mod middleware;
pub mod router;

pub use body::BoxError;
pub use body::RequestBody;
pub use body::ResponseBody;
pub use handler::BoxedHandler;
pub use handler::FnHandler;
pub use handler::RequestHandler;
pub use handler::handler_fn;
pub use matcher::TemplateMismatchError;
pub use request::PathParams;
pub use request::Request;
pub use request::RequestExt;
pub use responder::Json;
pub use responder::Responder;
pub use responder::internal_server_error;
pub use responder::json;
pub use responder::plain_text;
pub use router::Router;
pub use router::RouterBuilder;
