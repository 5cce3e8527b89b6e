//! Response writing helpers.
//!
//! This module provides the [`Responder`] trait which defines how different types
//! can be converted into HTTP responses, and the helpers handlers use to answer with
//! plain text, JSON, or an internal server error.

use crate::body::ResponseBody;
use http::{HeaderValue, Response, StatusCode};
use mime::Mime;
use serde::Serialize;
use std::convert::Infallible;
use std::error::Error;

/// A trait for types that can be converted into HTTP responses.
///
/// Types implementing this trait can be returned directly from handlers built with
/// [`handler_fn`](crate::handler_fn).
pub trait Responder {
    fn into_response(self) -> Response<ResponseBody>;
}

/// Serializes the wrapped value as an `application/json` response with status 200.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

fn content_type(mime: &Mime) -> HeaderValue {
    HeaderValue::from_str(mime.as_ref()).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

fn response_with(status: StatusCode, mime: &Mime, body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(http::header::CONTENT_TYPE, content_type(mime));
    response
}

/// Writes `text` as a `text/plain` response with the given status.
pub fn plain_text(status: StatusCode, text: impl Into<String>) -> Response<ResponseBody> {
    response_with(status, &mime::TEXT_PLAIN_UTF_8, ResponseBody::from(text.into()))
}

/// Writes `value` as an `application/json` response with the given status.
///
/// If `value` can not be serialized, a 500 plain text response describing the failure is
/// written instead.
pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response<ResponseBody> {
    match serde_json::to_vec(value) {
        Ok(bytes) => response_with(status, &mime::APPLICATION_JSON, ResponseBody::from(bytes)),
        Err(e) => plain_text(StatusCode::INTERNAL_SERVER_ERROR, format!("error marshaling json. got {e}")),
    }
}

/// Writes a 500 plain text response describing `err`.
pub fn internal_server_error<E: Error + ?Sized>(err: &E) -> Response<ResponseBody> {
    plain_text(StatusCode::INTERNAL_SERVER_ERROR, format!("error while serving request. got {err}"))
}

impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn into_response(self) -> Response<ResponseBody> {
        match self {
            Ok(t) => t.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

/// None case returns an empty response.
impl<T: Responder> Responder for Option<T> {
    fn into_response(self) -> Response<ResponseBody> {
        match self {
            Some(t) => t.into_response(),
            None => Response::new(ResponseBody::empty()),
        }
    }
}

impl<B> Responder for Response<B>
where
    B: Into<ResponseBody>,
{
    fn into_response(self) -> Response<ResponseBody> {
        self.map(Into::into)
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn into_response(self) -> Response<ResponseBody> {
        let (status, responder) = self;
        let mut response = responder.into_response();
        *response.status_mut() = status;
        response
    }
}

impl<T: Responder> Responder for (T, StatusCode) {
    fn into_response(self) -> Response<ResponseBody> {
        let (responder, status) = self;
        (status, responder).into_response()
    }
}

impl Responder for () {
    fn into_response(self) -> Response<ResponseBody> {
        Response::new(ResponseBody::empty())
    }
}

impl Responder for &'static str {
    fn into_response(self) -> Response<ResponseBody> {
        response_with(StatusCode::OK, &mime::TEXT_PLAIN_UTF_8, ResponseBody::from(self))
    }
}

impl Responder for String {
    fn into_response(self) -> Response<ResponseBody> {
        plain_text(StatusCode::OK, self)
    }
}

impl<T: Serialize> Responder for Json<T> {
    fn into_response(self) -> Response<ResponseBody> {
        json(StatusCode::OK, &self.0)
    }
}

impl Responder for Infallible {
    fn into_response(self) -> Response<ResponseBody> {
        match self {}
    }
}
