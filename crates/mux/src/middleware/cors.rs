//! Cross-Origin Resource Sharing.
//!
//! [`CorsMiddleware`] answers every `OPTIONS` request itself with `200 OK`, so such requests
//! never reach the routes. A request carrying `Access-Control-Request-Method` is treated as a
//! preflight and gets the allow-method/allow-headers/max-age set; every other request is served
//! by the rest of the chain and the allow-origin/expose-headers set is added to its response.
//!
//! A request whose origin, method or headers are not allowed gets no CORS headers at all, the
//! browser then refuses the response. The request itself is still served.
//!
//! # Examples
//!
//! ```
//! use micro_mux::middleware::{CorsConfig, CorsMiddleware};
//!
//! let config = CorsConfig {
//!     allowed_origins: vec!["https://*.example.com".into()],
//!     allow_credentials: false,
//!     ..CorsConfig::default()
//! };
//! let _cors = CorsMiddleware::new(config);
//! ```

use crate::handler::{BoxedHandler, RequestHandler};
use crate::middleware::Middleware;
use crate::{Request, ResponseBody};
use async_trait::async_trait;
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
    ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use http::{HeaderMap, HeaderValue, Method, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const WILDCARD: &str = "*";
const PREFLIGHT_VARY: &str = "Origin, Access-Control-Request-Method, Access-Control-Request-Headers";

/// Options of a [`CorsMiddleware`].
///
/// Can be deserialized from any serde format, missing fields take their [`Default`] value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to issue cross-site requests. `*` allows any origin, an entry may contain
    /// one `*` wildcard such as `https://*.example.com`. Empty means any origin.
    pub allowed_origins: Vec<String>,
    /// Methods allowed for cross-site requests. Empty means `GET`, `POST` and `HEAD`.
    pub allowed_methods: Vec<String>,
    /// Headers a client may send on cross-site requests. `*` allows any header.
    pub allowed_headers: Vec<String>,
    /// Response headers made visible to the client.
    pub exposed_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Seconds a preflight result may be cached, 0 omits the header.
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![WILDCARD.into()],
            allowed_methods: ["POST", "GET", "DELETE", "PUT"].map(String::from).to_vec(),
            allowed_headers: [
                "Authorization",
                "Content-Type",
                "Content-Length",
                "Content-Encoding",
                "Accept",
                "Accept-Encoding",
            ]
            .map(String::from)
            .to_vec(),
            exposed_headers: [WILDCARD, "Authorization"].map(String::from).to_vec(),
            allow_credentials: true,
            max_age: 300,
        }
    }
}

/// An origin pattern with at most one `*`.
#[derive(Debug)]
struct OriginPattern {
    prefix: String,
    suffix: String,
}

impl OriginPattern {
    fn matches(&self, origin: &str) -> bool {
        origin.len() >= self.prefix.len() + self.suffix.len()
            && origin.starts_with(&self.prefix)
            && origin.ends_with(&self.suffix)
    }
}

/// The normalized, immutable form of a [`CorsConfig`].
#[derive(Debug)]
struct CorsPolicy {
    allow_all_origins: bool,
    origins: Vec<String>,
    origin_patterns: Vec<OriginPattern>,
    methods: Vec<Method>,
    allow_all_headers: bool,
    headers: Vec<String>,
    exposed_headers: Option<HeaderValue>,
    allow_credentials: bool,
    max_age: Option<HeaderValue>,
}

impl CorsPolicy {
    fn new(config: CorsConfig) -> Self {
        let mut allow_all_origins = config.allowed_origins.is_empty();
        let mut origins = vec![];
        let mut origin_patterns = vec![];
        for origin in config.allowed_origins {
            let origin = origin.to_ascii_lowercase();
            if origin == WILDCARD {
                allow_all_origins = true;
            } else if let Some((prefix, suffix)) = origin.split_once('*') {
                origin_patterns.push(OriginPattern { prefix: prefix.to_owned(), suffix: suffix.to_owned() });
            } else {
                origins.push(origin);
            }
        }

        let methods = if config.allowed_methods.is_empty() {
            vec![Method::GET, Method::POST, Method::HEAD]
        } else {
            config
                .allowed_methods
                .iter()
                .filter_map(|method| Method::from_bytes(method.to_ascii_uppercase().as_bytes()).ok())
                .collect()
        };

        let allowed_headers = if config.allowed_headers.is_empty() {
            ["Accept", "Content-Type", "X-Requested-With"].map(String::from).to_vec()
        } else {
            config.allowed_headers
        };
        let allow_all_headers = allowed_headers.iter().any(|header| header == WILDCARD);
        let mut headers = allowed_headers.into_iter().map(|header| header.to_ascii_lowercase()).collect::<Vec<_>>();
        // browsers list Origin among the request headers of a preflight
        headers.push(ORIGIN.as_str().to_owned());

        let exposed_headers = (!config.exposed_headers.is_empty())
            .then(|| HeaderValue::from_str(&config.exposed_headers.join(", ")).ok())
            .flatten();
        let max_age = (config.max_age > 0).then(|| HeaderValue::from(config.max_age));

        Self {
            allow_all_origins,
            origins,
            origin_patterns,
            methods,
            allow_all_headers,
            headers,
            exposed_headers,
            allow_credentials: config.allow_credentials,
            max_age,
        }
    }

    fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.allow_all_origins {
            return true;
        }
        let origin = origin.to_ascii_lowercase();
        self.origins.iter().any(|allowed| *allowed == origin)
            || self.origin_patterns.iter().any(|pattern| pattern.matches(&origin))
    }

    fn is_method_allowed(&self, method: &Method) -> bool {
        // preflights are always allowed
        *method == Method::OPTIONS || self.methods.contains(method)
    }

    fn are_headers_allowed(&self, requested: &str) -> bool {
        if self.allow_all_headers {
            return true;
        }
        requested
            .split(',')
            .map(str::trim)
            .filter(|header| !header.is_empty())
            .all(|header| self.headers.iter().any(|allowed| allowed.eq_ignore_ascii_case(header)))
    }

    /// With credentials the literal `*` is rejected by browsers, so the origin is echoed instead.
    fn allow_origin_value(&self, origin: &HeaderValue) -> HeaderValue {
        if self.allow_all_origins && !self.allow_credentials {
            HeaderValue::from_static(WILDCARD)
        } else {
            origin.clone()
        }
    }

    fn preflight_headers(&self, request_headers: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.append(VARY, HeaderValue::from_static(PREFLIGHT_VARY));

        let Some(origin) = request_headers.get(ORIGIN) else {
            debug!("preflight aborted: empty origin");
            return headers;
        };
        if !origin.to_str().is_ok_and(|origin| self.is_origin_allowed(origin)) {
            debug!(?origin, "preflight aborted: origin not allowed");
            return headers;
        }

        let Some(method) = request_headers
            .get(ACCESS_CONTROL_REQUEST_METHOD)
            .and_then(|value| Method::from_bytes(value.as_bytes().to_ascii_uppercase().as_slice()).ok())
        else {
            debug!("preflight aborted: invalid request method");
            return headers;
        };
        if !self.is_method_allowed(&method) {
            debug!(%method, "preflight aborted: method not allowed");
            return headers;
        }

        let requested_headers = request_headers.get(ACCESS_CONTROL_REQUEST_HEADERS);
        let requested = requested_headers.and_then(|value| value.to_str().ok()).unwrap_or_default();
        if !self.are_headers_allowed(requested) {
            debug!(requested, "preflight aborted: headers not allowed");
            return headers;
        }

        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin_value(origin));
        if let Ok(method) = HeaderValue::from_str(method.as_str()) {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, method);
        }
        if let Some(requested_headers) = requested_headers.filter(|value| !value.is_empty()) {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested_headers.clone());
        }
        if self.allow_credentials {
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
        if let Some(max_age) = &self.max_age {
            headers.insert(ACCESS_CONTROL_MAX_AGE, max_age.clone());
        }
        headers
    }

    fn actual_headers(&self, method: &Method, request_headers: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.append(VARY, HeaderValue::from_static("Origin"));

        let Some(origin) = request_headers.get(ORIGIN) else {
            return headers;
        };
        if !origin.to_str().is_ok_and(|origin| self.is_origin_allowed(origin)) {
            debug!(?origin, "actual request: origin not allowed");
            return headers;
        }
        if !self.is_method_allowed(method) {
            debug!(%method, "actual request: method not allowed");
            return headers;
        }

        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin_value(origin));
        if let Some(exposed_headers) = &self.exposed_headers {
            headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, exposed_headers.clone());
        }
        if self.allow_credentials {
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
        headers
    }
}

/// Copies CORS headers into a response, `Vary` is appended to what the handler already set.
fn apply(cors_headers: &HeaderMap, response_headers: &mut HeaderMap) {
    for (name, value) in cors_headers {
        if name == VARY {
            response_headers.append(name, value.clone());
        } else {
            response_headers.insert(name, value.clone());
        }
    }
}

/// Middleware adding CORS headers and answering `OPTIONS` requests.
///
/// Each instance owns its configuration, two routers may use different policies.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    policy: Arc<CorsPolicy>,
}

impl CorsMiddleware {
    pub fn new(config: CorsConfig) -> Self {
        Self { policy: Arc::new(CorsPolicy::new(config)) }
    }
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::new(CorsConfig::default())
    }
}

impl Middleware for CorsMiddleware {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(CorsHandler { policy: Arc::clone(&self.policy), next })
    }
}

struct CorsHandler {
    policy: Arc<CorsPolicy>,
    next: BoxedHandler,
}

#[async_trait]
impl RequestHandler for CorsHandler {
    async fn invoke(&self, req: Request) -> Response<ResponseBody> {
        if req.method() == Method::OPTIONS {
            let cors_headers = if req.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD) {
                self.policy.preflight_headers(req.headers())
            } else {
                self.policy.actual_headers(req.method(), req.headers())
            };

            let mut response = Response::new(ResponseBody::empty());
            apply(&cors_headers, response.headers_mut());
            return response;
        }

        let cors_headers = self.policy.actual_headers(req.method(), req.headers());
        let mut response = self.next.invoke(req).await;
        apply(&cors_headers, response.headers_mut());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::MockRequestHandler;
    use crate::responder::plain_text;
    use http::StatusCode;

    fn request(method: Method, headers: &[(&str, &str)]) -> Request {
        let mut builder = http::Request::builder().method(method).uri("/testing");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body("".into()).unwrap()
    }

    fn ok_handler() -> BoxedHandler {
        let mut handler = MockRequestHandler::new();
        handler.expect_invoke().times(1).returning(|_| plain_text(StatusCode::OK, "OK"));
        Arc::new(handler)
    }

    fn unreachable_handler() -> BoxedHandler {
        let mut handler = MockRequestHandler::new();
        handler.expect_invoke().never();
        Arc::new(handler)
    }

    #[tokio::test]
    async fn test_options_never_reaches_next() {
        let handler = CorsMiddleware::default().wrap(unreachable_handler());

        let resp = handler.invoke(request(Method::OPTIONS, &[("Origin", "https://other.com")])).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://other.com");
    }

    #[tokio::test]
    async fn test_preflight() {
        let handler = CorsMiddleware::default().wrap(unreachable_handler());

        let resp = handler
            .invoke(request(
                Method::OPTIONS,
                &[
                    ("Origin", "https://other.com"),
                    ("Access-Control-Request-Method", "put"),
                    ("Access-Control-Request-Headers", "Content-Type, Authorization"),
                ],
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers();
        assert_eq!(headers[VARY], PREFLIGHT_VARY);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "https://other.com");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "PUT");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type, Authorization");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[ACCESS_CONTROL_MAX_AGE], "300");
    }

    #[tokio::test]
    async fn test_preflight_rejects_method_and_headers() {
        let handler = CorsMiddleware::default().wrap(unreachable_handler());

        let resp = handler
            .invoke(request(
                Method::OPTIONS,
                &[("Origin", "https://other.com"), ("Access-Control-Request-Method", "PATCH")],
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!resp.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));

        let resp = handler
            .invoke(request(
                Method::OPTIONS,
                &[
                    ("Origin", "https://other.com"),
                    ("Access-Control-Request-Method", "GET"),
                    ("Access-Control-Request-Headers", "X-Secret"),
                ],
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!resp.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_actual_request() {
        let handler = CorsMiddleware::default().wrap(ok_handler());

        let resp = handler.invoke(request(Method::GET, &[("Origin", "https://other.com")])).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers();
        assert_eq!(headers[VARY], "Origin");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "https://other.com");
        assert_eq!(headers[ACCESS_CONTROL_EXPOSE_HEADERS], "*, Authorization");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert!(!headers.contains_key(ACCESS_CONTROL_MAX_AGE));
    }

    #[tokio::test]
    async fn test_actual_request_without_origin() {
        let handler = CorsMiddleware::default().wrap(ok_handler());

        let resp = handler.invoke(request(Method::GET, &[])).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[VARY], "Origin");
        assert!(!resp.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_wildcard_without_credentials() {
        let config = CorsConfig { allow_credentials: false, ..CorsConfig::default() };
        let handler = CorsMiddleware::new(config).wrap(ok_handler());

        let resp = handler.invoke(request(Method::GET, &[("Origin", "https://other.com")])).await;

        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(!resp.headers().contains_key(ACCESS_CONTROL_ALLOW_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_origin_not_allowed_still_served() {
        let config = CorsConfig { allowed_origins: vec!["https://*.example.com".into()], ..CorsConfig::default() };
        let handler = CorsMiddleware::new(config).wrap(ok_handler());

        let resp = handler.invoke(request(Method::GET, &[("Origin", "https://evil.com")])).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!resp.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[test]
    fn test_origin_patterns() {
        let policy = CorsPolicy::new(CorsConfig {
            allowed_origins: vec!["https://*.example.com".into(), "http://LOCALHOST:8080".into()],
            ..CorsConfig::default()
        });

        assert!(policy.is_origin_allowed("https://api.example.com"));
        assert!(policy.is_origin_allowed("https://API.example.com"));
        assert!(policy.is_origin_allowed("http://localhost:8080"));
        assert!(!policy.is_origin_allowed("https://example.com"));
        assert!(!policy.is_origin_allowed("http://api.example.com"));
        assert!(!policy.is_origin_allowed("http://localhost:9090"));
    }

    #[test]
    fn test_empty_lists_fall_back() {
        let policy = CorsPolicy::new(CorsConfig {
            allowed_origins: vec![],
            allowed_methods: vec![],
            allowed_headers: vec![],
            ..CorsConfig::default()
        });

        assert!(policy.is_origin_allowed("https://anything.org"));
        assert!(policy.is_method_allowed(&Method::HEAD));
        assert!(policy.is_method_allowed(&Method::OPTIONS));
        assert!(!policy.is_method_allowed(&Method::DELETE));
        assert!(policy.are_headers_allowed("accept, x-requested-with, origin"));
        assert!(!policy.are_headers_allowed("authorization"));
    }

    #[test]
    fn test_config_from_json() {
        let config: CorsConfig = serde_json::from_str(
            r#"{ "allowed_origins": ["https://example.com"], "allow_credentials": false, "max_age": 0 }"#,
        )
        .unwrap();

        assert_eq!(config.allowed_origins, vec!["https://example.com"]);
        assert!(!config.allow_credentials);
        assert_eq!(config.max_age, 0);
        assert_eq!(config.allowed_methods, CorsConfig::default().allowed_methods);
    }
}
