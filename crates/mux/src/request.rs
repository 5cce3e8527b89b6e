//! Request types and request-scoped data.
//!
//! This module contains the types a handler uses to read what the router learned about a request:
//! - `Request`: the inbound request, an `http::Request` carrying a [`RequestBody`]
//! - `PathParams`: values captured from the path template of the matched route
//! - `RequestExt`: typed accessors for data stored in the request extensions
//!
//! Path parameters and the request id live in `http::Extensions`, never in the request headers,
//! so they cannot collide with headers sent by the client.

use crate::RequestBody;
use crate::middleware::RequestId;
use std::collections::HashMap;
use std::collections::hash_map::Iter;

/// The inbound request handed through the middleware chain to the matched handler.
pub type Request = http::Request<RequestBody>;

/// Path parameters extracted from the URL path of a request.
///
/// For the template `/users/{id}` and the path `/users/42`, the parameter `id` has the value `42`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    inner: HashMap<String, String>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Gets the value of a path parameter by its name
    #[inline]
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        self.inner.get(name.as_ref()).map(String::as_str)
    }

    pub fn iter(&self) -> Iter<'_, String, String> {
        self.inner.iter()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(name.into(), value.into());
    }

    /// Merges `other` into `self`, values of `other` win on equal names.
    pub fn merge(&mut self, other: PathParams) {
        self.inner.extend(other.inner);
    }
}

impl<'a> IntoIterator for &'a PathParams {
    type Item = (&'a String, &'a String);
    type IntoIter = Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { inner: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

/// Typed access to the data the router and the bundled middlewares attach to a request.
pub trait RequestExt {
    /// All path parameters of the matched route, `None` before routing happened.
    fn path_params(&self) -> Option<&PathParams>;

    /// A single path parameter by name.
    fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params().and_then(|params| params.get(name))
    }

    /// The id assigned by [`RequestIdMiddleware`](crate::middleware::RequestIdMiddleware), if it ran.
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestExt for http::Request<B> {
    fn path_params(&self) -> Option<&PathParams> {
        self.extensions().get::<PathParams>()
    }

    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}
