use crate::handler::{BoxedHandler, RequestHandler};
use crate::matcher::Template;
use http::Method;
use std::cmp::Ordering;
use std::sync::Arc;

/// A registration: path template, method and the handler serving them.
///
/// Template and method together are the matching key. Equal keys may be registered more than
/// once, the first registration wins.
pub struct Route {
    template: String,
    method: Method,
    shape: Template,
    seq: usize,
    handler: BoxedHandler,
}

impl Route {
    pub(crate) fn new(template: String, method: Method, seq: usize, handler: BoxedHandler) -> Self {
        let shape = Template::parse(&template);
        Self { template, method, shape, seq, handler }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// `[METHOD]template`, e.g. `[GET]/users/{id}`.
    pub fn composite_key(&self) -> String {
        format!("[{}]{}", self.method, self.template)
    }

    pub(crate) fn handler(&self) -> &dyn RequestHandler {
        self.handler.as_ref()
    }

    fn composite_key_len(&self) -> usize {
        self.method.as_str().len() + self.template.len() + 2
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route").field("method", &self.method).field("template", &self.template).finish_non_exhaustive()
    }
}

/// The order in which routes are tried during dispatch, the first compatible route wins.
///
/// Both orders fall back to registration order, so dispatch is deterministic for a fixed
/// sequence of registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteOrder {
    /// More literal segments first, then fewer captures: `/users/me` is tried before
    /// `/users/{id}` whatever the registration order. Unlike [`RouteOrder::KeyLength`], the
    /// length of the composite key plays no part.
    #[default]
    Specificity,
    /// Longer composite key `[METHOD]template` first. Cheap, but only a rough proxy for
    /// specificity: `/users/{name}` is tried before `/users/me`.
    KeyLength,
}

impl RouteOrder {
    pub(crate) fn compare(self, a: &Route, b: &Route) -> Ordering {
        let rank = match self {
            RouteOrder::Specificity => b
                .shape
                .literals()
                .cmp(&a.shape.literals())
                .then_with(|| a.shape.captures().cmp(&b.shape.captures())),
            RouteOrder::KeyLength => b.composite_key_len().cmp(&a.composite_key_len()),
        };
        rank.then_with(|| a.seq.cmp(&b.seq))
    }

    /// Inserts `route` at its sorted position, `routes` must already be sorted by `self`.
    pub(crate) fn insert(self, routes: &mut Vec<Route>, route: Route) {
        let index = routes.partition_point(|existing| self.compare(existing, &route) == Ordering::Less);
        routes.insert(index, route);
    }

    pub(crate) fn sort(self, routes: &mut [Route]) {
        routes.sort_by(|a, b| self.compare(a, b));
    }
}

pub(crate) fn boxed<H: RequestHandler + 'static>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}
