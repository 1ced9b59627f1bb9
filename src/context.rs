//! Request-scoped value bag.
//!
//! A [`RequestContext`] is created per call and passed by value down the
//! middleware chain into the handler. It carries the values that routing
//! discovers along the way (captured [`Vars`], the matched [`RouteInfo`]) and
//! those that middleware injects (a logging span, typed extensions). Nothing in
//! it outlives the call.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::Span;

use crate::call::CallResourceRequest;
use crate::ids::CallId;

/// Maximum number of captured path variables before heap allocation.
pub const MAX_INLINE_VARS: usize = 8;

/// Path variables captured while matching, keyed by template name.
///
/// Inserting a name that already exists overwrites it, so a variable captured
/// by an inner router replaces the same name captured further out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars(SmallVec<[(Arc<str>, String); MAX_INLINE_VARS]>);

impl Vars {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: Arc<str>, value: String) {
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((name, value)),
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Note: this allocates; prefer [`Vars::get`] on the request path.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl<K: Into<Arc<str>>, V: Into<String>> FromIterator<(K, V)> for Vars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Vars::new();
        for (k, v) in iter {
            vars.insert(k.into(), v.into());
        }
        vars
    }
}

/// The route that matched a call. Informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub name: Option<String>,
    /// Full template, with every enclosing subrouter prefix.
    pub path: String,
    pub method: String,
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    call_id: CallId,
    vars: Vars,
    route: Option<RouteInfo>,
    span: Span,
    extensions: http::Extensions,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::with_call_id(CallId::generate())
    }

    #[must_use]
    pub fn with_call_id(call_id: CallId) -> Self {
        Self {
            call_id,
            vars: Vars::new(),
            route: None,
            span: Span::none(),
            extensions: http::Extensions::new(),
        }
    }

    /// Context for `req`, reusing a valid call id from its headers.
    #[must_use]
    pub fn for_call(req: &CallResourceRequest) -> Self {
        Self::with_call_id(CallId::for_call(req))
    }

    #[must_use]
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    #[must_use]
    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut Vars {
        &mut self.vars
    }

    #[must_use]
    pub fn route_info(&self) -> Option<&RouteInfo> {
        self.route.as_ref()
    }

    pub fn set_route_info(&mut self, route: RouteInfo) {
        self.route = Some(route);
    }

    /// The span handlers should log under. Disabled until a middleware
    /// injects one.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    #[must_use]
    pub fn extensions(&self) -> &http::Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut http::Extensions {
        &mut self.extensions
    }
}
