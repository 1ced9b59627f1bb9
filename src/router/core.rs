use std::sync::Arc;

use http::Method;
use tracing::{debug, warn};

use super::template::{Anchor, CompiledTemplate};
use crate::call::{CallResourceHandler, CallResourceRequest, ResponseSender};
use crate::context::{RequestContext, RouteInfo, Vars};
use crate::middleware::Middleware;

/// A call handler: receives the request-scoped context, the call, and the sink
/// its response must be written to.
pub type HandlerFunc = Arc<
    dyn Fn(RequestContext, CallResourceRequest, &dyn ResponseSender) -> anyhow::Result<()>
        + Send
        + Sync,
>;

/// Wrap a closure as a [`HandlerFunc`].
pub fn handler_fn<F>(f: F) -> HandlerFunc
where
    F: Fn(RequestContext, CallResourceRequest, &dyn ResponseSender) -> anyhow::Result<()>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("invalid path template {template:?}: {reason}")]
    InvalidTemplate {
        template: String,
        reason: &'static str,
    },
    #[error("invalid pattern in path template {template:?}")]
    InvalidPattern {
        template: String,
        #[source]
        source: regex::Error,
    },
    #[error("no route matched {method} {path}")]
    NotFound { method: String, path: String },
}

/// A terminal route: compiled full-match template, allowed methods, handler.
pub struct RouteHandler {
    template: CompiledTemplate,
    methods: Vec<Method>,
    handler: HandlerFunc,
    name: Option<String>,
}

impl RouteHandler {
    /// Name the route for [`Router::route_by_name`]. Names need not be unique.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the method set. An empty slice resets it to `GET`.
    pub fn methods(&mut self, methods: &[Method]) -> &mut Self {
        self.methods = normalize_methods(methods);
        self
    }

    #[must_use]
    pub fn route_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The template as registered, relative to the owning router.
    #[must_use]
    pub fn path(&self) -> &str {
        self.template.source()
    }

    #[must_use]
    pub fn allowed_methods(&self) -> &[Method] {
        &self.methods
    }

    #[must_use]
    pub fn handler(&self) -> &HandlerFunc {
        &self.handler
    }

    fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }
}

struct Subrouter {
    template: CompiledTemplate,
    router: Router,
}

/// Path/method router with nested subrouters and per-router middleware.
///
/// Matching is depth-first and greedy: at every level subrouters are tried
/// first in registration order and the first whose prefix matches owns the
/// call, without backtracking. Only then are the level's own routes tried,
/// again first match wins. Registration order therefore decides ties, not
/// specificity.
#[derive(Default)]
pub struct Router {
    routes: Vec<RouteHandler>,
    subrouters: Vec<Subrouter>,
    middlewares: Vec<Arc<dyn Middleware>>,
    not_found: Option<HandlerFunc>,
}

/// Scratch state accumulated while walking down the tree. Only applied to the
/// call context once a route has matched.
#[derive(Default)]
struct Walk {
    vars: Vars,
    chain: Vec<Arc<dyn Middleware>>,
    template: String,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a terminal route.
    ///
    /// An empty `path` is treated as `/`; an empty `methods` slice as `GET`.
    pub fn handle(
        &mut self,
        path: &str,
        handler: HandlerFunc,
        methods: &[Method],
    ) -> Result<&mut RouteHandler, RouterError> {
        let path = if path.is_empty() { "/" } else { path };
        let template = CompiledTemplate::compile(path, Anchor::Full)?;
        let methods = normalize_methods(methods);
        debug!(path = %path, methods = ?methods, "Route registered");

        self.routes.push(RouteHandler {
            template,
            methods,
            handler,
            name: None,
        });
        let idx = self.routes.len() - 1;
        Ok(&mut self.routes[idx])
    }

    /// Register a nested router owning every path that starts with `path`.
    pub fn subrouter(&mut self, path: &str) -> Result<&mut Router, RouterError> {
        let template = CompiledTemplate::compile(path, Anchor::Prefix)?;
        debug!(prefix = %path, "Subrouter registered");

        self.subrouters.push(Subrouter {
            template,
            router: Router::new(),
        });
        let idx = self.subrouters.len() - 1;
        Ok(&mut self.subrouters[idx].router)
    }

    /// Append a middleware to this router's own chain.
    ///
    /// Middleware added earlier runs outside middleware added later, and every
    /// ancestor router's chain runs outside this one.
    pub fn add_middleware<M: Middleware + 'static>(&mut self, mw: M) {
        self.middlewares.push(Arc::new(mw));
    }

    /// Like [`Router::add_middleware`] for an instance shared elsewhere.
    pub fn add_shared_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    /// Handler for calls that match no route. It is wrapped by this router's
    /// own middleware only.
    pub fn set_not_found_handler(&mut self, handler: HandlerFunc) {
        self.not_found = Some(handler);
    }

    /// First terminal route registered with `name`, searching this router's
    /// routes before its subrouters.
    #[must_use]
    pub fn route_by_name(&self, name: &str) -> Option<&RouteHandler> {
        self.routes
            .iter()
            .find(|r| r.route_name() == Some(name))
            .or_else(|| {
                self.subrouters
                    .iter()
                    .find_map(|s| s.router.route_by_name(name))
            })
    }

    /// Every terminal route as `METHOD full-template`, in matching order.
    #[must_use]
    pub fn route_patterns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_patterns("", &mut out);
        out
    }

    fn collect_patterns(&self, prefix: &str, out: &mut Vec<String>) {
        for sub in &self.subrouters {
            let nested = format!("{prefix}{}", sub.template.source());
            sub.router.collect_patterns(&nested, out);
        }
        for route in &self.routes {
            for method in &route.methods {
                out.push(format!("{method} {prefix}{}", route.path()));
            }
        }
    }

    /// Route `req` and run the matched handler inside its middleware chain.
    ///
    /// Falls back to the not-found handler, or fails with
    /// [`RouterError::NotFound`] when none is configured.
    pub fn call_resource(
        &self,
        mut ctx: RequestContext,
        mut req: CallResourceRequest,
        sender: &dyn ResponseSender,
    ) -> anyhow::Result<()> {
        req.method = req.method.to_ascii_uppercase();
        let path = req.path_only().to_string();
        let method = Method::from_bytes(req.method.as_bytes()).ok();

        let mut walk = Walk::default();
        let matched = method
            .as_ref()
            .and_then(|m| self.resolve(&path, m, &mut walk));

        match matched {
            Some(route) => {
                debug!(
                    call_id = %ctx.call_id(),
                    method = %req.method,
                    path = %path,
                    route_pattern = %walk.template,
                    route_name = route.route_name().unwrap_or(""),
                    vars = ?walk.vars,
                    "Route matched"
                );
                for (name, value) in walk.vars.iter() {
                    ctx.vars_mut().insert(Arc::from(name), value.to_string());
                }
                ctx.set_route_info(RouteInfo {
                    name: route.name.clone(),
                    path: walk.template,
                    method: req.method.clone(),
                });
                let handler = compose(&walk.chain, Arc::clone(&route.handler));
                handler(ctx, req, sender)
            }
            None => {
                warn!(
                    call_id = %ctx.call_id(),
                    method = %req.method,
                    path = %path,
                    "No route matched"
                );
                match &self.not_found {
                    Some(not_found) => {
                        let handler = compose(&self.middlewares, Arc::clone(not_found));
                        handler(ctx, req, sender)
                    }
                    None => Err(RouterError::NotFound {
                        method: req.method,
                        path,
                    }
                    .into()),
                }
            }
        }
    }

    fn resolve<'a>(
        &'a self,
        remainder: &str,
        method: &Method,
        walk: &mut Walk,
    ) -> Option<&'a RouteHandler> {
        walk.chain.extend(self.middlewares.iter().map(Arc::clone));

        if let Some((sub, m)) = self
            .subrouters
            .iter()
            .find_map(|s| s.template.matches(remainder).map(|m| (s, m)))
        {
            for (name, value) in m.vars {
                walk.vars.insert(name, value);
            }
            walk.template.push_str(sub.template.source());
            return sub.router.resolve(&remainder[m.end..], method, walk);
        }

        let target = if remainder.is_empty() { "/" } else { remainder };
        let (route, m) = self
            .routes
            .iter()
            .filter(|r| r.allows(method))
            .find_map(|r| r.template.matches(target).map(|m| (r, m)))?;
        for (name, value) in m.vars {
            walk.vars.insert(name, value);
        }
        walk.template.push_str(route.path());
        Some(route)
    }
}

impl CallResourceHandler for Router {
    fn call_resource(
        &self,
        ctx: RequestContext,
        req: CallResourceRequest,
        sender: &dyn ResponseSender,
    ) -> anyhow::Result<()> {
        Router::call_resource(self, ctx, req, sender)
    }
}

/// Wrap `handler` so that `chain[0]` is outermost and the last entry innermost.
fn compose(chain: &[Arc<dyn Middleware>], handler: HandlerFunc) -> HandlerFunc {
    chain.iter().rev().fold(handler, |next, mw| mw.wrap(next))
}

fn normalize_methods(methods: &[Method]) -> Vec<Method> {
    if methods.is_empty() {
        vec![Method::GET]
    } else {
        methods.to_vec()
    }
}
