use std::borrow::{Borrow, BorrowMut};
use std::sync::Arc;

use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use super::error::{ErrorHandler, ErrorScope, HttpError};
use crate::call::{
    CallResourceHandler, CallResourceRequest, CallResourceResponse, CallerContext, Headers,
    ResponseSender,
};
use crate::context::{RequestContext, Vars};
use crate::middleware::Middleware;
use crate::router::{handler_fn, HandlerFunc, RouteHandler, Router, RouterError};

/// What a JSON handler returns: a body to encode, `None` for no body, or an
/// error (an [`HttpError`] keeps its code, anything else becomes 500).
pub type JsonResult = anyhow::Result<Option<Value>>;

pub type JsonHandlerFunc = Arc<dyn Fn(&RequestContext, &JsonRequest) -> JsonResult + Send + Sync>;

/// Wrap a closure as a [`JsonHandlerFunc`].
pub fn json_handler<F>(f: F) -> JsonHandlerFunc
where
    F: Fn(&RequestContext, &JsonRequest) -> JsonResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Serialize `value` as a handler result.
pub fn to_json<T: Serialize>(value: &T) -> JsonResult {
    Ok(Some(serde_json::to_value(value)?))
}

/// Typed view of a call, as seen by JSON handlers.
#[derive(Debug, Clone)]
pub struct JsonRequest {
    pub method: Method,
    pub url: Url,
    pub vars: Vars,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub caller: CallerContext,
}

impl JsonRequest {
    fn from_call(ctx: &RequestContext, req: CallResourceRequest) -> Result<Self, HttpError> {
        let method = Method::from_bytes(req.method.as_bytes())
            .map_err(|_| HttpError::bad_request(format!("invalid method {:?}", req.method)))?;
        let relative = if req.path.starts_with('/') {
            req.path.clone()
        } else {
            format!("/{}", req.path)
        };
        let url = Url::parse(&format!("http://localhost{relative}"))
            .map_err(|e| HttpError::bad_request(format!("malformed request path: {e}")))?;

        Ok(Self {
            method,
            url,
            vars: ctx.vars().clone(),
            headers: req.headers,
            body: req.body,
            caller: req.caller,
        })
    }

    /// Captured path variable.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name)
    }

    /// First value of a query parameter, percent-decoded.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url.query_pairs().into_owned().collect()
    }

    /// Deserialize the body; malformed bodies are a 400.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| HttpError::bad_request(format!("malformed request body: {e}")))
    }

    /// The body as a byte stream.
    #[must_use]
    pub fn body_reader(&self) -> &[u8] {
        &self.body
    }
}

/// The five handlers of the CRUD convention registered by
/// [`JsonRouter::handle_resource`]. Unset handlers register no route.
#[derive(Clone, Default)]
pub struct JsonResourceHandler {
    pub create: Option<JsonHandlerFunc>,
    pub read: Option<JsonHandlerFunc>,
    pub update: Option<JsonHandlerFunc>,
    pub delete: Option<JsonHandlerFunc>,
    pub list: Option<JsonHandlerFunc>,
}

/// Adapts JSON handlers onto a [`Router`].
///
/// Owns the wire side of every route it registers: building the
/// [`JsonRequest`], encoding the result with the configured success code, and
/// mapping errors through the error handler in scope.
pub struct JsonRouter<R = Router> {
    router: R,
    ok_code: u16,
    errors: Arc<ErrorScope>,
}

impl Default for JsonRouter<Router> {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonRouter<Router> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            ok_code: 200,
            errors: Arc::new(ErrorScope::default()),
        }
    }

    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }
}

impl<R: BorrowMut<Router>> JsonRouter<R> {
    /// Success code for routes registered afterwards (default 200).
    #[must_use]
    pub fn with_ok_code(mut self, code: u16) -> Self {
        self.ok_code = code;
        self
    }

    /// Replace the error handler for this level and, unless they set their
    /// own, every subroute.
    #[must_use]
    pub fn with_error_handler<F>(self, f: F) -> Self
    where
        F: Fn(&HttpError) -> (u16, Value) + Send + Sync + 'static,
    {
        self.set_error_handler(f);
        self
    }

    pub fn set_error_handler<F>(&self, f: F)
    where
        F: Fn(&HttpError) -> (u16, Value) + Send + Sync + 'static,
    {
        self.errors.set(ErrorHandler::new(f));
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        self.router.borrow()
    }

    pub fn router_mut(&mut self) -> &mut Router {
        self.router.borrow_mut()
    }

    pub fn add_middleware<M: Middleware + 'static>(&mut self, mw: M) {
        self.router_mut().add_middleware(mw);
    }

    /// Register a JSON route answering with the configured success code.
    pub fn handle(
        &mut self,
        path: &str,
        handler: JsonHandlerFunc,
        methods: &[Method],
    ) -> Result<&mut RouteHandler, RouterError> {
        let ok_code = self.ok_code;
        self.handle_with_code(path, ok_code, handler, methods)
    }

    /// Register a JSON route answering with `ok_code` on success.
    pub fn handle_with_code(
        &mut self,
        path: &str,
        ok_code: u16,
        handler: JsonHandlerFunc,
        methods: &[Method],
    ) -> Result<&mut RouteHandler, RouterError> {
        let wrapped = adapt(handler, ok_code, Arc::clone(&self.errors));
        self.router_mut().handle(path, wrapped, methods)
    }

    /// Register the CRUD convention under `/{name}`:
    ///
    /// | Route | Handler | Success |
    /// |---|---|---|
    /// | `GET /name` | list | ok code |
    /// | `POST /name` | create | 201 |
    /// | `GET /name/{id}` | read | ok code |
    /// | `PUT /name/{id}` | update | ok code |
    /// | `DELETE /name/{id}` | delete | 204, value discarded |
    pub fn handle_resource(
        &mut self,
        name: &str,
        handlers: JsonResourceHandler,
    ) -> Result<(), RouterError> {
        let collection = format!("/{}", name.trim_matches('/'));
        let item = format!("{collection}/{{id}}");
        let ok_code = self.ok_code;

        if let Some(list) = handlers.list {
            self.handle_with_code(&collection, ok_code, list, &[Method::GET])?;
        }
        if let Some(create) = handlers.create {
            self.handle_with_code(&collection, 201, create, &[Method::POST])?;
        }
        if let Some(read) = handlers.read {
            self.handle_with_code(&item, ok_code, read, &[Method::GET])?;
        }
        if let Some(update) = handlers.update {
            self.handle_with_code(&item, ok_code, update, &[Method::PUT])?;
        }
        if let Some(delete) = handlers.delete {
            let discard = json_handler(move |ctx, req| delete(ctx, req).map(|_| None));
            self.handle_with_code(&item, 204, discard, &[Method::DELETE])?;
        }
        Ok(())
    }

    /// A JSON view over a new subrouter at `path`, inheriting this level's
    /// success code and error handler.
    pub fn subroute(&mut self, path: &str) -> Result<JsonRouter<&mut Router>, RouterError> {
        let ok_code = self.ok_code;
        let errors = Arc::new(ErrorScope::child(&self.errors));
        let router = self.router_mut().subrouter(path)?;
        Ok(JsonRouter {
            router,
            ok_code,
            errors,
        })
    }
}

impl CallResourceHandler for JsonRouter<Router> {
    fn call_resource(
        &self,
        ctx: RequestContext,
        req: CallResourceRequest,
        sender: &dyn ResponseSender,
    ) -> anyhow::Result<()> {
        self.router.call_resource(ctx, req, sender)
    }
}

fn adapt(handler: JsonHandlerFunc, ok_code: u16, errors: Arc<ErrorScope>) -> HandlerFunc {
    handler_fn(move |ctx, req, sender| {
        let outcome = JsonRequest::from_call(&ctx, req)
            .and_then(|json_req| handler(&ctx, &json_req).map_err(HttpError::normalize))
            .and_then(|value| encode_success(value, ok_code));

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                if err.code >= 500 {
                    error!(call_id = %ctx.call_id(), code = err.code, error = %err.message, "JSON handler failed");
                } else {
                    debug!(call_id = %ctx.call_id(), code = err.code, error = %err.message, "JSON handler rejected call");
                }
                let (code, body) = errors.resolve(&err);
                CallResourceResponse::json(code, &body)
            }
        };
        sender.send(response)
    })
}

fn encode_success(value: Option<Value>, ok_code: u16) -> Result<CallResourceResponse, HttpError> {
    match value {
        Some(value) => {
            let body = serde_json::to_vec(&value)
                .map_err(|e| HttpError::internal(format!("failed to encode response: {e}")))?;
            Ok(CallResourceResponse::new(ok_code)
                .with_header("content-type", "application/json")
                .with_body(body))
        }
        None if (200..300).contains(&ok_code) => Ok(CallResourceResponse::new(204)),
        None => Ok(CallResourceResponse::new(ok_code)),
    }
}
