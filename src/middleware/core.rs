use std::sync::Arc;

use crate::call::{CallResourceRequest, CallResourceResponse, ResponseCapture};
use crate::context::RequestContext;
use crate::router::{handler_fn, HandlerFunc};

/// A decorator around a [`HandlerFunc`].
///
/// Pass-through middleware is any `Fn(HandlerFunc) -> HandlerFunc`: it may
/// inspect or replace the context and call before invoking `next`. Middleware
/// that needs to see or alter the downstream response uses
/// [`CapturingMiddleware`] instead.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: HandlerFunc) -> HandlerFunc;
}

impl<F> Middleware for F
where
    F: Fn(HandlerFunc) -> HandlerFunc + Send + Sync,
{
    fn wrap(&self, next: HandlerFunc) -> HandlerFunc {
        self(next)
    }
}

/// The downstream part of a chain, as seen by a capturing callback.
pub struct Next<'a> {
    handler: &'a HandlerFunc,
}

impl<'a> Next<'a> {
    pub(crate) fn new(handler: &'a HandlerFunc) -> Self {
        Self { handler }
    }

    /// Run the downstream chain against a private capture and return what it
    /// sent. Fails if the chain fails or sends nothing.
    pub fn run(
        self,
        ctx: RequestContext,
        req: CallResourceRequest,
    ) -> anyhow::Result<CallResourceResponse> {
        let capture = ResponseCapture::new();
        (self.handler)(ctx, req, &capture)?;
        Ok(capture.into_response()?)
    }
}

/// Middleware built from a callback that can observe and rewrite the
/// downstream response.
///
/// The callback receives a [`Next`]; whatever response it returns is written
/// to the real sink exactly once.
///
/// ```rust,ignore
/// router.add_middleware(CapturingMiddleware::new(|ctx, req, next| {
///     let mut res = next.run(ctx, req)?;
///     res.headers.insert("x-served-by", "kindrouter");
///     Ok(res)
/// }));
/// ```
pub struct CapturingMiddleware<F> {
    callback: Arc<F>,
}

impl<F> CapturingMiddleware<F>
where
    F: Fn(RequestContext, CallResourceRequest, Next<'_>) -> anyhow::Result<CallResourceResponse>
        + Send
        + Sync
        + 'static,
{
    pub fn new(callback: F) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl<F> Middleware for CapturingMiddleware<F>
where
    F: Fn(RequestContext, CallResourceRequest, Next<'_>) -> anyhow::Result<CallResourceResponse>
        + Send
        + Sync
        + 'static,
{
    fn wrap(&self, next: HandlerFunc) -> HandlerFunc {
        let callback = Arc::clone(&self.callback);
        handler_fn(move |ctx, req, sender| {
            let response = callback(ctx, req, Next::new(&next))?;
            sender.send(response)
        })
    }
}
