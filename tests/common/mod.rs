#![allow(dead_code)]

use std::sync::Arc;

use kindrouter::call::{
    CallResourceHandler, CallResourceRequest, CallResourceResponse, ResponseCapture,
};
use kindrouter::context::RequestContext;
use kindrouter::middleware::Middleware;
use kindrouter::router::{handler_fn, HandlerFunc};
use parking_lot::Mutex;
use serde_json::Value;

/// Run one call through `handler` and return the response it sent.
pub fn call(handler: &dyn CallResourceHandler, req: CallResourceRequest) -> CallResourceResponse {
    let capture = ResponseCapture::new();
    handler
        .call_resource(RequestContext::for_call(&req), req, &capture)
        .expect("call failed");
    capture.into_response().expect("no response sent")
}

pub fn get(handler: &dyn CallResourceHandler, path: &str) -> CallResourceResponse {
    call(handler, CallResourceRequest::new("GET", path))
}

pub fn send_json(
    handler: &dyn CallResourceHandler,
    method: &str,
    path: &str,
    body: &Value,
) -> CallResourceResponse {
    call(
        handler,
        CallResourceRequest::new(method, path).with_body(body.to_string()),
    )
}

pub fn body_text(resp: &CallResourceResponse) -> String {
    String::from_utf8(resp.body.clone().unwrap_or_default()).expect("utf-8 body")
}

/// Handler answering 200 with `text` as the body.
pub fn text_handler(text: &'static str) -> HandlerFunc {
    handler_fn(move |_ctx, _req, sender| sender.send(CallResourceResponse::text(200, text)))
}

/// Ordered record of which middleware and handlers ran.
pub type Trail = Arc<Mutex<Vec<&'static str>>>;

pub fn trail() -> Trail {
    Arc::new(Mutex::new(Vec::new()))
}

/// Pass-through middleware appending `label` to `trail` before calling on.
pub fn mark(label: &'static str, trail: &Trail) -> impl Middleware {
    let trail = Arc::clone(trail);
    move |next: HandlerFunc| -> HandlerFunc {
        let trail = Arc::clone(&trail);
        handler_fn(move |ctx, req, sender| {
            trail.lock().push(label);
            next(ctx, req, sender)
        })
    }
}

/// Handler appending `label` to `trail` and answering 200.
pub fn marking_handler(label: &'static str, trail: &Trail) -> HandlerFunc {
    let trail = Arc::clone(trail);
    handler_fn(move |_ctx, _req, sender| {
        trail.lock().push(label);
        sender.send(CallResourceResponse::text(200, label))
    })
}
