mod common;

use std::sync::mpsc;

use common::{body_text, get, mark, marking_handler, text_handler, trail};
use http::Method;
use kindrouter::call::{CallResourceRequest, CallResourceResponse, ResponseCapture};
use kindrouter::context::RequestContext;
use kindrouter::router::{handler_fn, HandlerFunc, Router, RouterError};
use serde_json::json;

/// Answers with the captured vars and the matched route template.
fn echo_vars() -> HandlerFunc {
    handler_fn(|ctx, _req, sender| {
        let route = ctx.route_info().map(|r| r.path.clone()).unwrap_or_default();
        let body = json!({ "vars": ctx.vars().to_map(), "route": route });
        sender.send(CallResourceResponse::json(200, &body))
    })
}

#[test]
fn test_single_var_capture() {
    let mut router = Router::new();
    router.handle("/foo/{any}", echo_vars(), &[]).unwrap();

    let body = get(&router, "/foo/bar1").body_json().unwrap();
    assert_eq!(body["vars"], json!({ "any": "bar1" }));
    assert_eq!(body["route"], "/foo/{any}");
}

#[test]
fn test_vars_accumulate_through_subrouters() {
    let mut router = Router::new();
    router
        .subrouter("/ns/{namespace}")
        .unwrap()
        .handle("/pods/{name}", echo_vars(), &[Method::GET])
        .unwrap();

    let body = get(&router, "/ns/default/pods/web-0").body_json().unwrap();
    assert_eq!(body["vars"], json!({ "namespace": "default", "name": "web-0" }));
    assert_eq!(body["route"], "/ns/{namespace}/pods/{name}");
}

#[test]
fn test_inner_capture_overwrites_outer() {
    let mut router = Router::new();
    router
        .subrouter("/outer/{id}")
        .unwrap()
        .handle("/inner/{id}", echo_vars(), &[])
        .unwrap();

    let body = get(&router, "/outer/1/inner/2").body_json().unwrap();
    assert_eq!(body["vars"], json!({ "id": "2" }));
}

#[test]
fn test_custom_pattern_spans_segments() {
    let mut router = Router::new();
    router.handle("/files/{path:.+}", echo_vars(), &[]).unwrap();

    let body = get(&router, "/files/a/b/c.txt").body_json().unwrap();
    assert_eq!(body["vars"], json!({ "path": "a/b/c.txt" }));
}

#[test]
fn test_subrouter_wins_over_sibling_route_registered_first() {
    let mut router = Router::new();
    router.handle("/api/items", text_handler("root"), &[]).unwrap();
    router
        .subrouter("/api")
        .unwrap()
        .handle("/items", text_handler("sub"), &[])
        .unwrap();

    assert_eq!(body_text(&get(&router, "/api/items")), "sub");
}

#[test]
fn test_first_matching_subrouter_owns_the_call() {
    let mut router = Router::new();
    router
        .subrouter("/api")
        .unwrap()
        .handle("/items", text_handler("first"), &[])
        .unwrap();
    router
        .subrouter("/api")
        .unwrap()
        .handle("/other", text_handler("second"), &[])
        .unwrap();
    router.handle("/api/other", text_handler("root"), &[]).unwrap();

    assert_eq!(body_text(&get(&router, "/api/items")), "first");

    // No backtracking into later subrouters or the parent's own routes.
    let capture = ResponseCapture::new();
    let req = CallResourceRequest::new("GET", "/api/other");
    let err = router
        .call_resource(RequestContext::for_call(&req), req, &capture)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RouterError>(),
        Some(RouterError::NotFound { .. })
    ));
    assert!(capture.take().is_none());
}

#[test]
fn test_method_filter_and_case() {
    let mut router = Router::new();
    router
        .handle("/items", text_handler("create"), &[Method::POST])
        .unwrap();
    router.handle("/items", text_handler("list"), &[]).unwrap();

    let req = CallResourceRequest::new("post", "/items");
    assert_eq!(body_text(&common::call(&router, req)), "create");
    assert_eq!(body_text(&get(&router, "/items")), "list");
}

#[test]
fn test_middleware_runs_root_first() {
    let trail = trail();
    let mut router = Router::new();
    router.add_middleware(mark("root-1", &trail));
    router.add_middleware(mark("root-2", &trail));
    let sub = router.subrouter("/sub").unwrap();
    sub.add_middleware(mark("sub", &trail));
    sub.handle("/x", marking_handler("handler", &trail), &[])
        .unwrap();

    assert_eq!(get(&router, "/sub/x").status, 200);
    assert_eq!(*trail.lock(), vec!["root-1", "root-2", "sub", "handler"]);
}

#[test]
fn test_not_found_handler_wrapped_by_root_middleware() {
    let trail = trail();
    let mut router = Router::new();
    router.add_middleware(mark("root", &trail));
    router
        .subrouter("/sub")
        .unwrap()
        .add_middleware(mark("sub", &trail));
    router.set_not_found_handler(handler_fn(|_ctx, req, sender| {
        sender.send(CallResourceResponse::json(
            404,
            &json!({ "missing": req.path_only() }),
        ))
    }));

    let resp = get(&router, "/sub/nowhere?x=1");
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body_json().unwrap(), json!({ "missing": "/sub/nowhere" }));
    assert_eq!(*trail.lock(), vec!["root"]);
}

#[test]
fn test_channel_sender() {
    let mut router = Router::new();
    router.handle("/", text_handler("home"), &[]).unwrap();

    let (tx, rx) = mpsc::channel();
    let req = CallResourceRequest::new("GET", "");
    router
        .call_resource(RequestContext::for_call(&req), req, &tx)
        .unwrap();
    let resp = rx.recv().unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(body_text(&resp), "home");
}

#[test]
fn test_call_id_from_request_header() {
    let mut router = Router::new();
    router
        .handle(
            "/id",
            handler_fn(|ctx, _req, sender| {
                sender.send(CallResourceResponse::text(200, &ctx.call_id().to_string()))
            }),
            &[],
        )
        .unwrap();

    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let req = CallResourceRequest::new("GET", "/id").with_header("X-Request-Id", id);
    assert_eq!(body_text(&common::call(&router, req)), id);
}
