//! # kindrouter
//!
//! **kindrouter** is the request-dispatch and policy layer of a resource-extension
//! plugin. A transport hands it generic "call a resource endpoint" requests
//! (method, path, headers, body); kindrouter routes each call to a registered
//! handler, wraps it in a middleware chain, and answers through a
//! [`ResponseSender`](call::ResponseSender).
//!
//! ## Architecture
//!
//! - **[`call`]** - request, response and sender types shared with the transport
//! - **[`context`]** - per-call [`RequestContext`](context::RequestContext): call id, path vars, route info, span
//! - **[`router`]** - path template compilation, method matching, nested subrouters
//! - **[`middleware`]** - pass-through and response-capturing decorators, tracing and panic recovery
//! - **[`json`]** - JSON handlers on top of the router, with error-to-wire mapping
//! - **[`resource`]** - resource kinds, objects, the [`Store`](resource::Store) seam and per-kind CRUD routes
//! - **[`admission`]** - validate / mutate / convert webhooks
//! - **[`logging`]** - `tracing` subscriber setup from the environment
//!
//! ### Call Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant T as Transport
//!     participant R as Router
//!     participant S as Subrouter
//!     participant M as Middleware chain
//!     participant H as Handler
//!
//!     T->>R: call_resource(ctx, req, sender)
//!     R->>S: prefix match, capture vars
//!     S->>S: method + full match
//!     S-->>R: handler, middleware (root first)
//!     R->>M: wrap handler
//!     M->>H: ctx with vars and route info
//!     H->>T: sender.send(response)
//! ```
//!
//! The [`AdmissionController`](admission::AdmissionController) is a sibling of
//! [`Router`](router::Router) rather than a route inside it: it serves the
//! `validate`, `mutate` and `convert` sub-paths directly and speaks the
//! admission review protocol.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::mpsc;
//!
//! use http::Method;
//! use kindrouter::call::{CallResourceHandler, CallResourceRequest};
//! use kindrouter::context::RequestContext;
//! use kindrouter::json::{json_handler, JsonRouter};
//! use serde_json::json;
//!
//! let mut router = JsonRouter::new();
//! router.handle(
//!     "/hello/{name}",
//!     json_handler(|_ctx, req| Ok(Some(json!({ "hello": req.var("name") })))),
//!     &[Method::GET],
//! )?;
//!
//! let (tx, rx) = mpsc::channel();
//! let req = CallResourceRequest::new("GET", "/hello/world");
//! router.call_resource(RequestContext::for_call(&req), req, &tx)?;
//! assert_eq!(rx.recv()?.status, 200);
//! ```

pub mod admission;
pub mod call;
pub mod context;
pub mod ids;
pub mod json;
pub mod logging;
pub mod middleware;
pub mod resource;
pub mod router;

pub use call::{CallResourceHandler, CallResourceRequest, CallResourceResponse, ResponseSender};
pub use context::RequestContext;
pub use router::Router;
