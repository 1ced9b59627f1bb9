//! # Call Module
//!
//! The shapes exchanged with the embedding transport: one inbound
//! [`CallResourceRequest`], one outbound [`CallResourceResponse`], and the
//! write-once [`ResponseSender`] sink the response is delivered through.
//!
//! Every dispatcher in this crate ([`Router`](crate::router::Router),
//! [`JsonRouter`](crate::json::JsonRouter),
//! [`ResourceGroupRouter`](crate::resource::ResourceGroupRouter) and
//! [`AdmissionController`](crate::admission::AdmissionController)) implements
//! [`CallResourceHandler`], so a transport can serve any of them the same way:
//!
//! ```rust,ignore
//! let capture = ResponseCapture::new();
//! router.call_resource(RequestContext::for_call(&req), req, &capture)?;
//! let response = capture.take();
//! ```
//!
//! [`ResponseCapture`] is the two-phase holder used by capturing middleware:
//! downstream writes land in it (last write wins) and it is flushed to the real
//! sink exactly once.

mod core;

pub use core::{
    CallResourceHandler, CallResourceRequest, CallResourceResponse, CallerContext, CaptureError,
    Headers, ResponseCapture, ResponseSender,
};
