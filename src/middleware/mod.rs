//! # Middleware Module
//!
//! Decorators composed around route handlers.
//!
//! Two shapes are supported:
//!
//! - **Pass-through**: any `Fn(HandlerFunc) -> HandlerFunc`. It sees the
//!   context and call on the way in and hands them to `next`.
//! - **Capturing**: [`CapturingMiddleware`], built from a callback that runs
//!   the downstream chain through [`Next::run`], gets the response back, may
//!   rewrite it, and returns what is finally sent.
//!
//! ## Ordering
//!
//! Chains compose as an onion. A router's own middleware wraps the handler
//! first; every ancestor's middleware wraps outside that, root outermost.
//! Requests are therefore observed root to leaf and captured responses leaf to
//! root:
//!
//! ```text
//! root m1 → root m2 → sub m3 → handler → sub m3 → root m2 → root m1
//! ```
//!
//! ## Provided middleware
//!
//! - [`TracingMiddleware`]: per-call span, injected as the call's logger
//! - [`RecoveryMiddleware`]: panic to 500 conversion

mod core;
mod recovery;
mod tracing;

pub use core::{CapturingMiddleware, Middleware, Next};
pub use recovery::RecoveryMiddleware;
pub use tracing::TracingMiddleware;
