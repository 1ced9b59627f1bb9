//! # Router Module
//!
//! Path matching and handler resolution for resource calls.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling path templates (`/pets/{id}`, `/files/{path:.*}`) into anchored
//!   regex patterns with named captures
//! - Walking nested subrouters, each of which consumes the prefix it matched
//! - Capturing path variables into the call's [`Vars`](crate::context::Vars)
//! - Assembling the middleware chain collected on the way down
//!
//! ## Matching
//!
//! At every level subrouters are tried first, in registration order; the first
//! whose prefix matches owns the call and no sibling is tried afterwards. Then
//! the level's own routes are tried, filtered by method, and the first full
//! match wins.
//!
//! ```rust,ignore
//! use kindrouter::router::{handler_fn, Router};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.handle("/pets/{id}", handler_fn(get_pet), &[Method::GET])?.name("get_pet");
//! let admin = router.subrouter("/admin")?;
//! admin.add_middleware(RequireAdmin);
//! admin.handle("/settings", handler_fn(settings), &[])?;
//! ```

mod core;
mod template;

pub use core::{handler_fn, HandlerFunc, RouteHandler, Router, RouterError};
