//! # JSON Module
//!
//! Adapts JSON-oriented handlers onto the [`Router`](crate::router::Router).
//!
//! A JSON handler receives the call context and a [`JsonRequest`] (method,
//! parsed URL, path vars, headers, body, caller) and returns a
//! [`JsonResult`]. [`JsonRouter`] resolves the outcome onto the wire:
//!
//! | Handler result | Response |
//! |---|---|
//! | `Ok(Some(value))` | JSON-encoded `value`, configured success code |
//! | `Ok(None)`, success code is 2xx | 204, no body |
//! | `Ok(None)`, success code not 2xx | success code, no body |
//! | `Err(e)` | error handler in scope |
//!
//! The default error handler answers `{"code": c, "error": m}`, where `m` is
//! the original message except for 500, which always reads
//! `"internal server error"`.
//!
//! ```rust,ignore
//! let mut api = JsonRouter::new();
//! api.handle("/pets/{id}", json_handler(|_ctx, req| {
//!     let id = req.var("id").ok_or_else(|| HttpError::bad_request("missing id"))?;
//!     to_json(&load_pet(id)?)
//! }), &[Method::GET])?;
//! ```

mod core;
mod error;

pub use core::{
    json_handler, to_json, JsonHandlerFunc, JsonRequest, JsonResourceHandler, JsonResult,
    JsonRouter,
};
pub use error::{default_error_handler, ErrorHandler, HttpError, INTERNAL_ERROR_MESSAGE};
