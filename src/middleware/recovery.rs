use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use super::Middleware;
use crate::call::{CallResourceResponse, ResponseCapture};
use crate::json::{default_error_handler, HttpError};
use crate::router::{handler_fn, HandlerFunc};

/// Turns a panicking downstream handler into a 500 response.
///
/// Downstream output is captured first, so anything written before the panic
/// is discarded rather than mixed with the error response.
pub struct RecoveryMiddleware;

impl Middleware for RecoveryMiddleware {
    fn wrap(&self, next: HandlerFunc) -> HandlerFunc {
        handler_fn(move |ctx, req, sender| {
            let call_id = ctx.call_id();
            let capture = ResponseCapture::new();
            match catch_unwind(AssertUnwindSafe(|| next(ctx, req, &capture))) {
                Ok(result) => {
                    result?;
                    capture.flush(sender)
                }
                Err(panic) => {
                    let details = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_default();
                    error!(call_id = %call_id, panic = %details, "Handler panicked");
                    let (status, body) = default_error_handler(&HttpError::internal(details));
                    sender.send(CallResourceResponse::json(status, &body))
                }
            }
        })
    }
}
