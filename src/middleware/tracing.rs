use std::time::Instant;

use tracing::{error, field, info, info_span};

use super::{Middleware, Next};
use crate::ids::CALL_ID_HEADER;
use crate::router::{handler_fn, HandlerFunc};

/// Opens a span per call, injects it into the context as the call's logger,
/// and records status and latency once the downstream chain has answered.
///
/// The call id is echoed back in the `x-request-id` response header.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn wrap(&self, next: HandlerFunc) -> HandlerFunc {
        handler_fn(move |mut ctx, req, sender| {
            let call_id = ctx.call_id();
            let span = info_span!(
                "call_resource",
                call_id = %call_id,
                call_id_origin = call_id.origin().as_str(),
                method = %req.method,
                path = %req.path_only(),
                route = field::Empty,
                status = field::Empty,
                latency_ms = field::Empty,
            );
            if let Some(route) = ctx.route_info() {
                span.record("route", route.path.as_str());
            }
            ctx.set_span(span.clone());

            let start = Instant::now();
            let result = span.in_scope(|| Next::new(&next).run(ctx, req));
            let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            span.record("latency_ms", latency_ms);

            match result {
                Ok(response) => {
                    span.record("status", response.status);
                    info!(parent: &span, status = response.status, latency_ms, "Call completed");
                    sender.send(response.with_header(CALL_ID_HEADER, call_id.to_string()))
                }
                Err(err) => {
                    error!(parent: &span, error = %err, latency_ms, "Call failed");
                    Err(err)
                }
            }
        })
    }
}
