use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde_json::{json, Value};

/// Message sent in place of the original for every 500.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// An error carrying the status code it should be answered with.
///
/// JSON handlers return `anyhow::Error`; an `HttpError` inside it keeps its
/// code, any other error is treated as a 500.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    pub code: u16,
    pub message: String,
}

impl HttpError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// Recover the code from a handler error. Codes outside 100-599 and
    /// errors without a code become 500.
    #[must_use]
    pub fn normalize(err: anyhow::Error) -> Self {
        let mut err = match err.downcast::<HttpError>() {
            Ok(http) => http,
            Err(other) => HttpError::internal(other.to_string()),
        };
        if !(100..=599).contains(&err.code) {
            err.code = 500;
        }
        err
    }
}

/// Maps a normalized error to the status and JSON body sent to the caller.
pub struct ErrorHandler(Box<dyn Fn(&HttpError) -> (u16, Value) + Send + Sync>);

impl ErrorHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&HttpError) -> (u16, Value) + Send + Sync + 'static,
    {
        Self(Box::new(f))
    }
}

/// `{"code": c, "error": m}`, where `m` is replaced by a fixed string for 500.
#[must_use]
pub fn default_error_handler(err: &HttpError) -> (u16, Value) {
    let message = if err.code == 500 {
        INTERNAL_ERROR_MESSAGE
    } else {
        err.message.as_str()
    };
    (err.code, json!({ "code": err.code, "error": message }))
}

/// Error handler lookup for one JSON router level.
///
/// Routes hold their level's scope and resolve the handler when an error
/// happens, so a level without its own handler uses its parent's, and a
/// handler set after routes were registered still applies to them.
#[derive(Default)]
pub(crate) struct ErrorScope {
    own: ArcSwapOption<ErrorHandler>,
    parent: Option<Arc<ErrorScope>>,
}

impl ErrorScope {
    pub(crate) fn child(parent: &Arc<ErrorScope>) -> Self {
        Self {
            own: ArcSwapOption::empty(),
            parent: Some(Arc::clone(parent)),
        }
    }

    pub(crate) fn set(&self, handler: ErrorHandler) {
        self.own.store(Some(Arc::new(handler)));
    }

    pub(crate) fn resolve(&self, err: &HttpError) -> (u16, Value) {
        match self.own.load_full() {
            Some(handler) => (handler.0)(err),
            None => match &self.parent {
                Some(parent) => parent.resolve(err),
                None => default_error_handler(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_default_handler_surfaces_non_500_messages() {
        let (code, body) = default_error_handler(&HttpError::bad_request("bad request"));
        assert_eq!(code, 400);
        assert_eq!(body, json!({ "code": 400, "error": "bad request" }));
    }

    #[test]
    fn test_default_handler_hides_500_messages() {
        let (code, body) = default_error_handler(&HttpError::internal("db password leaked"));
        assert_eq!(code, 500);
        assert_eq!(body, json!({ "code": 500, "error": "internal server error" }));
    }

    #[test]
    fn test_normalize_unrecognized_errors() {
        assert_eq!(HttpError::normalize(anyhow!("boom")).code, 500);
        assert_eq!(HttpError::normalize(HttpError::new(42, "odd").into()).code, 500);
        assert_eq!(HttpError::normalize(HttpError::new(409, "conflict").into()).code, 409);
    }

    #[test]
    fn test_scope_inherits_until_overridden() {
        let root = Arc::new(ErrorScope::default());
        let child = ErrorScope::child(&root);
        root.set(ErrorHandler::new(|e| (e.code, json!("root"))));
        assert_eq!(child.resolve(&HttpError::not_found("x")).1, json!("root"));

        child.set(ErrorHandler::new(|_| (418, json!("child"))));
        assert_eq!(child.resolve(&HttpError::not_found("x")), (418, json!("child")));
        assert_eq!(root.resolve(&HttpError::not_found("x")).1, json!("root"));
    }
}
