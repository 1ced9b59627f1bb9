use std::collections::BTreeMap;
use std::sync::mpsc;

use anyhow::anyhow;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RequestContext;

/// Case-insensitive header multi-map.
///
/// Names are stored lower-cased; each name maps to every value received for it
/// in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers(BTreeMap<String, Vec<String>>);

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values for `name` in arrival order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Replace every value of `name` with `value`.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), vec![value.into()]);
    }

    /// Add `value` after any existing values of `name`.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.0
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name.as_ref(), value);
        }
        headers
    }
}

/// Identity of whoever issued the call, as supplied by the transport.
///
/// The dispatch layer never interprets it; it is carried through to handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallerContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Opaque per-installation settings.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub settings: Value,
}

/// A generic "call a resource endpoint" request handed over by the transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallResourceRequest {
    pub caller: CallerContext,
    pub method: String,
    /// Path relative to the resource root, including any query string.
    pub path: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl CallResourceRequest {
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_caller(mut self, caller: CallerContext) -> Self {
        self.caller = caller;
        self
    }

    /// The path with any query string removed.
    #[must_use]
    pub fn path_only(&self) -> &str {
        self.path
            .split_once('?')
            .map_or(self.path.as_str(), |(path, _)| path)
    }

    /// The raw query string, without the leading `?`.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_, query)| query)
    }
}

/// Response sent back to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallResourceResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl CallResourceResponse {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// A JSON response with the `content-type` header set.
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string().into_bytes())
    }

    /// A plain-text response, used where a protocol failure happens before
    /// any envelope can be built.
    #[must_use]
    pub fn text(status: u16, message: &str) -> Self {
        Self::new(status)
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_body(message.as_bytes().to_vec())
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Parse the body as JSON. Absent bodies parse as `null`.
    pub fn body_json(&self) -> serde_json::Result<Value> {
        match &self.body {
            Some(body) => serde_json::from_slice(body),
            None => Ok(Value::Null),
        }
    }
}

/// The write-once sink a handler delivers its response through.
pub trait ResponseSender {
    fn send(&self, response: CallResourceResponse) -> anyhow::Result<()>;
}

impl ResponseSender for mpsc::Sender<CallResourceResponse> {
    fn send(&self, response: CallResourceResponse) -> anyhow::Result<()> {
        mpsc::Sender::send(self, response).map_err(|_| anyhow!("response receiver dropped"))
    }
}

/// Anything that can serve a call: routers and the admission controller.
pub trait CallResourceHandler: Send + Sync {
    fn call_resource(
        &self,
        ctx: RequestContext,
        req: CallResourceRequest,
        sender: &dyn ResponseSender,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("downstream handler completed without sending a response")]
    Empty,
}

/// Two-phase response holder.
///
/// Downstream writes go into the holder (the last write wins); the captured
/// response is then taken out and flushed to the real sink exactly once.
#[derive(Debug, Default)]
pub struct ResponseCapture {
    slot: Mutex<Option<CallResourceResponse>>,
}

impl ResponseCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the captured response.
    pub fn take(&self) -> Option<CallResourceResponse> {
        self.slot.lock().take()
    }

    /// Consume the holder, failing if nothing was written.
    pub fn into_response(self) -> Result<CallResourceResponse, CaptureError> {
        self.slot.into_inner().ok_or(CaptureError::Empty)
    }

    /// Write the captured response to `sink`.
    pub fn flush(self, sink: &dyn ResponseSender) -> anyhow::Result<()> {
        sink.send(self.into_response()?)
    }
}

impl ResponseSender for ResponseCapture {
    fn send(&self, response: CallResourceResponse) -> anyhow::Result<()> {
        *self.slot.lock() = Some(response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_case_insensitive_multimap() {
        let mut headers = Headers::new();
        headers.append("X-Trace", "a");
        headers.append("x-trace", "b");
        assert_eq!(headers.get("X-TRACE"), Some("a"));
        assert_eq!(headers.get_all("x-trace"), ["a", "b"]);
        headers.insert("x-trace", "c");
        assert_eq!(headers.get_all("x-trace"), ["c"]);
        assert!(headers.get_all("missing").is_empty());
    }

    #[test]
    fn test_path_only_strips_query() {
        let req = CallResourceRequest::new("GET", "/pets/1?verbose=true");
        assert_eq!(req.path_only(), "/pets/1");
        assert_eq!(req.query(), Some("verbose=true"));
        assert_eq!(CallResourceRequest::new("GET", "/pets").query(), None);
    }

    #[test]
    fn test_capture_last_write_wins() {
        let capture = ResponseCapture::new();
        capture.send(CallResourceResponse::new(200)).unwrap();
        capture.send(CallResourceResponse::new(418)).unwrap();
        assert_eq!(capture.into_response().unwrap().status, 418);
    }

    #[test]
    fn test_capture_flush_requires_a_write() {
        let (tx, rx) = mpsc::channel();
        assert!(ResponseCapture::new().flush(&tx).is_err());

        let capture = ResponseCapture::new();
        capture.send(CallResourceResponse::text(404, "nope")).unwrap();
        capture.flush(&tx).unwrap();
        let sent = rx.recv().unwrap();
        assert_eq!(sent.status, 404);
        assert_eq!(sent.body.as_deref(), Some(&b"nope"[..]));
    }
}
