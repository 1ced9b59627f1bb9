use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

/// JSON Patch (RFC 6902) turning the `original` document into `updated`,
/// base64-encoded for the admission response.
///
/// An empty `original` is treated as `null`, so a mutation of an absent
/// object produces a single whole-document `add`.
pub(crate) fn encoded_patch(original: &[u8], updated: &[u8]) -> anyhow::Result<String> {
    let from: Value = if original.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(original).context("submitted object is not valid JSON")?
    };
    let to: Value =
        serde_json::from_slice(updated).context("updated object is not valid JSON")?;

    let patch = json_patch::diff(&from, &to);
    let bytes = serde_json::to_vec(&patch).context("failed to encode JSON patch")?;
    Ok(STANDARD.encode(bytes))
}
