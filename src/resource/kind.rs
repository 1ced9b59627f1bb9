use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::object::Object;

/// Group/version/kind: the three-part type identity of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Split an `apiVersion` (`group/version`, or bare `version` for the core
    /// group) into its parts.
    #[must_use]
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        match api_version.rsplit_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    #[must_use]
    pub fn group_kind(&self) -> GroupKind {
        GroupKind::new(self.group.clone(), self.kind.clone())
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// Version-independent key used to look up per-kind capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group {:?} kind {:?}", self.group, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("failed to decode object: {0}")]
    Decode(String),
    #[error("failed to encode object: {0}")]
    Encode(String),
}

/// Wire encoding of a kind's objects.
pub trait Codec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Object, CodecError>;
    fn encode(&self, object: &Object) -> Result<Vec<u8>, CodecError>;
}

/// Plain JSON encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Object, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn encode(&self, object: &Object) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(object).map_err(|e| CodecError::Encode(e.to_string()))
    }
}

/// Description of one resource type: identity, plural path segment, codec.
#[derive(Clone)]
pub struct Kind {
    gvk: GroupVersionKind,
    plural: String,
    codec: Arc<dyn Codec>,
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kind")
            .field("gvk", &self.gvk)
            .field("plural", &self.plural)
            .finish_non_exhaustive()
    }
}

impl Kind {
    /// A kind encoded as plain JSON.
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        plural: impl Into<String>,
    ) -> Self {
        Self {
            gvk: GroupVersionKind::new(group, version, kind),
            plural: plural.into(),
            codec: Arc::new(JsonCodec),
        }
    }

    /// A generic JSON kind for a type nobody registered, so its objects can
    /// still be decoded.
    #[must_use]
    pub fn untyped(gvk: GroupVersionKind) -> Self {
        let plural = format!("{}s", gvk.kind.to_lowercase());
        Self {
            gvk,
            plural,
            codec: Arc::new(JsonCodec),
        }
    }

    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.gvk.group
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.gvk.version
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.gvk.kind
    }

    #[must_use]
    pub fn plural(&self) -> &str {
        &self.plural
    }

    #[must_use]
    pub fn group_kind(&self) -> GroupKind {
        self.gvk.group_kind()
    }

    #[must_use]
    pub fn api_version(&self) -> String {
        self.gvk.api_version()
    }

    /// An empty object of this kind with its type header set.
    #[must_use]
    pub fn zero_value(&self) -> Object {
        Object {
            api_version: Some(self.api_version()),
            kind: Some(self.gvk.kind.clone()),
            ..Object::default()
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Object, CodecError> {
        self.codec.decode(bytes)
    }

    pub fn encode(&self, object: &Object) -> Result<Vec<u8>, CodecError> {
        self.codec.encode(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_split() {
        let gvk = GroupVersionKind::from_api_version("apps.example.com/v2", "Widget");
        assert_eq!(gvk, GroupVersionKind::new("apps.example.com", "v2", "Widget"));
        assert_eq!(gvk.api_version(), "apps.example.com/v2");

        let core = GroupVersionKind::from_api_version("v1", "Pod");
        assert_eq!(core.group, "");
        assert_eq!(core.api_version(), "v1");
    }

    #[test]
    fn test_zero_value_carries_type_header() {
        let kind = Kind::new("zoo.example.com", "v1", "Animal", "animals");
        let obj = kind.zero_value();
        assert_eq!(obj.api_version.as_deref(), Some("zoo.example.com/v1"));
        assert_eq!(obj.kind.as_deref(), Some("Animal"));
        assert!(obj.metadata.is_none());
    }

    #[test]
    fn test_untyped_kind_decodes_json() {
        let kind = Kind::untyped(GroupVersionKind::new("g", "v1", "Thing"));
        assert_eq!(kind.plural(), "things");
        let obj = kind.decode(br#"{"metadata":{"name":"t"}}"#).unwrap();
        assert_eq!(obj.name(), "t");
        assert!(matches!(kind.decode(b"[1,2"), Err(CodecError::Decode(_))));
    }
}
