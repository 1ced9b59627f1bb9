use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Object metadata. Only identity is modelled; everything else round-trips
/// through `extra` untouched.
///
/// Identity fields are optional so that an empty `name` or `namespace` in the
/// submitted document is written back exactly as it arrived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A resource object: type header, metadata, and the remaining fields as
/// free-form JSON.
///
/// Decoding then re-encoding an object reproduces the same JSON document, so
/// an unmodified object never yields a patch. Absent and empty are kept
/// apart for every modelled field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(rename = "apiVersion", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Object {
    /// Top-level field other than the type header and metadata.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.namespace.as_deref())
            .unwrap_or_default()
    }

    /// Metadata, created empty if the document had none.
    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        self.metadata.get_or_insert_with(ObjectMeta::default)
    }

    #[must_use]
    pub fn identifier(&self) -> ObjectIdentifier {
        ObjectIdentifier {
            namespace: self.namespace().to_string(),
            name: self.name().to_string(),
        }
    }
}

/// Namespace and name of one object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectIdentifier {
    pub namespace: String,
    pub name: String,
}

/// List envelope returned by collection reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectList {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub items: Vec<Object>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_round_trips_unknown_fields() {
        let doc = json!({
            "apiVersion": "zoo.example.com/v1",
            "kind": "Animal",
            "metadata": { "name": "rex", "labels": { "a": "b" } },
            "spec": { "legs": 4 },
            "status": { "fed": true }
        });
        let obj: Object = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(obj.name(), "rex");
        assert_eq!(obj.field("spec"), Some(&json!({ "legs": 4 })));
        assert_eq!(serde_json::to_value(&obj).unwrap(), doc);
    }

    #[test]
    fn test_empty_identity_fields_survive() {
        let doc = json!({
            "apiVersion": "",
            "kind": "Animal",
            "metadata": { "name": "x", "namespace": "" }
        });
        let obj: Object = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(obj.namespace(), "");
        assert_eq!(serde_json::to_value(&obj).unwrap(), doc);

        let doc = json!({ "metadata": {}, "spec": { "legs": 4 } });
        let obj: Object = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(obj.metadata, Some(ObjectMeta::default()));
        assert_eq!(serde_json::to_value(&obj).unwrap(), doc);
    }

    #[test]
    fn test_bare_document_stays_bare() {
        let doc = json!({ "a": 1 });
        let obj: Object = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(serde_json::to_value(&obj).unwrap(), doc);
    }
}
