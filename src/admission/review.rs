//! Wire envelopes of the admission and conversion webhook protocols.
//!
//! Field names follow the third-party JSON exactly. Embedded objects are kept
//! as [`RawValue`] so the submitted bytes reach the kind codec untouched and
//! patches are computed against what the caller actually sent.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use super::controller::{AdmissionAction, UserInfo};
use crate::resource::GroupVersionKind;

pub const ADMISSION_API_VERSION: &str = "admission.k8s.io/v1";
pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";
pub const CONVERSION_API_VERSION: &str = "apiextensions.k8s.io/v1";
pub const CONVERSION_REVIEW_KIND: &str = "ConversionReview";
pub const JSON_PATCH_TYPE: &str = "JSONPatch";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionReviewRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionReviewResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReviewRequest {
    pub uid: String,
    pub kind: GroupVersionKind,
    pub operation: AdmissionAction,
    #[serde(default)]
    pub user_info: UserInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Box<RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_object: Option<Box<RawValue>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReviewResponse {
    pub uid: String,
    pub allowed: bool,
    /// Serialized under `status`, as the protocol names it.
    #[serde(rename = "status", default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Status>,
    /// Base64 of the JSON Patch document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusPhase {
    #[default]
    Success,
    Failure,
}

/// Outcome details embedded in both review responses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Status {
    pub status: StatusPhase,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub code: u16,
}

fn is_zero(code: &u16) -> bool {
    *code == 0
}

impl Status {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: StatusPhase::Failure,
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn failure_with_code(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            ..Self::failure(message)
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReview {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ConversionReviewRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ConversionReviewResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversionReviewRequest {
    pub uid: String,
    #[serde(rename = "desiredAPIVersion")]
    pub desired_api_version: String,
    #[serde(default)]
    pub objects: Vec<Box<RawValue>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversionReviewResponse {
    pub uid: String,
    #[serde(rename = "convertedObjects")]
    pub converted_objects: Vec<Box<RawValue>>,
    pub result: Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_admission_request_decodes_wire_names() {
        let body = json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "abc",
                "kind": { "group": "zoo.example.com", "version": "v1", "kind": "Animal" },
                "operation": "UPDATE",
                "userInfo": { "username": "ada", "uid": "1", "groups": ["admins"] },
                "object": { "a": 2 },
                "oldObject": { "a": 1 }
            }
        });
        let review: AdmissionReview = serde_json::from_value(body).unwrap();
        let request = review.request.unwrap();
        assert_eq!(request.operation, AdmissionAction::Update);
        assert_eq!(request.user_info.groups, vec!["admins".to_string()]);
        assert_eq!(request.object.unwrap().get(), r#"{"a":2}"#);
        assert_eq!(request.old_object.unwrap().get(), r#"{"a":1}"#);
    }

    #[test]
    fn test_admission_response_encodes_result_as_status() {
        let response = AdmissionReviewResponse {
            uid: "abc".into(),
            allowed: false,
            result: Some(Status::failure_with_code(403, "nope")),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "uid": "abc",
                "allowed": false,
                "status": { "status": "Failure", "message": "nope", "code": 403 }
            })
        );
    }
}
