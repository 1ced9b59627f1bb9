use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::resource::{GroupVersionKind, Object};

/// Operation under review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdmissionAction {
    Create,
    Update,
    Delete,
    Connect,
}

/// Identity of the user whose request is under review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// A decoded admission request, handed to validating and mutating controllers.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionRequest {
    pub action: AdmissionAction,
    pub gvk: GroupVersionKind,
    pub user_info: UserInfo,
    /// New state; absent on delete.
    pub object: Option<Object>,
    /// Previous state; present on update and delete.
    pub old_object: Option<Object>,
}

/// Result of a mutation. When `updated_object` is set, a JSON Patch from the
/// submitted object to it is returned to the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutatingResponse {
    pub updated_object: Option<Object>,
}

/// Error a controller or converter returns to deny with a specific status
/// code and machine-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AdmissionError {
    status_code: u16,
    reason: String,
    message: String,
}

impl AdmissionError {
    pub fn new(status_code: u16, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status_code,
            reason: reason.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

pub trait ValidatingController: Send + Sync {
    /// `Ok` admits; any error denies.
    fn validate(&self, ctx: &RequestContext, req: &AdmissionRequest) -> anyhow::Result<()>;
}

impl<F> ValidatingController for F
where
    F: Fn(&RequestContext, &AdmissionRequest) -> anyhow::Result<()> + Send + Sync,
{
    fn validate(&self, ctx: &RequestContext, req: &AdmissionRequest) -> anyhow::Result<()> {
        self(ctx, req)
    }
}

pub trait MutatingController: Send + Sync {
    /// `Ok` admits, possibly with an updated object; any error denies.
    fn mutate(&self, ctx: &RequestContext, req: &AdmissionRequest)
        -> anyhow::Result<MutatingResponse>;
}

impl<F> MutatingController for F
where
    F: Fn(&RequestContext, &AdmissionRequest) -> anyhow::Result<MutatingResponse> + Send + Sync,
{
    fn mutate(
        &self,
        ctx: &RequestContext,
        req: &AdmissionRequest,
    ) -> anyhow::Result<MutatingResponse> {
        self(ctx, req)
    }
}

/// An encoded object awaiting conversion, with the type header read from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    pub gvk: GroupVersionKind,
    pub raw: Vec<u8>,
}

pub trait Converter: Send + Sync {
    /// Re-encode `object` at `target_api_version`.
    fn convert(&self, object: RawObject, target_api_version: &str) -> anyhow::Result<Vec<u8>>;
}

impl<F> Converter for F
where
    F: Fn(RawObject, &str) -> anyhow::Result<Vec<u8>> + Send + Sync,
{
    fn convert(&self, object: RawObject, target_api_version: &str) -> anyhow::Result<Vec<u8>> {
        self(object, target_api_version)
    }
}
