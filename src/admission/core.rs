use std::borrow::Cow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::{debug, warn};

use super::controller::{
    AdmissionError, AdmissionRequest, Converter, MutatingController, MutatingResponse, RawObject,
    ValidatingController,
};
use super::patch::encoded_patch;
use super::registry::{Capability, CapabilityRegistry};
use super::review::{
    AdmissionReview, AdmissionReviewRequest, AdmissionReviewResponse, ConversionReview,
    ConversionReviewResponse, Status, ADMISSION_API_VERSION, ADMISSION_REVIEW_KIND,
    CONVERSION_API_VERSION, CONVERSION_REVIEW_KIND, JSON_PATCH_TYPE,
};
use crate::call::{CallResourceHandler, CallResourceRequest, CallResourceResponse, ResponseSender};
use crate::context::RequestContext;
use crate::resource::{GroupKind, GroupVersionKind, Kind, Object};

pub const CONVERT_PATH: &str = "convert";
pub const VALIDATE_PATH: &str = "validate";
pub const MUTATE_PATH: &str = "mutate";

/// Dispatcher for the admission webhook sub-paths.
///
/// Serves `convert`, `validate` and `mutate` relative to wherever the
/// transport mounts it, and is independent of [`Router`](crate::router::Router).
/// Protocol-level failures (unknown path, wrong method, undecodable review,
/// no controller) are answered with plain-text transport errors. Everything a
/// controller decides is answered with a 200 carrying the review envelope.
///
/// Registration takes `&mut self`, so every capability is in place before the
/// controller is shared with the transport.
#[derive(Default)]
pub struct AdmissionController {
    registry: CapabilityRegistry,
}

impl AdmissionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_validator(
        &mut self,
        kind: Kind,
        controller: impl ValidatingController + 'static,
    ) -> &mut Self {
        self.register_shared_validator(kind, Arc::new(controller))
    }

    pub fn register_shared_validator(
        &mut self,
        kind: Kind,
        controller: Arc<dyn ValidatingController>,
    ) -> &mut Self {
        debug!(group = kind.group(), kind = kind.kind(), "Registering validating controller");
        self.registry
            .insert(kind.group_kind(), Capability::Validating { kind, controller });
        self
    }

    pub fn register_mutator(
        &mut self,
        kind: Kind,
        controller: impl MutatingController + 'static,
    ) -> &mut Self {
        self.register_shared_mutator(kind, Arc::new(controller))
    }

    pub fn register_shared_mutator(
        &mut self,
        kind: Kind,
        controller: Arc<dyn MutatingController>,
    ) -> &mut Self {
        debug!(group = kind.group(), kind = kind.kind(), "Registering mutating controller");
        self.registry
            .insert(kind.group_kind(), Capability::Mutating { kind, controller });
        self
    }

    pub fn register_converter(
        &mut self,
        group_kind: GroupKind,
        converter: impl Converter + 'static,
    ) -> &mut Self {
        debug!(%group_kind, "Registering converter");
        self.registry
            .insert(group_kind, Capability::Converting(Arc::new(converter)));
        self
    }

    /// Controller for kinds without their own validating entry. Their
    /// objects decode as untyped JSON.
    pub fn set_default_validator(
        &mut self,
        controller: impl ValidatingController + 'static,
    ) -> &mut Self {
        self.registry.set_default_validator(Arc::new(controller));
        self
    }

    pub fn set_default_mutator(
        &mut self,
        controller: impl MutatingController + 'static,
    ) -> &mut Self {
        self.registry.set_default_mutator(Arc::new(controller));
        self
    }

    /// Handle one webhook call and produce its response.
    #[must_use]
    pub fn respond(&self, ctx: &RequestContext, req: &CallResourceRequest) -> CallResourceResponse {
        let path = req.path_only().trim_matches('/');
        let is_post = req.method.eq_ignore_ascii_case("POST");
        match path {
            CONVERT_PATH => self.convert(req),
            VALIDATE_PATH | MUTATE_PATH if !is_post => {
                debug!(path, method = %req.method, "Admission webhook called with wrong method");
                CallResourceResponse::text(405, "method not allowed").with_header("allow", "POST")
            }
            VALIDATE_PATH => self.validate(ctx, req),
            MUTATE_PATH => self.mutate(ctx, req),
            _ => {
                debug!(path, "Unknown admission webhook path");
                CallResourceResponse::text(404, "not found")
            }
        }
    }

    fn validate(&self, ctx: &RequestContext, req: &CallResourceRequest) -> CallResourceResponse {
        let (api_version, review) = match decode_admission_review(&req.body) {
            Ok(decoded) => decoded,
            Err(response) => return response,
        };
        let group_kind = review.kind.group_kind();
        let Some((kind, controller)) = self.registry.validator(&group_kind) else {
            return no_controller("validating", &group_kind);
        };
        let kind = resolve_kind(kind, &review.kind);
        let request = match admission_request(&kind, &review) {
            Ok(request) => request,
            Err(response) => return response,
        };

        let response = match controller.validate(ctx, &request) {
            Ok(()) => allowed(review.uid),
            Err(err) => denied(review.uid, &err),
        };
        admission_response(api_version, response)
    }

    fn mutate(&self, ctx: &RequestContext, req: &CallResourceRequest) -> CallResourceResponse {
        let (api_version, review) = match decode_admission_review(&req.body) {
            Ok(decoded) => decoded,
            Err(response) => return response,
        };
        let group_kind = review.kind.group_kind();
        let Some((kind, controller)) = self.registry.mutator(&group_kind) else {
            return no_controller("mutating", &group_kind);
        };
        let kind = resolve_kind(kind, &review.kind);
        let request = match admission_request(&kind, &review) {
            Ok(request) => request,
            Err(response) => return response,
        };

        let outcome = controller
            .mutate(ctx, &request)
            .and_then(|mutation| mutation_patch(&kind, review.object.as_deref(), mutation));
        let response = match outcome {
            Ok(patch) => AdmissionReviewResponse {
                patch_type: patch.as_ref().map(|_| JSON_PATCH_TYPE.to_string()),
                patch,
                ..allowed(review.uid)
            },
            Err(err) => denied(review.uid, &err),
        };
        admission_response(api_version, response)
    }

    fn convert(&self, req: &CallResourceRequest) -> CallResourceResponse {
        let review: ConversionReview = match serde_json::from_slice(&req.body) {
            Ok(review) => review,
            Err(err) => {
                debug!(error = %err, "Malformed conversion review");
                return CallResourceResponse::text(400, &format!("malformed conversion review: {err}"));
            }
        };
        let Some(request) = review.request else {
            return CallResourceResponse::text(400, "conversion review has no request");
        };

        let mut converted = Vec::with_capacity(request.objects.len());
        let mut result = Status::success();
        for (index, object) in request.objects.iter().enumerate() {
            match self.convert_one(object, &request.desired_api_version) {
                Ok(object) => converted.push(object),
                Err(failure) => {
                    warn!(
                        uid = %request.uid,
                        index,
                        code = failure.code,
                        message = %failure.message,
                        "Conversion failed"
                    );
                    result = failure;
                    break;
                }
            }
        }

        let envelope = ConversionReview {
            api_version: or_default(review.api_version, CONVERSION_API_VERSION),
            kind: CONVERSION_REVIEW_KIND.to_string(),
            request: None,
            response: Some(ConversionReviewResponse {
                uid: request.uid,
                converted_objects: converted,
                result,
            }),
        };
        encode_envelope(&envelope)
    }

    fn convert_one(&self, object: &RawValue, desired: &str) -> Result<Box<RawValue>, Status> {
        let header: TypeHeader = serde_json::from_str(object.get())
            .map_err(|e| Status::failure_with_code(400, format!("invalid object type header: {e}")))?;
        let gvk = GroupVersionKind::from_api_version(&header.api_version, &header.kind);
        let group_kind = gvk.group_kind();
        let converter = self.registry.converter(&group_kind).ok_or_else(|| {
            Status::failure_with_code(422, format!("no converter registered for {group_kind}"))
        })?;

        let raw = RawObject {
            gvk,
            raw: object.get().as_bytes().to_vec(),
        };
        let bytes = converter.convert(raw, desired).map_err(|err| {
            let code = err
                .downcast_ref::<AdmissionError>()
                .map_or(500, AdmissionError::status_code);
            Status::failure_with_code(code, err.to_string())
        })?;

        String::from_utf8(bytes)
            .map_err(|e| e.to_string())
            .and_then(|text| RawValue::from_string(text).map_err(|e| e.to_string()))
            .map_err(|e| Status::failure_with_code(500, format!("converter produced invalid JSON: {e}")))
    }
}

impl CallResourceHandler for AdmissionController {
    fn call_resource(
        &self,
        ctx: RequestContext,
        req: CallResourceRequest,
        sender: &dyn ResponseSender,
    ) -> anyhow::Result<()> {
        sender.send(self.respond(&ctx, &req))
    }
}

/// `apiVersion` and `kind` of an object submitted for conversion.
#[derive(Deserialize)]
struct TypeHeader {
    #[serde(rename = "apiVersion", default)]
    api_version: String,
    #[serde(default)]
    kind: String,
}

fn decode_admission_review(
    body: &[u8],
) -> Result<(String, AdmissionReviewRequest), CallResourceResponse> {
    let review: AdmissionReview = serde_json::from_slice(body).map_err(|err| {
        debug!(error = %err, "Malformed admission review");
        CallResourceResponse::text(400, &format!("malformed admission review: {err}"))
    })?;
    match review.request {
        Some(request) => Ok((review.api_version, request)),
        None => Err(CallResourceResponse::text(400, "admission review has no request")),
    }
}

fn resolve_kind<'a>(registered: Option<&'a Kind>, gvk: &GroupVersionKind) -> Cow<'a, Kind> {
    match registered {
        Some(kind) => Cow::Borrowed(kind),
        None => Cow::Owned(Kind::untyped(gvk.clone())),
    }
}

fn no_controller(role: &str, group_kind: &GroupKind) -> CallResourceResponse {
    warn!(role, %group_kind, "No admission controller registered");
    CallResourceResponse::text(500, &format!("no {role} controller registered for {group_kind}"))
}

fn admission_request(
    kind: &Kind,
    review: &AdmissionReviewRequest,
) -> Result<AdmissionRequest, CallResourceResponse> {
    let decode = |raw: Option<&RawValue>, field: &str| -> Result<Option<Object>, CallResourceResponse> {
        raw.map(|raw| kind.decode(raw.get().as_bytes()))
            .transpose()
            .map_err(|err| CallResourceResponse::text(400, &format!("invalid {field}: {err}")))
    };
    Ok(AdmissionRequest {
        action: review.operation,
        gvk: review.kind.clone(),
        user_info: review.user_info.clone(),
        object: decode(review.object.as_deref(), "object")?,
        old_object: decode(review.old_object.as_deref(), "oldObject")?,
    })
}

/// Base64 JSON Patch from the submitted object to the mutated one, if the
/// controller returned one.
fn mutation_patch(
    kind: &Kind,
    original: Option<&RawValue>,
    mutation: MutatingResponse,
) -> anyhow::Result<Option<String>> {
    let Some(updated) = mutation.updated_object else {
        return Ok(None);
    };
    let encoded = kind.encode(&updated)?;
    let original = original.map_or(&[][..], |raw| raw.get().as_bytes());
    encoded_patch(original, &encoded).map(Some)
}

fn allowed(uid: String) -> AdmissionReviewResponse {
    AdmissionReviewResponse {
        uid,
        allowed: true,
        result: Some(Status {
            code: 200,
            ..Status::success()
        }),
        ..AdmissionReviewResponse::default()
    }
}

fn denied(uid: String, err: &anyhow::Error) -> AdmissionReviewResponse {
    let mut status = Status::failure(err.to_string());
    if let Some(admission) = err.downcast_ref::<AdmissionError>() {
        status.code = admission.status_code();
        status.reason = admission.reason().to_string();
    }
    debug!(%uid, message = %status.message, code = status.code, "Admission denied");
    AdmissionReviewResponse {
        uid,
        allowed: false,
        result: Some(status),
        ..AdmissionReviewResponse::default()
    }
}

fn admission_response(api_version: String, response: AdmissionReviewResponse) -> CallResourceResponse {
    let envelope = AdmissionReview {
        api_version: or_default(api_version, ADMISSION_API_VERSION),
        kind: ADMISSION_REVIEW_KIND.to_string(),
        request: None,
        response: Some(response),
    };
    encode_envelope(&envelope)
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn encode_envelope<T: Serialize>(envelope: &T) -> CallResourceResponse {
    match serde_json::to_vec(envelope) {
        Ok(body) => CallResourceResponse::new(200)
            .with_header("content-type", "application/json")
            .with_body(body),
        Err(err) => {
            warn!(error = %err, "Failed to encode review response");
            CallResourceResponse::text(500, "failed to encode review response")
        }
    }
}
