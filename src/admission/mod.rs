//! # Admission Module
//!
//! Webhook dispatcher for per-kind admission and conversion policy.
//!
//! [`AdmissionController`] is a standalone [`CallResourceHandler`](crate::call::CallResourceHandler)
//! serving three sub-paths:
//!
//! | Path | Method | Review | Capability |
//! |---|---|---|---|
//! | `validate` | POST | `AdmissionReview` | [`ValidatingController`] |
//! | `mutate` | POST | `AdmissionReview` | [`MutatingController`] |
//! | `convert` | any | `ConversionReview` | [`Converter`] |
//!
//! Controllers are looked up by the group and kind named in the review.
//! Validate and mutate fall back to a default controller when one is set;
//! conversion has no fallback.
//!
//! ## Decisions
//!
//! A controller that returns an error denies the request. When the error is
//! (or wraps) an [`AdmissionError`], its status code and reason are copied
//! into the response status. The transport status stays 200 either way.
//!
//! A mutating controller that returns an updated object gets a base64 JSON
//! Patch computed from the submitted object bytes to the re-encoded update.
//! Failing to build that patch denies the request.
//!
//! ## Conversion
//!
//! Objects are converted in order. The first failure stops the loop, keeps
//! what was already converted, and reports a `Failure` result whose code
//! says why: 400 for an unreadable type header, 422 for a kind without a
//! converter, the converter's [`AdmissionError`] code (or 500) for a failed
//! conversion, and 500 for output that is not JSON.
//!
//! ## Example
//!
//! ```rust,ignore
//! use kindrouter::admission::{AdmissionController, AdmissionRequest};
//! use kindrouter::context::RequestContext;
//! use kindrouter::resource::Kind;
//!
//! let mut admission = AdmissionController::new();
//! admission.register_validator(
//!     Kind::new("zoo.example.com", "v1", "Animal", "animals"),
//!     |_ctx: &RequestContext, req: &AdmissionRequest| -> anyhow::Result<()> {
//!         anyhow::ensure!(req.object.is_some(), "object required");
//!         Ok(())
//!     },
//! );
//! ```

mod controller;
mod core;
mod patch;
mod registry;
mod review;

pub use controller::{
    AdmissionAction, AdmissionError, AdmissionRequest, Converter, MutatingController,
    MutatingResponse, RawObject, UserInfo, ValidatingController,
};
pub use core::{AdmissionController, CONVERT_PATH, MUTATE_PATH, VALIDATE_PATH};
pub use review::{
    AdmissionReview, AdmissionReviewRequest, AdmissionReviewResponse, ConversionReview,
    ConversionReviewRequest, ConversionReviewResponse, Status, StatusPhase, ADMISSION_API_VERSION,
    ADMISSION_REVIEW_KIND, CONVERSION_API_VERSION, CONVERSION_REVIEW_KIND, JSON_PATCH_TYPE,
};
