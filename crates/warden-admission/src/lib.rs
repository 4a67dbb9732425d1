//! Warden node admission: decides whether a node label change may proceed.
//!
//! A label change is refused when the node hosts workload launcher pods and
//! the new labels no longer satisfy the installation's workload placement,
//! since the node agent would then be evicted from under running workloads.
//!
//! # Components
//!
//! - **`admitter`**: [`NodeAdmitter`]: the decision procedure
//! - **`review`**: Admission review envelope (request/response shapes)
//! - **`error`**: [`AdmissionError`]

pub mod admitter;
pub mod error;
pub mod review;

pub use admitter::{DENY_MESSAGE, NodeAdmitter, NodeLabelState, Verdict};
pub use error::{AdmissionError, AdmissionResult};
pub use review::{
    AdmissionRequest, AdmissionResponse, AdmissionReview, GroupVersionResource, Operation, Status,
};
