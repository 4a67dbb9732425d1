//! Admission review envelope.
//!
//! Mirrors the JSON the API server posts to a validating webhook and the
//! response it expects back. Only the fields the node admitter reads are
//! modelled; unknown fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ADMISSION_API_VERSION: &str = "admission.k8s.io/v1";
pub const ADMISSION_KIND: &str = "AdmissionReview";

/// Status code carried by every rejection.
pub const REJECT_CODE: u16 = 400;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionReview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

impl AdmissionReview {
    /// Wrap a request, as the API server would.
    pub fn for_request(request: AdmissionRequest) -> Self {
        Self {
            api_version: Some(ADMISSION_API_VERSION.to_string()),
            kind: Some(ADMISSION_KIND.to_string()),
            request: Some(request),
            response: None,
        }
    }

    /// Build the reply envelope, echoing the request's API version.
    pub fn respond(&self, response: AdmissionResponse) -> Self {
        Self {
            api_version: Some(
                self.api_version
                    .clone()
                    .unwrap_or_else(|| ADMISSION_API_VERSION.to_string()),
            ),
            kind: Some(ADMISSION_KIND.to_string()),
            request: None,
            response: Some(response),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionRequest {
    pub uid: String,
    pub resource: GroupVersionResource,
    pub operation: Operation,
    /// The object as it would be persisted.
    pub object: Value,
    /// The object before the change; only set on updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_object: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    /// Core-group `v1/nodes`.
    pub fn nodes() -> Self {
        Self {
            group: String::new(),
            version: "v1".to_string(),
            resource: "nodes".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    #[default]
    Create,
    Update,
    Delete,
    Connect,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl AdmissionResponse {
    pub fn allow(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            allowed: true,
            status: None,
        }
    }

    pub fn reject(uid: &str, message: impl Into<String>) -> Self {
        Self {
            uid: uid.to_string(),
            allowed: false,
            status: Some(Status {
                code: REJECT_CODE,
                message: message.into(),
            }),
        }
    }

    /// Rejection message, if any.
    pub fn message(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.message.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub code: u16,
    pub message: String,
}
