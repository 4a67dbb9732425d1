//! Admission webhook routes.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{debug, warn};
use warden_admission::{AdmissionResponse, AdmissionReview, NodeAdmitter};
use warden_cluster::MemoryCluster;

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub admitter: Arc<NodeAdmitter<MemoryCluster>>,
}

pub fn build_router(admitter: Arc<NodeAdmitter<MemoryCluster>>) -> Router {
    Router::new()
        .route("/validate/nodes", post(validate_nodes))
        .route("/healthz", get(healthz))
        .with_state(WebhookState { admitter })
}

/// POST /validate/nodes
///
/// Always answers with an `AdmissionReview`; a body that does not decode
/// is rejected inside the review rather than with an HTTP error.
async fn validate_nodes(State(state): State<WebhookState>, body: Bytes) -> Json<AdmissionReview> {
    let review: AdmissionReview = match serde_json::from_slice(&body) {
        Ok(review) => review,
        Err(e) => {
            warn!(error = %e, "undecodable admission review");
            let response = AdmissionResponse::reject("", format!("invalid admission review: {e}"));
            return Json(AdmissionReview::default().respond(response));
        }
    };
    let response = state.admitter.admit(&review);
    debug!(uid = %response.uid, allowed = response.allowed, "node admission reviewed");
    Json(review.respond(response))
}

/// GET /healthz
async fn healthz() -> &'static str {
    "ok"
}
