//! Webhook router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use warden_admission::{AdmissionReview, DENY_MESSAGE, NodeAdmitter};
use warden_cluster::{
    ComponentConfig, Installation, InstallationSpec, MemoryCluster, NodePlacement, ObjectMeta,
    Pod, PodSpec,
};
use warden_core::config::AdmissionConfig;
use warden_core::labels;
use wardend::build_router;

fn cluster(pod_on_node: bool) -> MemoryCluster {
    let placement: NodePlacement =
        serde_json::from_value(json!({"nodeSelector": {"pool": "workloads"}})).unwrap();
    let cluster = MemoryCluster::new();
    cluster
        .seed(Installation {
            metadata: ObjectMeta::namespaced("warden", "warden"),
            spec: InstallationSpec {
                workloads: Some(ComponentConfig {
                    node_placement: Some(placement),
                }),
                ..Default::default()
            },
        })
        .unwrap();
    if pod_on_node {
        let mut metadata = ObjectMeta::namespaced("default", "launcher-1");
        metadata.labels = labels([("warden.io", "launcher")]);
        cluster
            .seed(Pod {
                metadata,
                spec: PodSpec {
                    node_name: "node01".to_string(),
                },
            })
            .unwrap();
    }
    cluster
}

fn router(cluster: MemoryCluster) -> axum::Router {
    build_router(Arc::new(NodeAdmitter::new(
        cluster,
        &AdmissionConfig::default(),
    )))
}

fn review(old_pool: &str, new_pool: &str) -> Value {
    json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
            "resource": {"group": "", "version": "v1", "resource": "nodes"},
            "operation": "UPDATE",
            "object": {"metadata": {"name": "node01", "labels": {"pool": new_pool}}},
            "oldObject": {"metadata": {"name": "node01", "labels": {"pool": old_pool}}}
        }
    })
}

async fn post_review(router: axum::Router, body: &Value) -> (StatusCode, AdmissionReview) {
    let req = Request::builder()
        .method("POST")
        .uri("/validate/nodes")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn allows_change_on_idle_node() {
    let (status, reply) = post_review(router(cluster(false)), &review("workloads", "batch")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply.api_version.as_deref(), Some("admission.k8s.io/v1"));
    assert_eq!(reply.kind.as_deref(), Some("AdmissionReview"));
    let response = reply.response.unwrap();
    assert!(response.allowed);
    assert_eq!(response.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
}

#[tokio::test]
async fn denies_change_under_running_workload() {
    let (status, reply) = post_review(router(cluster(true)), &review("workloads", "batch")).await;

    assert_eq!(status, StatusCode::OK);
    let response = reply.response.unwrap();
    assert!(!response.allowed);
    assert_eq!(response.message(), Some(DENY_MESSAGE));
}

#[tokio::test]
async fn rejects_review_without_request() {
    let body = json!({"apiVersion": "admission.k8s.io/v1", "kind": "AdmissionReview"});
    let (status, reply) = post_review(router(cluster(false)), &body).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!reply.response.unwrap().allowed);
}

async fn post_raw(body: &'static str) -> (StatusCode, AdmissionReview) {
    let req = Request::builder()
        .method("POST")
        .uri("/validate/nodes")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let resp = router(cluster(false)).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn malformed_body_is_denied_in_review() {
    let (status, reply) = post_raw("not json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply.kind.as_deref(), Some("AdmissionReview"));
    let response = reply.response.unwrap();
    assert!(!response.allowed);
    assert_eq!(response.status.unwrap().code, 400);
}

#[tokio::test]
async fn mistyped_request_is_denied_in_review() {
    let (status, reply) = post_raw(r#"{"request": 5}"#).await;

    assert_eq!(status, StatusCode::OK);
    let response = reply.response.unwrap();
    assert!(!response.allowed);
    assert!(response.message().unwrap().contains("invalid admission review"));
}

#[tokio::test]
async fn healthz_reports_ok() {
    let req = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let resp = router(MemoryCluster::new()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"ok");
}
