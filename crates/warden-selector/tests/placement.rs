//! Placement selectors evaluated against a small node fleet.

use serde_json::json;
use warden_cluster::NodePlacement;
use warden_core::{Labels, labels};
use warden_selector::{SelectorError, placement_to_selector};

fn placement(value: serde_json::Value) -> NodePlacement {
    serde_json::from_value(value).unwrap()
}

fn fleet() -> Vec<(&'static str, Labels)> {
    vec![
        ("gpu-1", labels([("pool", "workloads"), ("accel", "gpu"), ("cores", "64")])),
        ("cpu-1", labels([("pool", "workloads"), ("cores", "16")])),
        ("edge-1", labels([("pool", "edge"), ("cores", "8"), ("tainted", "true")])),
        ("bare", Labels::new()),
    ]
}

fn eligible(placement: &NodePlacement) -> Vec<&'static str> {
    let selector = placement_to_selector(placement).unwrap();
    fleet()
        .into_iter()
        .filter(|(_, labels)| selector.matches(labels))
        .map(|(name, _)| name)
        .collect()
}

#[test]
fn empty_placement_admits_every_node() {
    assert_eq!(
        eligible(&NodePlacement::default()),
        vec!["gpu-1", "cpu-1", "edge-1", "bare"]
    );
}

#[test]
fn node_selector_and_affinity_combine() {
    let p = placement(json!({
        "nodeSelector": {"pool": "workloads"},
        "affinity": {"nodeAffinity": {"requiredDuringSchedulingIgnoredDuringExecution": {
            "nodeSelectorTerms": [
                {"matchExpressions": [{"key": "cores", "operator": "Gt", "values": ["32"]}]}
            ]
        }}}
    }));
    assert_eq!(eligible(&p), vec!["gpu-1"]);
}

#[test]
fn negative_operators_admit_unlabelled_nodes() {
    let p = placement(json!({
        "affinity": {"nodeAffinity": {"requiredDuringSchedulingIgnoredDuringExecution": {
            "nodeSelectorTerms": [{"matchExpressions": [
                {"key": "tainted", "operator": "DoesNotExist"},
                {"key": "pool", "operator": "NotIn", "values": ["edge"]}
            ]}]
        }}}
    }));
    assert_eq!(eligible(&p), vec!["gpu-1", "cpu-1", "bare"]);
}

#[test]
fn preferred_terms_do_not_narrow() {
    let p = placement(json!({
        "nodeSelector": {"pool": "workloads"},
        "affinity": {"nodeAffinity": {"preferredDuringSchedulingIgnoredDuringExecution": [
            {"weight": 10, "preference": {"matchExpressions": [
                {"key": "accel", "operator": "In", "values": ["gpu"]}
            ]}}
        ]}}
    }));
    assert_eq!(eligible(&p), vec!["gpu-1", "cpu-1"]);
}

#[test]
fn unknown_operator_is_reported_by_name() {
    let p = placement(json!({
        "affinity": {"nodeAffinity": {"requiredDuringSchedulingIgnoredDuringExecution": {
            "nodeSelectorTerms": [{"matchExpressions": [
                {"key": "zone", "operator": "Near", "values": ["a"]}
            ]}]
        }}}
    }));
    match placement_to_selector(&p) {
        Err(SelectorError::UnsupportedOperator { key, operator }) => {
            assert_eq!(key, "zone");
            assert_eq!(operator, "Near");
        }
        other => panic!("expected unsupported operator, got {other:?}"),
    }
}
