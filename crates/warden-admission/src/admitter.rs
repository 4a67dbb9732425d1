//! Node label admission.
//!
//! A node's labels decide whether the workload agent may run there. If a
//! label change makes the node fall out of the installation's workload
//! placement while launcher pods are still bound to it, the agent would be
//! evicted from under them. [`NodeAdmitter`] refuses such changes.
//!
//! Decision order (first match wins):
//!
//! 1. No previous state (node creation) → allow
//! 2. Labels unchanged → allow
//! 3. No launcher pod on the node → allow
//! 4. More than one installation → error; none → allow
//! 5. No workload placement configured → allow
//! 6. Placement does not translate into a selector → error
//! 7. New labels match the placement selector → allow, otherwise deny

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use warden_cluster::{InstallationLister, Node, PodLister, PodQuery};
use warden_core::Labels;
use warden_core::config::AdmissionConfig;
use warden_selector::placement_to_selector;

use crate::error::{AdmissionError, AdmissionResult};
use crate::review::{AdmissionResponse, AdmissionReview, GroupVersionResource, Operation};

/// Remediation message returned when a change is refused.
pub const DENY_MESSAGE: &str =
    "you must remove all workloads from this node before changing the label";

/// The part of a node that admission looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeLabelState {
    pub name: String,
    pub labels: Labels,
}

impl From<&Node> for NodeLabelState {
    fn from(node: &Node) -> Self {
        Self {
            name: node.metadata.name.clone(),
            labels: node.metadata.labels.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(String),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// Validates node updates against the installation's workload placement.
pub struct NodeAdmitter<C> {
    client: C,
    launcher_labels: Labels,
}

impl<C: PodLister + InstallationLister> NodeAdmitter<C> {
    pub fn new(client: C, config: &AdmissionConfig) -> Self {
        let mut launcher_labels = Labels::new();
        launcher_labels.insert(
            config.launcher_label_key.clone(),
            config.launcher_label_value.clone(),
        );
        Self {
            client,
            launcher_labels,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Decide whether `new` may replace `old`.
    ///
    /// Performs at most two reads (pods, then installations) and never
    /// retries. Errors mean safety could not be established.
    pub fn decide(
        &self,
        old: Option<&NodeLabelState>,
        new: &NodeLabelState,
    ) -> AdmissionResult<Verdict> {
        let Some(old) = old else {
            debug!(node = %new.name, "node creation, nothing to guard");
            return Ok(Verdict::Allow);
        };

        if old.labels == new.labels {
            debug!(node = %new.name, "labels unchanged");
            return Ok(Verdict::Allow);
        }

        if !self.node_has_workloads(&new.name)? {
            debug!(node = %new.name, "no workload launchers on node");
            return Ok(Verdict::Allow);
        }

        if self.node_keeps_placement(&new.labels)? {
            Ok(Verdict::Allow)
        } else {
            info!(node = %new.name, "refusing label change that would strand workloads");
            Ok(Verdict::Deny(DENY_MESSAGE.to_string()))
        }
    }

    /// Handle a full admission review. Fails closed: anything other than
    /// an explicit allow is returned as a rejection with code 400.
    pub fn admit(&self, review: &AdmissionReview) -> AdmissionResponse {
        let uid = review
            .request
            .as_ref()
            .map(|r| r.uid.as_str())
            .unwrap_or_default();

        let result = parse_review(review).and_then(|(old, new)| self.decide(old.as_ref(), &new));
        match result {
            Ok(Verdict::Allow) => AdmissionResponse::allow(uid),
            Ok(Verdict::Deny(message)) => AdmissionResponse::reject(uid, message),
            Err(e) => {
                warn!(%uid, error = %e, "node admission failed");
                AdmissionResponse::reject(uid, e.to_string())
            }
        }
    }

    fn node_has_workloads(&self, node_name: &str) -> AdmissionResult<bool> {
        let query = PodQuery {
            node_name: node_name.to_string(),
            labels: self.launcher_labels.clone(),
        };
        let pods = self.client.list_pods(&query)?;
        Ok(!pods.is_empty())
    }

    fn node_keeps_placement(&self, labels: &Labels) -> AdmissionResult<bool> {
        let installations = self.client.list_installations()?;
        if installations.len() > 1 {
            return Err(AdmissionError::MultipleInstallations(installations.len()));
        }
        let Some(installation) = installations.first() else {
            debug!("no installation, placement unconstrained");
            return Ok(true);
        };
        let Some(placement) = installation.workload_placement() else {
            return Ok(true);
        };

        let selector = placement_to_selector(placement)?;
        Ok(selector.matches(labels))
    }
}

/// Extract `(old, new)` node states from a review.
///
/// The old state is only read for updates; any other operation is treated
/// as having no previous state.
fn parse_review(
    review: &AdmissionReview,
) -> AdmissionResult<(Option<NodeLabelState>, NodeLabelState)> {
    let request = review.request.as_ref().ok_or(AdmissionError::MissingRequest)?;

    let expected = GroupVersionResource::nodes();
    if request.resource.group != expected.group || request.resource.resource != expected.resource {
        return Err(AdmissionError::UnexpectedResource {
            expected: expected.resource,
            actual: request.resource.resource.clone(),
        });
    }

    let new = decode_node("object", &request.object)?;
    let old = match request.operation {
        Operation::Update => {
            let raw = request.old_object.as_ref().ok_or(AdmissionError::Decode {
                field: "oldObject",
                reason: "missing on update".to_string(),
            })?;
            Some(decode_node("oldObject", raw)?)
        }
        _ => None,
    };
    Ok((old, new))
}

fn decode_node(field: &'static str, raw: &Value) -> AdmissionResult<NodeLabelState> {
    let node = Node::deserialize(raw).map_err(|e| AdmissionError::Decode {
        field,
        reason: e.to_string(),
    })?;
    Ok(NodeLabelState::from(&node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_cluster::MemoryCluster;
    use warden_core::labels;

    fn state(name: &str, pairs: &[(&str, &str)]) -> NodeLabelState {
        NodeLabelState {
            name: name.to_string(),
            labels: labels(pairs.iter().copied()),
        }
    }

    #[test]
    fn creation_is_allowed_without_reads() {
        let cluster = MemoryCluster::new();
        let admitter = NodeAdmitter::new(cluster.clone(), &AdmissionConfig::default());

        let verdict = admitter.decide(None, &state("node01", &[("foo", "bar")])).unwrap();
        assert_eq!(verdict, Verdict::Allow);
        assert!(cluster.actions().is_empty());
    }

    #[test]
    fn unchanged_labels_skip_reads() {
        let cluster = MemoryCluster::new();
        let admitter = NodeAdmitter::new(cluster.clone(), &AdmissionConfig::default());
        let node = state("node01", &[("foo", "bar")]);

        assert!(admitter.decide(Some(&node), &node).unwrap().is_allowed());
        assert!(cluster.actions().is_empty());
    }

    #[test]
    fn wrong_resource_is_rejected() {
        let admitter = NodeAdmitter::new(MemoryCluster::new(), &AdmissionConfig::default());
        let mut review = AdmissionReview::default();
        review.request = Some(crate::review::AdmissionRequest {
            uid: "u1".into(),
            resource: GroupVersionResource {
                group: String::new(),
                version: "v1".into(),
                resource: "pods".into(),
            },
            ..Default::default()
        });

        let response = admitter.admit(&review);
        assert!(!response.allowed);
        assert_eq!(response.uid, "u1");
        assert!(response.message().unwrap().contains("nodes"));
    }

    #[test]
    fn missing_request_is_rejected() {
        let admitter = NodeAdmitter::new(MemoryCluster::new(), &AdmissionConfig::default());
        let response = admitter.admit(&AdmissionReview::default());
        assert!(!response.allowed);
        assert_eq!(response.status.unwrap().code, 400);
    }
}
