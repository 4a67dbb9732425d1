//! Node placement → selector translation.

use tracing::debug;
use warden_cluster::{NodePlacement, NodeSelectorOperator};

use crate::error::{SelectorError, SelectorResult};
use crate::requirement::{Operator, Requirement};
use crate::selector::Selector;

/// Map a node affinity operator onto a selector operator.
///
/// `Gt`/`Lt` become the ordering operators; anything outside the six
/// known names is rejected.
pub fn translate_operator(key: &str, op: &NodeSelectorOperator) -> SelectorResult<Operator> {
    match op {
        NodeSelectorOperator::In => Ok(Operator::In),
        NodeSelectorOperator::NotIn => Ok(Operator::NotIn),
        NodeSelectorOperator::Exists => Ok(Operator::Exists),
        NodeSelectorOperator::DoesNotExist => Ok(Operator::DoesNotExist),
        NodeSelectorOperator::Gt => Ok(Operator::GreaterThan),
        NodeSelectorOperator::Lt => Ok(Operator::LessThan),
        NodeSelectorOperator::Other(name) => Err(SelectorError::UnsupportedOperator {
            key: key.to_string(),
            operator: name.clone(),
        }),
    }
}

/// Build the selector a node must satisfy to host the workload agent.
///
/// Every `nodeSelector` entry becomes an equality term. Then every match
/// expression of the required affinity terms is translated and ANDed in.
/// Preferred terms do not constrain placement and are ignored.
pub fn placement_to_selector(placement: &NodePlacement) -> SelectorResult<Selector> {
    let mut selector = Selector::new();

    for (key, value) in &placement.node_selector {
        let req = Requirement::new(key, Operator::Equals, std::slice::from_ref(value))?;
        selector = selector.add(req);
    }

    for expr in placement.affinity_requirements() {
        let op = translate_operator(&expr.key, &expr.operator)?;
        selector = selector.add(Requirement::new(&expr.key, op, &expr.values)?);
    }

    debug!(%selector, "built placement selector");
    Ok(selector)
}
