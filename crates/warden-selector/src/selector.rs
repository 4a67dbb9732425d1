//! Conjunction of label requirements.

use std::fmt;

use warden_core::Labels;

use crate::requirement::Requirement;

/// A set of requirements that must all hold.
///
/// Requirements are kept ordered by key, so two selectors built from the
/// same terms compare and render identically. An empty selector matches
/// every label set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a requirement, keeping key order stable for equal keys.
    pub fn add(mut self, requirement: Requirement) -> Self {
        let at = self
            .requirements
            .partition_point(|r| r.key() <= requirement.key());
        self.requirements.insert(at, requirement);
        self
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

/// Renders as comma-separated requirements, e.g. `foo=bar,!gpu`.
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{r}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirement::Operator;
    use warden_core::labels;

    fn req(key: &str, op: Operator, values: &[&str]) -> Requirement {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        Requirement::new(key, op, &values).unwrap()
    }

    #[test]
    fn empty_selector_matches_everything() {
        let selector = Selector::new();
        assert!(selector.matches(&Labels::new()));
        assert!(selector.matches(&labels([("foo", "bar")])));
    }

    #[test]
    fn requirements_are_anded() {
        let selector = Selector::new()
            .add(req("workload", Operator::Equals, &["schedule"]))
            .add(req("foo", Operator::NotIn, &["updatedbar"]));

        assert!(selector.matches(&labels([("workload", "schedule"), ("foo", "bar")])));
        assert!(!selector.matches(&labels([("workload", "schedule"), ("foo", "updatedbar")])));
        assert!(!selector.matches(&labels([("foo", "bar")])));
    }

    #[test]
    fn ordering_is_by_key() {
        let a = Selector::new()
            .add(req("zone", Operator::Exists, &[]))
            .add(req("arch", Operator::Equals, &["amd64"]));
        let b = Selector::new()
            .add(req("arch", Operator::Equals, &["amd64"]))
            .add(req("zone", Operator::Exists, &[]));

        assert_eq!(a, b);
        assert_eq!(a.to_string(), "arch=amd64,zone");
    }
}
