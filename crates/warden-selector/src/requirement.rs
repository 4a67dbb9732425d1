//! A single label requirement: `key <operator> values`.
//!
//! Construction enforces the cluster's label syntax so that a requirement
//! which exists is always well formed. Matching never fails; a label that
//! cannot be compared simply does not match.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use warden_core::Labels;

use crate::error::{SelectorError, SelectorResult};

const MAX_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;
const MAX_VALUE_LEN: usize = 63;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").expect("static regex")
});

static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("static regex")
});

static VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$").expect("static regex")
});

/// Set-membership, existence, and ordering operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Exists,
    DoesNotExist,
    GreaterThan,
    LessThan,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::In => "in",
            Self::NotIn => "notin",
            Self::Exists => "exists",
            Self::DoesNotExist => "!",
            Self::GreaterThan => "gt",
            Self::LessThan => "lt",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    key: String,
    operator: Operator,
    values: BTreeSet<String>,
}

impl Requirement {
    /// Build a validated requirement.
    ///
    /// - `Equals`/`NotEquals`: exactly one value
    /// - `In`/`NotIn`: at least one value
    /// - `Exists`/`DoesNotExist`: no values
    /// - `GreaterThan`/`LessThan`: exactly one value, an integer
    pub fn new(key: &str, operator: Operator, values: &[String]) -> SelectorResult<Self> {
        validate_key(key)?;

        let arity_error = |reason: &str| SelectorError::InvalidValues {
            key: key.to_string(),
            operator: operator.to_string(),
            reason: reason.to_string(),
        };

        match operator {
            Operator::Equals | Operator::NotEquals => {
                if values.len() != 1 {
                    return Err(arity_error("exactly one value is required"));
                }
            }
            Operator::In | Operator::NotIn => {
                if values.is_empty() {
                    return Err(arity_error("at least one value is required"));
                }
            }
            Operator::Exists | Operator::DoesNotExist => {
                if !values.is_empty() {
                    return Err(arity_error("values must be empty"));
                }
            }
            Operator::GreaterThan | Operator::LessThan => {
                if values.len() != 1 {
                    return Err(arity_error("exactly one value is required"));
                }
                if values[0].parse::<i64>().is_err() {
                    return Err(arity_error("value must be an integer"));
                }
            }
        }

        for value in values {
            validate_value(key, value)?;
        }

        Ok(Self {
            key: key.to_string(),
            operator,
            values: values.iter().cloned().collect(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    /// Evaluate against a label set.
    ///
    /// A missing key fails `Equals`, `In`, `Exists`, `GreaterThan` and
    /// `LessThan`, and satisfies `NotEquals`, `NotIn` and `DoesNotExist`.
    pub fn matches(&self, labels: &Labels) -> bool {
        let found = labels.get(&self.key);
        match self.operator {
            Operator::Equals | Operator::In => found.is_some_and(|v| self.values.contains(v)),
            Operator::NotEquals | Operator::NotIn => {
                found.is_none_or(|v| !self.values.contains(v))
            }
            Operator::Exists => found.is_some(),
            Operator::DoesNotExist => found.is_none(),
            Operator::GreaterThan | Operator::LessThan => {
                let Some(actual) = found.and_then(|v| v.parse::<i64>().ok()) else {
                    return false;
                };
                let Some(bound) = self.values.first().and_then(|v| v.parse::<i64>().ok()) else {
                    return false;
                };
                if self.operator == Operator::GreaterThan {
                    actual > bound
                } else {
                    actual < bound
                }
            }
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = || self.values.iter().cloned().collect::<Vec<_>>().join(",");
        match self.operator {
            Operator::Equals => write!(f, "{}={}", self.key, joined()),
            Operator::NotEquals => write!(f, "{}!={}", self.key, joined()),
            Operator::In => write!(f, "{} in ({})", self.key, joined()),
            Operator::NotIn => write!(f, "{} notin ({})", self.key, joined()),
            Operator::Exists => f.write_str(&self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
            Operator::GreaterThan => write!(f, "{}>{}", self.key, joined()),
            Operator::LessThan => write!(f, "{}<{}", self.key, joined()),
        }
    }
}

/// Validate a qualified label key: `[prefix/]name`.
fn validate_key(key: &str) -> SelectorResult<()> {
    let invalid = |reason: String| SelectorError::InvalidKey {
        key: key.to_string(),
        reason,
    };

    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() {
            return Err(invalid("prefix part must be non-empty".to_string()));
        }
        if prefix.len() > MAX_PREFIX_LEN {
            return Err(invalid(format!(
                "prefix part must be no more than {MAX_PREFIX_LEN} characters"
            )));
        }
        if !PREFIX_RE.is_match(prefix) {
            return Err(invalid("prefix part must be a DNS subdomain".to_string()));
        }
    }

    if name.is_empty() {
        return Err(invalid("name part must be non-empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid(format!(
            "name part must be no more than {MAX_NAME_LEN} characters"
        )));
    }
    if !NAME_RE.is_match(name) {
        return Err(invalid(
            "name part must consist of alphanumerics, '-', '_' or '.', and start and end with an alphanumeric"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_value(key: &str, value: &str) -> SelectorResult<()> {
    let reason = if value.len() > MAX_VALUE_LEN {
        format!("must be no more than {MAX_VALUE_LEN} characters")
    } else if !VALUE_RE.is_match(value) {
        "must be empty or consist of alphanumerics, '-', '_' or '.', and start and end with an alphanumeric"
            .to_string()
    } else {
        return Ok(());
    };
    Err(SelectorError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    })
}
