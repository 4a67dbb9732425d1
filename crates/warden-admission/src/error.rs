//! Admission error types.

use thiserror::Error;
use warden_cluster::ClusterError;
use warden_selector::SelectorError;

pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// Anything that prevents a verdict from being reached.
///
/// Every variant is turned into a rejection by [`crate::NodeAdmitter::admit`].
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("expect resource to be '{expected}', got '{actual}'")]
    UnexpectedResource { expected: String, actual: String },

    #[error("admission review carries no request")]
    MissingRequest,

    #[error("could not decode {field}: {reason}")]
    Decode { field: &'static str, reason: String },

    #[error("you can not have more than one installation, found {0}")]
    MultipleInstallations(usize),

    #[error("cluster read failed: {0}")]
    Cluster(#[from] ClusterError),

    #[error("invalid workload placement: {0}")]
    Selector(#[from] SelectorError),
}
