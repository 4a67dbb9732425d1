//! wardend: the Warden daemon.
//!
//! Hosts the node admission webhook and the RBAC reconcile loop over one
//! shared cluster handle.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/validate/nodes` | Node admission review |
//! | GET | `/healthz` | Liveness |

pub mod controller;
pub mod webhook;

pub use controller::{Controller, PassOutcome};
pub use webhook::{WebhookState, build_router};

/// Log filter used when `RUST_LOG` is unset. Targets are crate names.
pub const DEFAULT_LOG_FILTER: &str = "info,wardend=debug,warden_cluster=debug,\
     warden_selector=debug,warden_admission=debug,warden_rbac=debug";

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::EnvFilter;

    #[test]
    fn default_filter_names_every_crate() {
        assert!(DEFAULT_LOG_FILTER.parse::<EnvFilter>().is_ok());
        for target in [
            "wardend",
            "warden_cluster",
            "warden_selector",
            "warden_admission",
            "warden_rbac",
        ] {
            assert!(
                DEFAULT_LOG_FILTER
                    .split(',')
                    .any(|d| d == format!("{target}=debug")),
                "{target} missing from default filter"
            );
        }
    }
}
