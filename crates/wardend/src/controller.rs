//! RBAC reconcile loop.
//!
//! Each tick syncs the read cache, feeds its events to the expectation
//! tracker, and runs a reconciliation pass for the installation once all
//! earlier writes have become visible.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use warden_cluster::{InstallationLister, MemoryCluster};
use warden_core::WardenConfig;
use warden_rbac::{
    Expectations, InstallContext, InstallStrategy, PassReport, RbacError, ReconcileError,
    Reconciler,
};

const DEFAULT_NAMESPACE: &str = "warden";

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PassOutcome {
    /// No installation exists; nothing to manage.
    NoInstallation,
    /// Earlier writes are not yet visible in the cache.
    Waiting { owner: String },
    Completed { owner: String, report: PassReport },
}

/// Drives reconciliation passes against a [`MemoryCluster`].
pub struct Controller {
    cluster: MemoryCluster,
    expectations: Arc<Expectations>,
    config: WardenConfig,
    strategy: Option<InstallStrategy>,
    snapshot_path: Option<PathBuf>,
}

impl Controller {
    pub fn new(cluster: MemoryCluster, config: WardenConfig) -> Self {
        let ttl = Duration::from_secs(config.reconcile.expectation_ttl_secs);
        Self {
            cluster,
            expectations: Arc::new(Expectations::new(ttl)),
            config,
            strategy: None,
            snapshot_path: None,
        }
    }

    /// Reconcile against `strategy` instead of the stock object set.
    pub fn with_strategy(mut self, strategy: InstallStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Save the cluster to `path` after every completed pass.
    pub fn with_snapshot_path(mut self, path: PathBuf) -> Self {
        self.snapshot_path = Some(path);
        self
    }

    pub fn cluster(&self) -> &MemoryCluster {
        &self.cluster
    }

    pub fn expectations(&self) -> &Arc<Expectations> {
        &self.expectations
    }

    /// Run a single tick.
    ///
    /// A partial pass is returned as an error carrying
    /// [`ReconcileError::Partial`]; the snapshot is saved either way.
    pub fn run_pass(&self) -> anyhow::Result<PassOutcome> {
        let events = self.cluster.sync_cache();

        let installations = self.cluster.list_installations()?;
        if installations.len() > 1 {
            return Err(RbacError::MultipleInstallations(installations.len()).into());
        }
        let Some(installation) = installations.first() else {
            debug!("no installation, nothing to reconcile");
            return Ok(PassOutcome::NoInstallation);
        };

        let ctx = InstallContext::for_installation(installation, &self.config)?;
        let owner = ctx.owner_key.clone();
        let namespace = installation
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let reconciler = Reconciler::new(
            self.cluster.clone(),
            self.cluster.clone(),
            self.expectations.clone(),
            ctx,
        );
        reconciler.observe(&events);

        if !self.expectations.all_satisfied(&owner) {
            info!(%owner, "waiting for earlier writes to reach the cache");
            return Ok(PassOutcome::Waiting { owner });
        }

        let strategy = self
            .strategy
            .clone()
            .unwrap_or_else(|| InstallStrategy::default_for(&namespace));
        let result = reconciler.reconcile(&strategy.resources);
        self.persist()?;

        match result {
            Ok(report) => Ok(PassOutcome::Completed { owner, report }),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self) -> anyhow::Result<()> {
        if let Some(path) = &self.snapshot_path {
            self.cluster.save(path)?;
        }
        Ok(())
    }

    /// Run passes every `interval` until `shutdown` flips.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = interval.as_secs(), "reconcile loop started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    match self.run_pass() {
                        Ok(outcome) => debug!(?outcome, "reconcile tick finished"),
                        Err(e) => match e.downcast_ref::<ReconcileError>() {
                            Some(partial) => warn!(
                                failed = partial.failures().len(),
                                "reconcile pass incomplete, retrying next tick"
                            ),
                            None => error!(error = %e, "reconcile tick failed"),
                        },
                    }
                }
                _ = shutdown.changed() => {
                    info!("reconcile loop shutting down");
                    if let Err(e) = self.persist() {
                        error!(error = %e, "final snapshot failed");
                    }
                    break;
                }
            }
        }
    }
}
