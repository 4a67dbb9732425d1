//! wardend: the Warden daemon.
//!
//! # Usage
//!
//! ```text
//! wardend serve --port 8443 --cluster /var/lib/warden/cluster.json
//! wardend admit --cluster cluster.json review.json
//! wardend reconcile --cluster cluster.json
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;
use warden_admission::{AdmissionReview, NodeAdmitter};
use warden_cluster::MemoryCluster;
use warden_core::WardenConfig;
use warden_rbac::InstallStrategy;
use wardend::{Controller, DEFAULT_LOG_FILTER, build_router};

#[derive(Parser)]
#[command(name = "wardend", about = "Warden daemon")]
struct Cli {
    /// Path to warden.toml. Defaults apply when the file is absent.
    #[arg(long, global = true, default_value = "warden.toml")]
    config: PathBuf,

    /// Cluster snapshot (JSON). Starts empty when the file is absent.
    #[arg(long, global = true, default_value = "cluster.json")]
    cluster: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the admission webhook and run the reconcile loop.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "8443")]
        port: u16,

        /// Install strategy (JSON) to reconcile instead of the stock one.
        #[arg(long)]
        strategy: Option<PathBuf>,
    },
    /// Review a single AdmissionReview file and print the response.
    Admit {
        /// AdmissionReview JSON file.
        review: PathBuf,
    },
    /// Run one reconciliation pass and print its report.
    Reconcile {
        /// Install strategy (JSON) to reconcile instead of the stock one.
        #[arg(long)]
        strategy: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.parse().unwrap());
    if cli.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = load_config(&cli.config)?;
    let cluster = load_cluster(&cli.cluster)?;

    match cli.command {
        Command::Serve { port, strategy } => {
            run_serve(port, config, cluster, cli.cluster, strategy).await
        }
        Command::Admit { review } => run_admit(&config, cluster, &review),
        Command::Reconcile { strategy } => {
            let controller = controller(config, cluster, cli.cluster, strategy.as_deref())?;
            let outcome = controller.run_pass()?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<WardenConfig> {
    if path.exists() {
        let config = WardenConfig::from_file(path)?;
        info!(path = ?path, "config loaded");
        Ok(config)
    } else {
        info!(path = ?path, "no config file, using defaults");
        Ok(WardenConfig::default())
    }
}

fn load_cluster(path: &Path) -> anyhow::Result<MemoryCluster> {
    if path.exists() {
        Ok(MemoryCluster::load(path)?)
    } else {
        info!(path = ?path, "no cluster snapshot, starting empty");
        Ok(MemoryCluster::new())
    }
}

fn controller(
    config: WardenConfig,
    cluster: MemoryCluster,
    snapshot: PathBuf,
    strategy: Option<&Path>,
) -> anyhow::Result<Controller> {
    let mut controller = Controller::new(cluster, config).with_snapshot_path(snapshot);
    if let Some(path) = strategy {
        controller = controller.with_strategy(InstallStrategy::load(path)?);
        info!(path = ?path, "install strategy loaded");
    }
    Ok(controller)
}

fn run_admit(config: &WardenConfig, cluster: MemoryCluster, path: &Path) -> anyhow::Result<()> {
    let review: AdmissionReview = serde_json::from_slice(&std::fs::read(path)?)?;
    let admitter = NodeAdmitter::new(cluster, &config.admission);
    let response = admitter.admit(&review);
    println!("{}", serde_json::to_string_pretty(&review.respond(response))?);
    Ok(())
}

async fn run_serve(
    port: u16,
    config: WardenConfig,
    cluster: MemoryCluster,
    snapshot: PathBuf,
    strategy: Option<PathBuf>,
) -> anyhow::Result<()> {
    info!("Warden daemon starting");

    let interval = Duration::from_secs(config.reconcile.interval_secs);
    let admitter = Arc::new(NodeAdmitter::new(cluster.clone(), &config.admission));
    let controller = Arc::new(controller(config, cluster, snapshot, strategy.as_deref())?);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Reconcile loop ─────────────────────────────────────────

    let reconcile_handle = tokio::spawn(async move {
        controller.run(interval, shutdown_rx).await;
    });

    // ── Webhook server ─────────────────────────────────────────

    let router = build_router(admitter);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "webhook server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = reconcile_handle.await;

    info!("Warden daemon stopped");
    Ok(())
}
