//! # Preservation Vault Audit Runtime
//!
//! The long-running process that keeps catalog, storage, and replicas
//! honest with each other.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `PV_*` environment variables
//! 2. Initialize tracing with the configured filter
//! 3. Wire the three audit services over the storage adapters
//! 4. Spawn the audit worker pool
//! 5. Scan the catalog for due audits on an interval until Ctrl+C

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pv_audit::adapters::catalog::InMemoryCatalog;
use pv_audit::adapters::object_store::InMemoryObjectStore;
use pv_audit::adapters::packages::FilesystemPackages;
use pv_audit::adapters::reporter::TracingReporter;
use pv_audit::adapters::validator::BasicStructuralValidator;
use pv_audit::{
    FixityAuditDependencies, FixityAuditService, ReplicaAuditConfig, ReplicaAuditDependencies,
    ReplicaAuditService, VersionAuditDependencies, VersionAuditService,
};
use pv_types::{SystemTimeSource, TimeSource};

use pv_runtime::config::VaultConfig;
use pv_runtime::jobs::{scan_due, spawn_workers, AuditJob, WorkerDeps};

/// The wired runtime: services, worker pool, and the scan loop.
struct VaultRuntime {
    config: VaultConfig,
    catalog: Arc<InMemoryCatalog>,
    time: Arc<SystemTimeSource>,
    jobs_tx: mpsc::Sender<AuditJob>,
    workers: Vec<JoinHandle<()>>,
}

impl VaultRuntime {
    fn new(config: VaultConfig) -> Self {
        // The in-memory catalog is the development store; a database-backed
        // CatalogStore slots in here without touching the services.
        let catalog = Arc::new(InMemoryCatalog::new());
        let packages = Arc::new(FilesystemPackages::new(config.storage.roots.clone()));
        let validator = Arc::new(BasicStructuralValidator::new(config.storage.roots.clone()));
        let object_store = Arc::new(InMemoryObjectStore::new());
        let time = Arc::new(SystemTimeSource);

        let version = Arc::new(VersionAuditService::new(VersionAuditDependencies {
            catalog: Arc::clone(&catalog),
            packages: Arc::clone(&packages),
            validator,
            time: Arc::clone(&time),
        }));
        let fixity = Arc::new(FixityAuditService::new(FixityAuditDependencies {
            catalog: Arc::clone(&catalog),
            packages: Arc::clone(&packages),
            time: Arc::clone(&time),
        }));
        let replica = Arc::new(ReplicaAuditService::new(
            ReplicaAuditConfig {
                check_unreplicated: config.replication.check_unreplicated,
            },
            ReplicaAuditDependencies {
                catalog: Arc::clone(&catalog),
                packages,
                object_store,
                time: Arc::clone(&time),
            },
        ));

        let deps = WorkerDeps {
            version,
            fixity,
            replica,
            reporter: Arc::new(TracingReporter::new()),
        };
        let (jobs_tx, workers) = spawn_workers(config.scheduling.worker_count, deps);

        Self {
            config,
            catalog,
            time,
            jobs_tx,
            workers,
        }
    }

    /// Run the scan loop until a shutdown signal arrives, then drain the
    /// queue and join the workers.
    async fn run(self) -> Result<()> {
        let mut ticker = tokio::time::interval(Duration::from_secs(
            self.config.scheduling.scan_interval_secs,
        ));
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = self.time.now();
                    let jobs = scan_due(self.catalog.as_ref(), &self.config.scheduling, now).await;
                    if !jobs.is_empty() {
                        info!(count = jobs.len(), "enqueueing due audits");
                    }
                    for job in jobs {
                        if self.jobs_tx.send(job).await.is_err() {
                            warn!("job queue closed, stopping scan loop");
                            break;
                        }
                    }
                }
                result = &mut shutdown => {
                    result.context("listening for shutdown signal")?;
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        drop(self.jobs_tx);
        for handle in self.workers {
            let _ = handle.await;
        }
        info!("shutdown complete");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = VaultConfig::from_env().context("loading configuration")?;
    config.validate().context("validating configuration")?;

    let filter =
        EnvFilter::try_new(&config.logging.filter).context("parsing PV_LOG_FILTER")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        workers = config.scheduling.worker_count,
        storage_roots = config.storage.roots.len(),
        endpoints = config.replication.endpoints.len(),
        "starting preservation vault audit runtime"
    );

    VaultRuntime::new(config).run().await
}
