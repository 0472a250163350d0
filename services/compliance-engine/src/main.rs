//! Prodtrack Compliance Engine
//!
//! Runs the compliance and deadline sweeps on a fixed interval against
//! Postgres until interrupted.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use prodtrack_compliance_engine::{AlertPolicies, ComplianceService};
use prodtrack_database::{
    initialize_database, AlertRepository, DepartmentRepository, DocumentRepository,
    ProductRepository,
};
use prodtrack_utils::{init_logging, AppConfig, RuleConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging)?;
    info!("Starting Prodtrack Compliance Engine");

    let rules = RuleConfig::from_yaml_file(&config.rules.path)
        .with_context(|| format!("Failed to load rule matrix from {}", config.rules.path))?;
    for warning in rules.validate() {
        warn!(%warning, "Rule matrix inconsistency");
    }
    let rules = Arc::new(rules);

    let pool = initialize_database(&config.database).await?;
    let synced = DepartmentRepository::new(pool.clone())
        .sync(&rules.departments)
        .await?;
    info!(departments = synced, "Department reference data synced");

    let service = ComplianceService::new(
        rules,
        Arc::new(ProductRepository::new(pool.clone())),
        Arc::new(DocumentRepository::new(pool.clone())),
        Arc::new(AlertRepository::new(pool)),
        AlertPolicies::from_config(&config.alerts),
        config.sweep.clone(),
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested, finishing current chunk");
            shutdown.cancel();
        }
    });

    run_sweeps(&service, config.sweep.interval_minutes, &cancel).await;

    info!("Compliance Engine stopped");
    Ok(())
}

async fn run_sweeps(service: &ComplianceService, interval_minutes: u64, cancel: &CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_minutes.max(1) * 60));
    info!(interval_minutes, "Sweep loop started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = service.compliance_sweep(cancel).await {
                    error!(error = %e, "Compliance sweep failed");
                }
                if let Err(e) = service.deadline_sweep(cancel).await {
                    error!(error = %e, "Deadline sweep failed");
                }
            }
        }
    }
}
