// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};

use precache_operator::config::Config;
use precache_operator::kubernetes::{wait_for_required_crds, KubeHubClient};
use precache_operator::reconcilers::UpgradeReconciler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting precache operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: workload_image={}, job_timeout={}s",
        config.precache_workload_image, config.job_timeout_secs
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to hub cluster");

    info!("Waiting for required CRDs to become available...");
    wait_for_required_crds(&client).await?;

    let hub = Arc::new(KubeHubClient::new(client.clone()));
    let reconciler = UpgradeReconciler::new(client, hub, config)?;

    info!("Starting reconciler...");
    reconciler.run().await?;

    // The reconciler runs until the watch stream ends
    warn!("Reconciler stopped unexpectedly");
    Ok(())
}
