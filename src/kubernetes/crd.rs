// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::error::Result;
use kube::{discovery::Discovery, Client};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// A CRD the operator cannot run without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredCrd {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
}

pub const REQUIRED_CRDS: &[RequiredCrd] = &[
    RequiredCrd {
        group: "ran.openshift.io",
        version: "v1alpha1",
        kind: "ClusterGroupUpgrade",
    },
    RequiredCrd {
        group: "view.open-cluster-management.io",
        version: "v1beta1",
        kind: "ManagedClusterView",
    },
    RequiredCrd {
        group: "action.open-cluster-management.io",
        version: "v1beta1",
        kind: "ManagedClusterAction",
    },
];

/// Wait for all required CRDs to become available on the hub.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_required_crds(client: &Client) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match missing_crds(client).await {
            Ok(missing) if missing.is_empty() => {
                info!("All required CRDs are available");
                return Ok(());
            }
            Ok(missing) => {
                info!(
                    "CRDs {:?} not yet available, waiting {} seconds...",
                    missing, interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for required CRDs: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;

        // Exponential backoff with max cap
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }
}

/// Kinds of the required CRDs that discovery does not report yet
async fn missing_crds(client: &Client) -> Result<Vec<&'static str>> {
    let groups: Vec<&str> = REQUIRED_CRDS.iter().map(|c| c.group).collect();
    let discovery = Discovery::new(client.clone())
        .filter(&groups)
        .run()
        .await?;

    Ok(REQUIRED_CRDS
        .iter()
        .filter(|crd| {
            !discovery.groups().any(|group| {
                group.name() == crd.group
                    && group
                        .recommended_resources()
                        .iter()
                        .any(|(ar, _)| ar.kind == crd.kind && ar.version == crd.version)
            })
        })
        .map(|crd| crd.kind)
        .collect())
}
