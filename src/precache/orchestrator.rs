// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Runs one precaching pass over every cluster of a batch and derives the
//! batch-level conditions from the per-cluster states.

use crate::config::Config;
use crate::constants::conditions::*;
use crate::error::{PrecacheError, Result};
use crate::kubernetes::HubClient;
use crate::precache::fsm::PrecacheFsm;
use crate::precache::state::PrecacheState;
use crate::precache::templates::{sets, TemplateData};
use crate::types::{ClusterGroupUpgrade, ClusterGroupUpgradeStatus, Condition};
use kube::ResourceExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct Precacher {
    hub: Arc<dyn HubClient>,
    fsm: PrecacheFsm,
}

impl Precacher {
    pub fn new(hub: Arc<dyn HubClient>, config: Config) -> Result<Self> {
        Ok(Self {
            fsm: PrecacheFsm::new(hub.clone(), config)?,
            hub,
        })
    }

    /// Advance every cluster of the batch by one step and update the
    /// in-memory status. Persisting the status is up to the caller.
    #[instrument(skip(self, upgrade), fields(upgrade = %upgrade.name_any()))]
    pub async fn reconcile_precaching(&self, upgrade: &mut ClusterGroupUpgrade) -> Result<()> {
        if !upgrade.spec.pre_caching {
            debug!("Precaching not requested");
            return Ok(());
        }
        if upgrade.is_precaching_done() {
            debug!("Precaching already done");
            return Ok(());
        }

        set_precaching_required(upgrade.status_mut());

        let clusters = self.clusters_for_upgrade(upgrade).await?;
        let previous = upgrade
            .status
            .as_ref()
            .map(|s| s.precache_status.clone())
            .unwrap_or_default();

        if previous.is_empty() {
            // First pass: clear whatever an earlier batch left behind
            for cluster in &clusters {
                if let Err(e) = self.fsm.resources().cleanup_hub_resources(cluster).await {
                    warn!(cluster = %cluster, "Failed to clean up leftover proxies: {}", e);
                }
            }
        }

        let mut states = BTreeMap::new();
        for cluster in &clusters {
            let current = match previous.get(cluster) {
                None => PrecacheState::NotStarted,
                Some(name) => PrecacheState::from_name(name).ok_or_else(|| PrecacheError::UnknownState {
                    cluster: cluster.clone(),
                    state: name.clone(),
                })?,
            };
            let next = self.fsm.next_state(upgrade, cluster, current).await?;
            states.insert(cluster.clone(), next);
        }

        let status = upgrade.status_mut();
        status.precache_status = states
            .iter()
            .map(|(cluster, state)| (cluster.clone(), state.to_string()))
            .collect();
        check_precaching_completed(status, &states);

        Ok(())
    }

    /// Remove every proxy of the batch from the hub and ask each spoke to
    /// delete its pre-cache namespace
    #[instrument(skip(self, upgrade), fields(upgrade = %upgrade.name_any()))]
    pub async fn cleanup_precaching(&self, upgrade: &ClusterGroupUpgrade) -> Result<()> {
        let mut clusters: BTreeSet<String> = self.clusters_for_upgrade(upgrade).await?.into_iter().collect();
        if let Some(status) = &upgrade.status {
            clusters.extend(status.precache_status.keys().cloned());
        }

        for cluster in &clusters {
            let resources = self.fsm.resources();
            resources.cleanup_hub_resources(cluster).await?;
            let data = TemplateData {
                cluster: cluster.clone(),
                ..Default::default()
            };
            resources.create_resources(sets::NAMESPACE_DELETE_SET, &data).await?;
            info!(cluster = %cluster, "Cleaned up precaching");
        }

        Ok(())
    }

    /// Explicit clusters plus the clusters matched by every selector,
    /// deduplicated and sorted
    pub async fn clusters_for_upgrade(&self, upgrade: &ClusterGroupUpgrade) -> Result<Vec<String>> {
        let mut clusters: BTreeSet<String> = upgrade.spec.clusters.iter().cloned().collect();

        for selector in &upgrade.spec.cluster_selector {
            validate_selector(selector)?;
            let matched = self.hub.list_managed_clusters(selector.trim()).await?;
            debug!(selector = %selector, ?matched, "Selector matched clusters");
            clusters.extend(matched);
        }

        Ok(clusters.into_iter().collect())
    }
}

/// Accept `key=value` or a bare `key`
fn validate_selector(selector: &str) -> Result<()> {
    let selector = selector.trim();
    let (key, value) = selector.split_once('=').unwrap_or((selector, ""));
    let valid_part = |s: &str| !s.contains(char::is_whitespace) && !s.contains('=');

    if key.is_empty() || !valid_part(key) || !valid_part(value) {
        return Err(PrecacheError::InvalidSelector(selector.to_string()));
    }
    Ok(())
}

/// Mark the batch as waiting on precaching
pub fn set_precaching_required(status: &mut ClusterGroupUpgradeStatus) {
    status.set_condition(Condition::new(
        READY,
        STATUS_FALSE,
        "PrecachingRequired",
        "Precaching is not completed (required)",
    ));
    status.set_condition(Condition::new(
        PRECACHING_DONE,
        STATUS_FALSE,
        "PrecachingNotDone",
        "Precaching is required and not done",
    ));
}

/// Derive the batch-level conditions from the per-cluster states
pub fn check_precaching_completed(
    status: &mut ClusterGroupUpgradeStatus,
    states: &BTreeMap<String, PrecacheState>,
) {
    if states.values().all(|s| *s == PrecacheState::Succeeded) {
        status.set_condition(Condition::new(
            READY,
            STATUS_FALSE,
            "UpgradeNotStarted",
            "Precaching is completed",
        ));
        status.set_condition(Condition::new(
            PRECACHING_DONE,
            STATUS_TRUE,
            "PrecachingCompleted",
            "Precaching is completed",
        ));
        status.remove_condition(PRECACHE_SPEC_VALID);
    }

    let failed: Vec<&str> = states
        .iter()
        .filter(|(_, s)| s.is_failed())
        .map(|(c, _)| c.as_str())
        .collect();
    if failed.is_empty() {
        status.remove_condition(PRECACHING_FAILED);
    } else {
        status.set_condition(Condition::new(
            PRECACHING_FAILED,
            STATUS_TRUE,
            "PrecachingFailedOnClusters",
            format!("Precaching failed on clusters: {}", failed.join(", ")),
        ));
    }
}
