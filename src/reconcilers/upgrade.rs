// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! ClusterGroupUpgrade reconciler - runs precaching passes and tears the
//! proxies down when a batch goes away.

use crate::config::Config;
use crate::constants::conditions::{PRECACHE_SPEC_VALID, PRECACHING_DONE, PRECACHING_FAILED};
use crate::constants::CLEANUP_FINALIZER;
use crate::error::{PrecacheError, Result};
use crate::kubernetes::HubClient;
use crate::precache::Precacher;
use crate::types::ClusterGroupUpgrade;
use futures::StreamExt;
use kube::{
    runtime::{
        controller::Action,
        finalizer::{finalizer, Event as Finalizer},
        Controller,
    },
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct UpgradeReconciler {
    client: Client,
    hub: Arc<dyn HubClient>,
    precacher: Precacher,
    config: Config,
}

impl UpgradeReconciler {
    pub fn new(client: Client, hub: Arc<dyn HubClient>, config: Config) -> Result<Self> {
        Ok(Self {
            client,
            precacher: Precacher::new(hub.clone(), config.clone())?,
            hub,
            config,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let upgrades: Api<ClusterGroupUpgrade> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(upgrades, WatcherConfig::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled upgrade: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }

    /// One precaching pass, persisted by replacing the status
    async fn apply(&self, upgrade: Arc<ClusterGroupUpgrade>) -> Result<Action> {
        let mut upgrade = (*upgrade).clone();

        if !upgrade.spec.pre_caching {
            if upgrade.has_precache_status() {
                info!("Precaching disabled, cleaning up");
                self.precacher.cleanup_precaching(&upgrade).await?;
                let status = upgrade.status_mut();
                status.precache_status.clear();
                for condition in [PRECACHING_DONE, PRECACHE_SPEC_VALID, PRECACHING_FAILED] {
                    status.remove_condition(condition);
                }
                self.hub.replace_upgrade_status(&upgrade).await?;
            }
            return Ok(Action::await_change());
        }

        if upgrade.is_precaching_done() {
            debug!("Precaching already done");
            return Ok(Action::await_change());
        }

        self.precacher.reconcile_precaching(&mut upgrade).await?;
        self.hub.replace_upgrade_status(&upgrade).await?;

        if upgrade.is_precaching_done() {
            info!("Precaching completed on all clusters");
            Ok(Action::await_change())
        } else {
            Ok(Action::requeue(self.config.requeue_interval))
        }
    }

    async fn cleanup(&self, upgrade: Arc<ClusterGroupUpgrade>) -> Result<Action> {
        if upgrade.spec.pre_caching || upgrade.has_precache_status() {
            self.precacher.cleanup_precaching(&upgrade).await?;
        }
        Ok(Action::await_change())
    }
}

async fn reconcile(upgrade: Arc<ClusterGroupUpgrade>, ctx: Arc<UpgradeReconciler>) -> Result<Action> {
    let namespace = upgrade.namespace().unwrap_or_default();
    let upgrades: Api<ClusterGroupUpgrade> = Api::namespaced(ctx.client.clone(), &namespace);

    debug!("Reconciling upgrade: {}/{}", namespace, upgrade.name_any());

    finalizer(&upgrades, CLEANUP_FINALIZER, upgrade, |event| async {
        match event {
            Finalizer::Apply(upgrade) => ctx.apply(upgrade).await,
            Finalizer::Cleanup(upgrade) => ctx.cleanup(upgrade).await,
        }
    })
    .await
    .map_err(|e| PrecacheError::FinalizerError(Box::new(e)))
}

fn error_policy(
    _upgrade: Arc<ClusterGroupUpgrade>,
    error: &PrecacheError,
    _ctx: Arc<UpgradeReconciler>,
) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(60))
}
