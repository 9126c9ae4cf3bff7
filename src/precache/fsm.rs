// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-cluster precaching state machine. Each call advances one cluster by at
//! most one state, driving side effects through the remote resource proxy.

use crate::config::Config;
use crate::constants::proxies::{VIEW_JOB, VIEW_NAMESPACE};
use crate::error::{PrecacheError, Result};
use crate::kubernetes::HubClient;
use crate::precache::condition::get_precache_condition;
use crate::precache::resources::RemoteResources;
use crate::precache::spec::SpecResolver;
use crate::precache::state::{PrecacheCondition, PrecacheState};
use crate::precache::templates::{self, sets, TemplateData};
use crate::types::{ClusterGroupUpgrade, ViewObservation};
use kube::ResourceExt;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct PrecacheFsm {
    resources: RemoteResources,
    resolver: SpecResolver,
    config: Config,
}

impl PrecacheFsm {
    pub fn new(hub: Arc<dyn HubClient>, config: Config) -> Result<Self> {
        Ok(Self {
            resources: RemoteResources::new(hub.clone())?,
            resolver: SpecResolver::new(hub, config.clone()),
            config,
        })
    }

    pub fn resources(&self) -> &RemoteResources {
        &self.resources
    }

    /// Advance `cluster` from `current` by one step. Terminal states are
    /// returned unchanged without touching the hub.
    #[instrument(skip(self, upgrade), fields(upgrade = %upgrade.name_any()))]
    pub async fn next_state(
        &self,
        upgrade: &mut ClusterGroupUpgrade,
        cluster: &str,
        current: PrecacheState,
    ) -> Result<PrecacheState> {
        match current {
            PrecacheState::NotStarted => self.handle_not_started(cluster).await,
            PrecacheState::Starting => self.handle_starting(upgrade, cluster).await,
            PrecacheState::Restarting => self.handle_restarting(cluster).await,
            PrecacheState::Active => self.handle_active(cluster).await,
            terminal => Ok(terminal),
        }
    }

    async fn handle_not_started(&self, cluster: &str) -> Result<PrecacheState> {
        let current = PrecacheState::NotStarted;
        let (condition, next) = match self.resources.get_resource(VIEW_JOB, cluster).await? {
            // Left over from an earlier batch
            Some(_) => {
                self.resources.cleanup_hub_resources(cluster).await?;
                (PrecacheCondition::JobViewExists, PrecacheState::NotStarted)
            }
            None => {
                self.resources
                    .create_resources(sets::JOB_VIEW_SET, &self.view_data(cluster))
                    .await?;
                (PrecacheCondition::NoJobView, PrecacheState::Starting)
            }
        };

        log_transition(cluster, current, &condition, next);
        Ok(next)
    }

    async fn handle_starting(&self, upgrade: &mut ClusterGroupUpgrade, cluster: &str) -> Result<PrecacheState> {
        let current = PrecacheState::Starting;
        let condition = get_precache_condition(&self.resources, cluster).await?;

        let next = match &condition {
            PrecacheCondition::NoJobView => {
                let data = self.view_data(cluster);
                self.resources.create_resources(sets::JOB_VIEW_SET, &data).await?;
                self.resources.create_resources(sets::NAMESPACE_VIEW_SET, &data).await?;
                PrecacheState::Starting
            }
            PrecacheCondition::DependenciesNotPresent => {
                self.deploy_dependencies(upgrade, cluster).await?;
                PrecacheState::Starting
            }
            PrecacheCondition::NoJobFoundOnSpoke => {
                self.deploy_workload(upgrade, cluster).await?;
                PrecacheState::Starting
            }
            PrecacheCondition::PrecacheJobActive => PrecacheState::Active,
            PrecacheCondition::PrecacheJobSucceeded => PrecacheState::Succeeded,
            PrecacheCondition::PrecacheJobDeadline => {
                self.restart(cluster).await?;
                PrecacheState::Restarting
            }
            PrecacheCondition::PrecacheJobBackoffLimitExceeded => PrecacheState::UnrecoverableError,
            PrecacheCondition::UnforeseenCondition { status } => {
                warn_unforeseen(cluster, status);
                PrecacheState::Starting
            }
            PrecacheCondition::JobViewExists | PrecacheCondition::DependenciesPresent => {
                return Err(invalid_transition(cluster, current, &condition));
            }
        };

        log_transition(cluster, current, &condition, next);
        Ok(next)
    }

    /// Wait for the spoke namespace to disappear, then start over
    async fn handle_restarting(&self, cluster: &str) -> Result<PrecacheState> {
        let current = PrecacheState::Restarting;
        let observation = self.resources.view_observation(VIEW_NAMESPACE, cluster).await?;

        let next = match observation {
            ViewObservation::Missing => {
                self.resources
                    .create_resources(sets::NAMESPACE_VIEW_SET, &self.view_data(cluster))
                    .await?;
                PrecacheState::Restarting
            }
            ViewObservation::Pending => PrecacheState::Restarting,
            // Namespace still there
            ViewObservation::Available => {
                self.resources
                    .create_resources(sets::NAMESPACE_DELETE_SET, &self.view_data(cluster))
                    .await?;
                PrecacheState::Restarting
            }
            ViewObservation::Unavailable => {
                self.resources
                    .delete_resource(&templates::NAMESPACE_DELETE, cluster)
                    .await?;
                self.resources
                    .create_resources(sets::JOB_VIEW_SET, &self.view_data(cluster))
                    .await?;
                PrecacheState::Starting
            }
        };

        info!(
            cluster,
            current_state = %current,
            namespace = ?observation,
            next_state = %next,
            "Precache transition"
        );
        Ok(next)
    }

    async fn handle_active(&self, cluster: &str) -> Result<PrecacheState> {
        let current = PrecacheState::Active;
        let condition = get_precache_condition(&self.resources, cluster).await?;

        let next = match &condition {
            PrecacheCondition::PrecacheJobActive => PrecacheState::Active,
            PrecacheCondition::PrecacheJobSucceeded => {
                self.resources.delete_resources(sets::DEPENDENCIES_VIEW, cluster).await?;
                PrecacheState::Succeeded
            }
            PrecacheCondition::PrecacheJobDeadline => PrecacheState::PrecacheTimeout,
            PrecacheCondition::PrecacheJobBackoffLimitExceeded => PrecacheState::UnrecoverableError,
            PrecacheCondition::UnforeseenCondition { status } => {
                warn_unforeseen(cluster, status);
                PrecacheState::Active
            }
            _ => return Err(invalid_transition(cluster, current, &condition)),
        };

        log_transition(cluster, current, &condition, next);
        Ok(next)
    }

    /// Deploy the namespace, spec ConfigMap, service account and role binding
    /// together with the views observing them. Nothing is deployed when the
    /// batch's precaching spec is invalid.
    async fn deploy_dependencies(&self, upgrade: &mut ClusterGroupUpgrade, cluster: &str) -> Result<()> {
        let Some(spec) = self.resolver.resolve_spec(upgrade).await? else {
            warn!(cluster, "Precaching spec is invalid, not deploying dependencies");
            return Ok(());
        };

        let data = TemplateData {
            platform_image: spec.platform_image.clone(),
            operators: spec.operators(),
            ..self.view_data(cluster)
        };
        self.resources.create_resources(sets::DEPENDENCIES_CREATE, &data).await?;
        self.resources.create_resources(sets::DEPENDENCIES_VIEW, &data).await
    }

    /// Launch the job once its dependencies are confirmed on the spoke
    async fn deploy_workload(&self, upgrade: &ClusterGroupUpgrade, cluster: &str) -> Result<()> {
        let data = TemplateData {
            precaching_workload_image: self.resolver.get_precache_image_pull_spec(upgrade).await?,
            ..self.view_data(cluster)
        };
        self.resources.create_resources(sets::WORKLOAD_CREATE, &data).await?;
        self.resources.delete_resources(sets::DEPENDENCIES_VIEW, cluster).await
    }

    /// Tear the spoke side down after a job deadline so it can be redeployed.
    /// Views are deleted with their actions so the next deployment re-issues
    /// every create.
    #[instrument(skip(self))]
    async fn restart(&self, cluster: &str) -> Result<()> {
        self.resources
            .delete_resources(&[templates::JOB_VIEW, templates::NAMESPACE_VIEW], cluster)
            .await?;
        self.resources.delete_resources(sets::DEPENDENCIES_VIEW, cluster).await?;
        self.resources
            .delete_resource(&templates::NAMESPACE_CREATE, cluster)
            .await?;

        let data = self.view_data(cluster);
        self.resources.create_resources(sets::NAMESPACE_VIEW_SET, &data).await?;
        self.resources.create_resources(sets::NAMESPACE_DELETE_SET, &data).await
    }

    fn view_data(&self, cluster: &str) -> TemplateData {
        TemplateData {
            cluster: cluster.to_string(),
            precaching_workload_image: self.config.precache_workload_image.clone(),
            precaching_job_timeout: self.config.job_timeout_secs,
            view_update_interval: self.config.view_update_interval_secs,
            ..Default::default()
        }
    }
}

fn log_transition(cluster: &str, current: PrecacheState, condition: &impl Display, next: PrecacheState) {
    info!(
        cluster,
        current_state = %current,
        condition = %condition,
        next_state = %next,
        "Precache transition"
    );
}

fn warn_unforeseen(cluster: &str, status: &str) {
    let error = PrecacheError::UnforeseenJobStatus {
        cluster: cluster.to_string(),
        status: status.to_string(),
    };
    warn!(cluster, "{}", error);
}

fn invalid_transition(cluster: &str, state: PrecacheState, condition: &PrecacheCondition) -> PrecacheError {
    PrecacheError::InvalidTransition {
        cluster: cluster.to_string(),
        state: state.to_string(),
        condition: condition.to_string(),
    }
}
