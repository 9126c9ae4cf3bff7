// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Remote resource proxy: creates, probes and deletes the hub-side views and
//! actions that stand in for resources on a spoke cluster.

use crate::error::Result;
use crate::kubernetes::{HubClient, ProxyKind};
use crate::precache::templates::{self, ProxyManifest, ProxyTemplate, TemplateCatalog, TemplateData};
use crate::types::{ManagedClusterView, ViewObservation};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct RemoteResources {
    hub: Arc<dyn HubClient>,
    catalog: TemplateCatalog,
}

impl RemoteResources {
    pub fn new(hub: Arc<dyn HubClient>) -> Result<Self> {
        Ok(Self {
            hub,
            catalog: TemplateCatalog::new()?,
        })
    }

    /// Render every template of the set for `data.cluster` and create the
    /// resulting objects in the cluster namespace. Objects that already exist
    /// are left untouched. All templates are rendered before anything is
    /// created, so a broken template never leaves a half-deployed set.
    #[instrument(skip(self, templates, data), fields(cluster = %data.cluster))]
    pub async fn create_resources(&self, templates: &[ProxyTemplate], data: &TemplateData) -> Result<()> {
        let manifests = templates
            .iter()
            .map(|t| self.catalog.manifest(t, data).map(|m| (t.name, m)))
            .collect::<Result<Vec<_>>>()?;

        for (name, manifest) in manifests {
            let created = match &manifest {
                ProxyManifest::Action(action) => self.hub.create_action(action).await?,
                ProxyManifest::View(view) => self.hub.create_view(view).await?,
            };
            if created {
                info!("Created {}", name);
            } else {
                debug!("{} already exists", name);
            }
        }

        Ok(())
    }

    /// Delete a proxy object, tolerating not-found. Deleting a view also
    /// deletes the action backing it so the pair never goes out of step.
    #[instrument(skip(self, template), fields(resource = template.name))]
    pub async fn delete_resource(&self, template: &ProxyTemplate, cluster: &str) -> Result<()> {
        if self.hub.delete_proxy(template.kind, template.name, cluster).await? {
            info!("Deleted {}", template.name);
        }

        if let Some(action) = template.paired_action {
            if self.hub.delete_proxy(ProxyKind::Action, action, cluster).await? {
                info!("Deleted {}", action);
            }
        }

        Ok(())
    }

    pub async fn delete_resources(&self, templates: &[ProxyTemplate], cluster: &str) -> Result<()> {
        for template in templates {
            self.delete_resource(template, cluster).await?;
        }
        Ok(())
    }

    /// Existence probe for a view. Not-found is `None`, not an error.
    pub async fn get_resource(&self, name: &str, cluster: &str) -> Result<Option<ManagedClusterView>> {
        self.hub.get_view(name, cluster).await
    }

    pub async fn view_observation(&self, name: &str, cluster: &str) -> Result<ViewObservation> {
        Ok(self
            .get_resource(name, cluster)
            .await?
            .map_or(ViewObservation::Missing, |v| v.observation()))
    }

    /// True only when the view exists and reports Processing=True
    pub async fn is_resource_available(&self, name: &str, cluster: &str) -> Result<bool> {
        let observation = self.view_observation(name, cluster).await?;
        debug!(view = name, cluster, ?observation, "View observation");
        Ok(observation == ViewObservation::Available)
    }

    /// Remove every view and action the operator may have created for a cluster
    #[instrument(skip(self))]
    pub async fn cleanup_hub_resources(&self, cluster: &str) -> Result<()> {
        for template in templates::ALL {
            if self.hub.delete_proxy(template.kind, template.name, cluster).await? {
                info!("Deleted {}", template.name);
            }
        }
        Ok(())
    }
}
