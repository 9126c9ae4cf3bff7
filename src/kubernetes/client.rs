// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Hub API access. Everything the operator reads or writes goes through
//! [`HubClient`] so the precaching core can run against a test double.

use crate::constants::OPERATOR_NAME;
use crate::error::Result;
use crate::types::{ClusterGroupUpgrade, ManagedClusterAction, ManagedClusterView, Policy};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    api::{DeleteParams, ListParams, PostParams},
    core::{ApiResource, DynamicObject, GroupVersionKind},
    Api, Client, Resource, ResourceExt,
};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// Kind of hub proxy object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyKind {
    Action,
    View,
}

#[async_trait]
pub trait HubClient: Send + Sync {
    /// Create an action. Returns false if one with the same name already existed.
    async fn create_action(&self, action: &ManagedClusterAction) -> Result<bool>;

    /// Create a view. Returns false if one with the same name already existed.
    async fn create_view(&self, view: &ManagedClusterView) -> Result<bool>;

    async fn get_view(&self, name: &str, namespace: &str) -> Result<Option<ManagedClusterView>>;

    /// Delete a proxy object. Returns false if it did not exist.
    async fn delete_proxy(&self, kind: ProxyKind, name: &str, namespace: &str) -> Result<bool>;

    async fn get_policy(&self, name: &str, namespace: &str) -> Result<Option<Policy>>;

    async fn get_config_map(&self, name: &str, namespace: &str) -> Result<Option<ConfigMap>>;

    /// Names of the ManagedClusters matching a label selector
    async fn list_managed_clusters(&self, label_selector: &str) -> Result<Vec<String>>;

    /// Persist the status of a batch. The stored status is replaced as a
    /// whole, so entries missing from `upgrade` are removed.
    async fn replace_upgrade_status(&self, upgrade: &ClusterGroupUpgrade) -> Result<()>;
}

/// [`HubClient`] backed by the hub API server
#[derive(Clone)]
pub struct KubeHubClient {
    client: Client,
}

impl KubeHubClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn actions(&self, namespace: &str) -> Api<ManagedClusterAction> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn views(&self, namespace: &str) -> Api<ManagedClusterView> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn managed_cluster_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("cluster.open-cluster-management.io", "v1", "ManagedCluster"),
        "managedclusters",
    )
}

/// Map a create call onto "created / already there"
async fn create_tolerating_conflict<K>(api: &Api<K>, object: &K) -> Result<bool>
where
    K: Resource + Clone + serde::Serialize + serde::de::DeserializeOwned + std::fmt::Debug,
{
    match api.create(&PostParams::default(), object).await {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(err)) if err.code == 409 => {
            debug!("{} already exists", object.name_any());
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

async fn get_tolerating_not_found<K>(api: &Api<K>, name: &str) -> Result<Option<K>>
where
    K: Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    Ok(api.get_opt(name).await?)
}

#[async_trait]
impl HubClient for KubeHubClient {
    #[instrument(skip(self, action), fields(action = %action.name_any(), cluster = ?action.namespace()))]
    async fn create_action(&self, action: &ManagedClusterAction) -> Result<bool> {
        let namespace = action.namespace().unwrap_or_default();
        create_tolerating_conflict(&self.actions(&namespace), action).await
    }

    #[instrument(skip(self, view), fields(view = %view.name_any(), cluster = ?view.namespace()))]
    async fn create_view(&self, view: &ManagedClusterView) -> Result<bool> {
        let namespace = view.namespace().unwrap_or_default();
        create_tolerating_conflict(&self.views(&namespace), view).await
    }

    async fn get_view(&self, name: &str, namespace: &str) -> Result<Option<ManagedClusterView>> {
        get_tolerating_not_found(&self.views(namespace), name).await
    }

    #[instrument(skip(self))]
    async fn delete_proxy(&self, kind: ProxyKind, name: &str, namespace: &str) -> Result<bool> {
        let result = match kind {
            ProxyKind::Action => self
                .actions(namespace)
                .delete(name, &DeleteParams::default())
                .await
                .map(|_| ()),
            ProxyKind::View => self
                .views(namespace)
                .delete(name, &DeleteParams::default())
                .await
                .map(|_| ()),
        };

        match result {
            Ok(()) => Ok(true),
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_policy(&self, name: &str, namespace: &str) -> Result<Option<Policy>> {
        let policies: Api<Policy> = Api::namespaced(self.client.clone(), namespace);
        get_tolerating_not_found(&policies, name).await
    }

    async fn get_config_map(&self, name: &str, namespace: &str) -> Result<Option<ConfigMap>> {
        let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        get_tolerating_not_found(&config_maps, name).await
    }

    #[instrument(skip(self))]
    async fn list_managed_clusters(&self, label_selector: &str) -> Result<Vec<String>> {
        let clusters: Api<DynamicObject> =
            Api::all_with(self.client.clone(), &managed_cluster_resource());
        let list = clusters
            .list(&ListParams::default().labels(label_selector))
            .await?;

        Ok(list
            .items
            .iter()
            .map(|c| c.name_any())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }

    /// PUT on the status subresource. The object's resourceVersion guards
    /// against overwriting a newer status.
    #[instrument(skip(self, upgrade), fields(upgrade = %upgrade.name_any()))]
    async fn replace_upgrade_status(&self, upgrade: &ClusterGroupUpgrade) -> Result<()> {
        let namespace = upgrade.namespace().unwrap_or_default();
        let upgrades: Api<ClusterGroupUpgrade> = Api::namespaced(self.client.clone(), &namespace);
        let params = PostParams {
            field_manager: Some(OPERATOR_NAME.to_string()),
            ..Default::default()
        };

        upgrades
            .replace_status(&upgrade.name_any(), &params, serde_json::to_vec(upgrade)?)
            .await?;
        Ok(())
    }
}
