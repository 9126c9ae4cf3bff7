// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Hub-side proxy resources: actions mutate spoke state, views mirror it.

use crate::constants::conditions::STATUS_TRUE;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

const PROCESSING: &str = "Processing";

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(
    group = "action.open-cluster-management.io",
    version = "v1beta1",
    kind = "ManagedClusterAction"
)]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterActionSpec {
    pub action_type: ActionType,
    pub kube: KubeWorkSpec,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub enum ActionType {
    Create,
    Delete,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeWorkSpec {
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<serde_json::Value>,
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(
    group = "view.open-cluster-management.io",
    version = "v1beta1",
    kind = "ManagedClusterView"
)]
#[kube(namespaced)]
#[kube(status = "ViewStatus")]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterViewSpec {
    pub scope: ViewScope,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewScope {
    pub resource: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_interval_seconds: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewStatus {
    #[serde(default, deserialize_with = "lenient_conditions")]
    pub conditions: Vec<ViewCondition>,
    /// The mirrored spoke object, as returned by the spoke API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewCondition {
    #[serde(rename = "type", default)]
    pub condition_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The view controller owns this status. Entries that do not decode are
/// dropped, and anything but a list reads as no conditions at all.
fn lenient_conditions<'de, D>(deserializer: D) -> Result<Vec<ViewCondition>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// What a view currently tells us about its spoke resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewObservation {
    /// The view object does not exist on the hub
    Missing,
    /// The view exists but has not reported a Processing status yet
    Pending,
    /// Processing=True: the spoke resource exists and is mirrored
    Available,
    /// Processing reports anything but True: the spoke resource is absent
    Unavailable,
}

impl ManagedClusterView {
    fn processing_condition(&self) -> Option<&ViewCondition> {
        self.status
            .as_ref()?
            .conditions
            .iter()
            .find(|c| c.condition_type == PROCESSING)
    }

    pub fn observation(&self) -> ViewObservation {
        match self.processing_condition() {
            None => ViewObservation::Pending,
            Some(c) if c.status.is_empty() => ViewObservation::Pending,
            Some(c) if c.status == STATUS_TRUE => ViewObservation::Available,
            Some(_) => ViewObservation::Unavailable,
        }
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        self.status.as_ref()?.result.as_ref()
    }
}
