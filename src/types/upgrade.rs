// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::conditions::{PRECACHING_DONE, STATUS_TRUE};
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(
    group = "ran.openshift.io",
    version = "v1alpha1",
    kind = "ClusterGroupUpgrade",
    shortname = "cgu"
)]
#[kube(namespaced)]
#[kube(status = "ClusterGroupUpgradeStatus")]
#[serde(rename_all = "camelCase")]
pub struct ClusterGroupUpgradeSpec {
    #[serde(default)]
    pub clusters: Vec<String>,
    /// Label selectors (`key=value` or `key`) matched against ManagedClusters
    #[serde(default)]
    pub cluster_selector: Vec<String>,
    /// Policies in the batch namespace the precaching spec is derived from
    #[serde(default)]
    pub managed_policies: Vec<String>,
    #[serde(default)]
    pub pre_caching: bool,
    #[serde(default)]
    pub enable: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterGroupUpgradeStatus {
    /// Per-cluster precache state names, rebuilt on every pass
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub precache_status: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    pub fn new(condition_type: &str, status: &str, reason: &str, message: impl Into<String>) -> Self {
        Self {
            condition_type: condition_type.to_string(),
            status: status.to_string(),
            reason: reason.to_string(),
            message: message.into(),
            last_transition_time: None,
        }
    }
}

impl ClusterGroupUpgradeStatus {
    pub fn find_condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    /// Insert or update a condition. The transition time only moves when the
    /// status value changes.
    pub fn set_condition(&mut self, mut condition: Condition) {
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        match self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        {
            Some(existing) => {
                if existing.status != condition.status {
                    existing.status = condition.status;
                    existing.last_transition_time = Some(now);
                }
                existing.reason = condition.reason;
                existing.message = condition.message;
            }
            None => {
                condition.last_transition_time = Some(now);
                self.conditions.push(condition);
            }
        }
    }

    pub fn remove_condition(&mut self, condition_type: &str) {
        self.conditions.retain(|c| c.condition_type != condition_type);
    }

    pub fn is_condition_true(&self, condition_type: &str) -> bool {
        self.find_condition(condition_type)
            .is_some_and(|c| c.status == STATUS_TRUE)
    }
}

impl ClusterGroupUpgrade {
    pub fn status_mut(&mut self) -> &mut ClusterGroupUpgradeStatus {
        self.status.get_or_insert_with(Default::default)
    }

    /// Check if precaching has already been marked done for this batch
    pub fn is_precaching_done(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.is_condition_true(PRECACHING_DONE))
    }

    pub fn has_precache_status(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| !s.precache_status.is_empty())
    }
}
