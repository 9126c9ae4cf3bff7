// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Typed view of the policies a batch applies, limited to what precaching needs.

use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(
    group = "policy.open-cluster-management.io",
    version = "v1",
    kind = "Policy"
)]
#[kube(namespaced)]
pub struct PolicySpec {
    #[serde(rename = "policy-templates", default)]
    pub policy_templates: Vec<PolicyTemplate>,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTemplate {
    pub object_definition: ConfigurationPolicy,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
pub struct ConfigurationPolicy {
    pub kind: String,
    #[serde(default)]
    pub spec: ConfigurationPolicySpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
pub struct ConfigurationPolicySpec {
    #[serde(rename = "object-templates", default)]
    pub object_templates: Vec<ObjectTemplate>,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTemplate {
    #[serde(default)]
    pub compliance_type: Option<String>,
    pub object_definition: serde_json::Value,
}

/// Spoke objects a policy can enforce that feed the precaching spec
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind")]
pub enum PolicyObject {
    ClusterVersion { spec: ClusterVersionSpec },
    Subscription { spec: SubscriptionSpec },
    CatalogSource { spec: CatalogSourceSpec },
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVersionSpec {
    #[serde(default)]
    pub desired_update: Option<DesiredUpdate>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct DesiredUpdate {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct SubscriptionSpec {
    pub name: String,
    pub channel: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct CatalogSourceSpec {
    pub image: String,
}

impl Policy {
    /// Decode every object definition of every configuration policy.
    /// Fails on the first recognised object whose shape does not match.
    pub fn objects(&self) -> Result<Vec<PolicyObject>, serde_json::Error> {
        self.spec
            .policy_templates
            .iter()
            .flat_map(|t| t.object_definition.spec.object_templates.iter())
            .map(|o| serde_json::from_value(o.object_definition.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_policy(objects: Vec<serde_json::Value>) -> Policy {
        let object_templates: Vec<_> = objects
            .into_iter()
            .map(|o| serde_json::json!({"complianceType": "musthave", "objectDefinition": o}))
            .collect();
        serde_json::from_value(serde_json::json!({
            "apiVersion": "policy.open-cluster-management.io/v1",
            "kind": "Policy",
            "metadata": {"name": "policy1", "namespace": "default"},
            "spec": {
                "policy-templates": [{
                    "objectDefinition": {
                        "apiVersion": "policy.open-cluster-management.io/v1",
                        "kind": "ConfigurationPolicy",
                        "spec": {"object-templates": object_templates}
                    }
                }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_objects_decodes_known_kinds() {
        let policy = make_policy(vec![
            serde_json::json!({
                "apiVersion": "config.openshift.io/v1",
                "kind": "ClusterVersion",
                "spec": {"desiredUpdate": {"image": "quay.io/release:4.10", "version": "4.10.1"}}
            }),
            serde_json::json!({
                "kind": "Subscription",
                "spec": {"name": "sriov-network-operator", "channel": "stable", "source": "redhat"}
            }),
            serde_json::json!({"kind": "CatalogSource", "spec": {"image": "quay.io/index:v4.10"}}),
            serde_json::json!({"kind": "Namespace", "metadata": {"name": "x"}}),
        ]);

        let objects = policy.objects().unwrap();

        assert_eq!(objects.len(), 4);
        assert!(matches!(
            &objects[0],
            PolicyObject::ClusterVersion { spec } if spec.desired_update.as_ref().unwrap().image.as_deref() == Some("quay.io/release:4.10")
        ));
        assert!(matches!(&objects[1], PolicyObject::Subscription { spec } if spec.channel == "stable"));
        assert!(matches!(&objects[2], PolicyObject::CatalogSource { spec } if spec.image == "quay.io/index:v4.10"));
        assert_eq!(objects[3], PolicyObject::Other);
    }

    #[test]
    fn test_objects_fails_on_shape_mismatch() {
        let policy = make_policy(vec![serde_json::json!({
            "kind": "Subscription",
            "spec": {"name": "ptp-operator"}
        })]);

        assert!(policy.objects().is_err());
    }

    #[test]
    fn test_objects_empty_policy() {
        let policy = make_policy(vec![]);
        assert!(policy.objects().unwrap().is_empty());
    }
}
