// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Catalog of the proxy manifests deployed per cluster, rendered with minijinja.

use crate::constants::proxies::*;
use crate::constants::spoke;
use crate::error::{PrecacheError, Result};
use crate::kubernetes::ProxyKind;
use crate::types::{ManagedClusterAction, ManagedClusterView};
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

const ACTION_HEADER: &str = "action-header";
const VIEW_HEADER: &str = "view-header";

const HEADERS: &[(&str, &str)] = &[
    (ACTION_HEADER, include_str!("../../templates/action-header.yaml")),
    (VIEW_HEADER, include_str!("../../templates/view-header.yaml")),
];

/// A named manifest template. The name is also the name of the hub object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyTemplate {
    pub name: &'static str,
    pub kind: ProxyKind,
    /// For views: the action that materialises the observed spoke resource
    pub paired_action: Option<&'static str>,
    source: &'static str,
}

pub const NAMESPACE_CREATE: ProxyTemplate = ProxyTemplate {
    name: ACTION_NAMESPACE_CREATE,
    kind: ProxyKind::Action,
    paired_action: None,
    source: include_str!("../../templates/action-namespace-create.yaml"),
};

pub const NAMESPACE_DELETE: ProxyTemplate = ProxyTemplate {
    name: ACTION_NAMESPACE_DELETE,
    kind: ProxyKind::Action,
    paired_action: None,
    source: include_str!("../../templates/action-namespace-delete.yaml"),
};

pub const SPEC_CONFIG_MAP_CREATE: ProxyTemplate = ProxyTemplate {
    name: ACTION_SPEC_CONFIG_MAP_CREATE,
    kind: ProxyKind::Action,
    paired_action: None,
    source: include_str!("../../templates/action-spec-configmap-create.yaml"),
};

pub const SERVICE_ACCOUNT_CREATE: ProxyTemplate = ProxyTemplate {
    name: ACTION_SERVICE_ACCOUNT_CREATE,
    kind: ProxyKind::Action,
    paired_action: None,
    source: include_str!("../../templates/action-service-account-create.yaml"),
};

pub const CLUSTER_ROLE_BINDING_CREATE: ProxyTemplate = ProxyTemplate {
    name: ACTION_CLUSTER_ROLE_BINDING_CREATE,
    kind: ProxyKind::Action,
    paired_action: None,
    source: include_str!("../../templates/action-cluster-role-binding-create.yaml"),
};

pub const JOB_CREATE: ProxyTemplate = ProxyTemplate {
    name: ACTION_JOB_CREATE,
    kind: ProxyKind::Action,
    paired_action: None,
    source: include_str!("../../templates/action-job-create.yaml"),
};

pub const JOB_VIEW: ProxyTemplate = ProxyTemplate {
    name: VIEW_JOB,
    kind: ProxyKind::View,
    paired_action: Some(ACTION_JOB_CREATE),
    source: include_str!("../../templates/view-job.yaml"),
};

pub const NAMESPACE_VIEW: ProxyTemplate = ProxyTemplate {
    name: VIEW_NAMESPACE,
    kind: ProxyKind::View,
    paired_action: Some(ACTION_NAMESPACE_CREATE),
    source: include_str!("../../templates/view-namespace.yaml"),
};

pub const SPEC_CONFIG_MAP_VIEW: ProxyTemplate = ProxyTemplate {
    name: VIEW_SPEC_CONFIG_MAP,
    kind: ProxyKind::View,
    paired_action: Some(ACTION_SPEC_CONFIG_MAP_CREATE),
    source: include_str!("../../templates/view-spec-configmap.yaml"),
};

pub const SERVICE_ACCOUNT_VIEW: ProxyTemplate = ProxyTemplate {
    name: VIEW_SERVICE_ACCOUNT,
    kind: ProxyKind::View,
    paired_action: Some(ACTION_SERVICE_ACCOUNT_CREATE),
    source: include_str!("../../templates/view-service-account.yaml"),
};

pub const CLUSTER_ROLE_BINDING_VIEW: ProxyTemplate = ProxyTemplate {
    name: VIEW_CLUSTER_ROLE_BINDING,
    kind: ProxyKind::View,
    paired_action: Some(ACTION_CLUSTER_ROLE_BINDING_CREATE),
    source: include_str!("../../templates/view-cluster-role-binding.yaml"),
};

/// Named template sets deployed together
pub mod sets {
    use super::*;

    pub const JOB_VIEW_SET: &[ProxyTemplate] = &[JOB_VIEW];
    pub const NAMESPACE_VIEW_SET: &[ProxyTemplate] = &[NAMESPACE_VIEW];
    pub const DEPENDENCIES_CREATE: &[ProxyTemplate] = &[
        NAMESPACE_CREATE,
        SPEC_CONFIG_MAP_CREATE,
        SERVICE_ACCOUNT_CREATE,
        CLUSTER_ROLE_BINDING_CREATE,
    ];
    pub const DEPENDENCIES_VIEW: &[ProxyTemplate] = &[
        SPEC_CONFIG_MAP_VIEW,
        SERVICE_ACCOUNT_VIEW,
        CLUSTER_ROLE_BINDING_VIEW,
    ];
    pub const WORKLOAD_CREATE: &[ProxyTemplate] = &[JOB_CREATE, JOB_VIEW];
    pub const NAMESPACE_DELETE_SET: &[ProxyTemplate] = &[NAMESPACE_DELETE];
}

/// Every template of the catalog, views first
pub const ALL: &[ProxyTemplate] = &[
    JOB_VIEW,
    NAMESPACE_VIEW,
    SPEC_CONFIG_MAP_VIEW,
    SERVICE_ACCOUNT_VIEW,
    CLUSTER_ROLE_BINDING_VIEW,
    NAMESPACE_CREATE,
    NAMESPACE_DELETE,
    SPEC_CONFIG_MAP_CREATE,
    SERVICE_ACCOUNT_CREATE,
    CLUSTER_ROLE_BINDING_CREATE,
    JOB_CREATE,
];

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct OperatorsData {
    pub indexes: Vec<String>,
    pub packages_and_channels: Vec<String>,
}

/// Per-cluster values the manifests are rendered against
#[derive(Serialize, Debug, Clone, Default)]
pub struct TemplateData {
    pub cluster: String,
    pub resource_name: String,
    pub platform_image: String,
    pub operators: OperatorsData,
    pub precaching_workload_image: String,
    pub precaching_job_timeout: u64,
    pub view_update_interval: u64,
}

/// A rendered and decoded proxy manifest
#[derive(Debug, Clone)]
pub enum ProxyManifest {
    Action(ManagedClusterAction),
    View(ManagedClusterView),
}

pub struct TemplateCatalog {
    env: Environment<'static>,
}

impl TemplateCatalog {
    pub fn new() -> Result<Self> {
        Self::from_sources(
            HEADERS
                .iter()
                .copied()
                .chain(ALL.iter().map(|t| (t.name, t.source))),
        )
    }

    fn from_sources(sources: impl IntoIterator<Item = (&'static str, &'static str)>) -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_global("spoke_namespace", spoke::NAMESPACE);
        env.add_global("spoke_job", spoke::JOB_NAME);
        env.add_global("spoke_service_account", spoke::SERVICE_ACCOUNT);
        env.add_global("spoke_spec_config_map", spoke::SPEC_CONFIG_MAP);
        env.add_global("spoke_cluster_role_binding", spoke::CLUSTER_ROLE_BINDING);

        for (name, source) in sources {
            env.add_template(name, source)
                .map_err(|e| template_error(name, e))?;
        }

        Ok(Self { env })
    }

    /// Render a template to YAML. Pure: no hub access.
    pub fn render(&self, name: &str, data: &TemplateData) -> Result<String> {
        let data = TemplateData {
            resource_name: name.to_string(),
            ..data.clone()
        };

        self.env
            .get_template(name)
            .and_then(|t| t.render(&data))
            .map_err(|e| template_error(name, e))
    }

    /// Render a template and decode it into the typed proxy object
    pub fn manifest(&self, template: &ProxyTemplate, data: &TemplateData) -> Result<ProxyManifest> {
        let rendered = self.render(template.name, data)?;
        let decoded = match template.kind {
            ProxyKind::Action => serde_yaml::from_str(&rendered).map(ProxyManifest::Action),
            ProxyKind::View => serde_yaml::from_str(&rendered).map(ProxyManifest::View),
        };

        decoded.map_err(|e| PrecacheError::ManifestError {
            template: template.name.to_string(),
            message: e.to_string(),
        })
    }
}

fn template_error(name: &str, e: minijinja::Error) -> PrecacheError {
    PrecacheError::TemplateError {
        template: name.to_string(),
        message: e.to_string(),
    }
}
