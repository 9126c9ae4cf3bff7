// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolves what a batch asks the spokes to pre-cache, from the policies it
//! manages and the manual overrides ConfigMap.

use crate::config::Config;
use crate::constants::conditions::{PRECACHE_SPEC_VALID, STATUS_FALSE, STATUS_TRUE};
use crate::constants::overrides;
use crate::error::Result;
use crate::kubernetes::HubClient;
use crate::precache::templates::OperatorsData;
use crate::types::{ClusterGroupUpgrade, Condition, PolicyObject};
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// What the spoke workload pre-caches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrecachingSpec {
    pub platform_image: String,
    pub operator_indexes: Vec<String>,
    pub operator_packages_and_channels: Vec<String>,
}

impl PrecachingSpec {
    pub fn operators(&self) -> OperatorsData {
        OperatorsData {
            indexes: self.operator_indexes.clone(),
            packages_and_channels: self.operator_packages_and_channels.clone(),
        }
    }
}

/// Why a batch's precaching spec cannot be used. Reported on the
/// `PrecacheSpecValid` condition rather than returned as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecProblem {
    PolicyNotFound { policy: String },
    PolicyDecodeFailed { policy: String, message: String },
    PlatformImageConflict { first: String, second: String },
    PackagesAndChannelsMissing,
    NothingToPrecache,
}

impl SpecProblem {
    pub fn reason(&self) -> &'static str {
        match self {
            SpecProblem::PolicyNotFound { .. } => "PolicyNotFound",
            SpecProblem::PolicyDecodeFailed { .. } => "PolicyDecodeFailed",
            SpecProblem::PlatformImageConflict { .. } => "PlatformImageConflict",
            SpecProblem::PackagesAndChannelsMissing => "PackagesAndChannelsMissing",
            SpecProblem::NothingToPrecache => "NothingToPrecache",
        }
    }

    pub fn message(&self) -> String {
        match self {
            SpecProblem::PolicyNotFound { policy } => {
                format!("Managed policy {} not found", policy)
            }
            SpecProblem::PolicyDecodeFailed { policy, message } => {
                format!("Policy {} could not be decoded: {}", policy, message)
            }
            SpecProblem::PlatformImageConflict { first, second } => format!(
                "Conflicting platform images requested by policies: {} and {}",
                first, second
            ),
            SpecProblem::PackagesAndChannelsMissing => {
                "Operator indexes are requested without any packages and channels".to_string()
            }
            SpecProblem::NothingToPrecache => {
                "Neither a platform image nor operators are requested".to_string()
            }
        }
    }
}

/// Validated value or the problem found while building it
pub type Validated<T> = std::result::Result<T, SpecProblem>;

/// Field overrides read from the overrides ConfigMap. Empty means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub platform_image: String,
    pub operator_indexes: Vec<String>,
    pub operator_packages_and_channels: Vec<String>,
    pub precache_image: String,
}

impl Overrides {
    /// Override wins field by field when non-empty
    pub fn apply(&self, mut spec: PrecachingSpec) -> PrecachingSpec {
        if !self.platform_image.is_empty() {
            spec.platform_image = self.platform_image.clone();
        }
        if !self.operator_indexes.is_empty() {
            spec.operator_indexes = self.operator_indexes.clone();
        }
        if !self.operator_packages_and_channels.is_empty() {
            spec.operator_packages_and_channels = self.operator_packages_and_channels.clone();
        }
        spec
    }
}

pub struct SpecResolver {
    hub: Arc<dyn HubClient>,
    config: Config,
}

impl SpecResolver {
    pub fn new(hub: Arc<dyn HubClient>, config: Config) -> Self {
        Self { hub, config }
    }

    /// Resolve and validate the spec of a batch, recording the outcome on
    /// the `PrecacheSpecValid` condition. `None` means the spec is invalid.
    #[instrument(skip(self, upgrade), fields(upgrade = %upgrade.name_any()))]
    pub async fn resolve_spec(&self, upgrade: &mut ClusterGroupUpgrade) -> Result<Option<PrecachingSpec>> {
        let from_policies = self.get_precaching_spec_from_policies(upgrade).await?;
        let overrides = self.get_operator_config_overrides(upgrade).await?;
        let validated = from_policies
            .map(|spec| overrides.apply(spec))
            .and_then(validate);

        let status = upgrade.status_mut();
        match validated {
            Ok(spec) => {
                status.set_condition(Condition::new(
                    PRECACHE_SPEC_VALID,
                    STATUS_TRUE,
                    "PrecacheSpecIsWellFormed",
                    "Pre-caching spec is valid and consistent",
                ));
                debug!(?spec, "Resolved precaching spec");
                Ok(Some(spec))
            }
            Err(problem) => {
                warn!(reason = problem.reason(), "{}", problem.message());
                status.set_condition(Condition::new(
                    PRECACHE_SPEC_VALID,
                    STATUS_FALSE,
                    problem.reason(),
                    problem.message(),
                ));
                Ok(None)
            }
        }
    }

    /// Collect the platform image, operator indexes and package channels
    /// from every policy the batch manages
    pub async fn get_precaching_spec_from_policies(
        &self,
        upgrade: &ClusterGroupUpgrade,
    ) -> Result<Validated<PrecachingSpec>> {
        let namespace = upgrade.namespace().unwrap_or_default();
        let mut spec = PrecachingSpec::default();

        for name in &upgrade.spec.managed_policies {
            let Some(policy) = self.hub.get_policy(name, &namespace).await? else {
                return Ok(Err(SpecProblem::PolicyNotFound {
                    policy: name.clone(),
                }));
            };
            let objects = match policy.objects() {
                Ok(objects) => objects,
                Err(e) => {
                    return Ok(Err(SpecProblem::PolicyDecodeFailed {
                        policy: name.clone(),
                        message: e.to_string(),
                    }))
                }
            };

            for object in objects {
                match object {
                    PolicyObject::ClusterVersion { spec: cv } => {
                        let Some(image) = cv.desired_update.and_then(|u| u.image) else {
                            continue;
                        };
                        if spec.platform_image.is_empty() {
                            spec.platform_image = image;
                        } else if spec.platform_image != image {
                            return Ok(Err(SpecProblem::PlatformImageConflict {
                                first: spec.platform_image,
                                second: image,
                            }));
                        }
                    }
                    PolicyObject::Subscription { spec: sub } => {
                        push_unique(
                            &mut spec.operator_packages_and_channels,
                            format!("{}:{}", sub.name, sub.channel),
                        );
                    }
                    PolicyObject::CatalogSource { spec: catalog } => {
                        push_unique(&mut spec.operator_indexes, catalog.image);
                    }
                    PolicyObject::Other => {}
                }
            }
        }

        Ok(Ok(spec))
    }

    /// Read the overrides ConfigMap of the batch namespace. A missing map
    /// means no overrides.
    pub async fn get_operator_config_overrides(&self, upgrade: &ClusterGroupUpgrade) -> Result<Overrides> {
        let namespace = upgrade.namespace().unwrap_or_default();
        let Some(cm) = self.hub.get_config_map(overrides::CONFIG_MAP, &namespace).await? else {
            return Ok(Overrides::default());
        };
        let data = cm.data.unwrap_or_default();
        let value = |key: &str| data.get(key).map(|v| v.trim().to_string()).unwrap_or_default();
        let lines = |key: &str| -> Vec<String> {
            data.get(key)
                .map(|v| {
                    v.lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default()
        };

        Ok(Overrides {
            platform_image: value(overrides::PLATFORM_IMAGE),
            operator_indexes: lines(overrides::OPERATORS_INDEXES),
            operator_packages_and_channels: lines(overrides::OPERATORS_PACKAGES_AND_CHANNELS),
            precache_image: value(overrides::PRECACHE_IMAGE),
        })
    }

    /// Image of the spoke workload: the `precache.image` override, else the
    /// configured default
    pub async fn get_precache_image_pull_spec(&self, upgrade: &ClusterGroupUpgrade) -> Result<String> {
        let overrides = self.get_operator_config_overrides(upgrade).await?;
        if overrides.precache_image.is_empty() {
            Ok(self.config.precache_workload_image.clone())
        } else {
            Ok(overrides.precache_image)
        }
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn validate(spec: PrecachingSpec) -> Validated<PrecachingSpec> {
    if !spec.operator_indexes.is_empty() && spec.operator_packages_and_channels.is_empty() {
        return Err(SpecProblem::PackagesAndChannelsMissing);
    }
    if spec.platform_image.is_empty()
        && spec.operator_indexes.is_empty()
        && spec.operator_packages_and_channels.is_empty()
    {
        return Err(SpecProblem::NothingToPrecache);
    }
    Ok(spec)
}
