// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Classifies what the hub-side views report about a cluster's pre-cache job.

use crate::constants::proxies::VIEW_JOB;
use crate::error::Result;
use crate::precache::resources::RemoteResources;
use crate::precache::state::PrecacheCondition;
use crate::precache::templates::sets;
use crate::types::{ManagedClusterView, ViewObservation};
use k8s_openapi::api::batch::v1::Job;
use tracing::{debug, instrument};

const JOB_FAILED: &str = "Failed";
const REASON_DEADLINE_EXCEEDED: &str = "DeadlineExceeded";
const REASON_BACKOFF_LIMIT_EXCEEDED: &str = "BackoffLimitExceeded";

/// Probe the proxies of `cluster` and classify the pre-cache job.
///
/// A job view that mirrors a job wins. Otherwise the dependency views decide
/// between "dependencies missing" and "dependencies there, job missing".
#[instrument(skip(resources))]
pub async fn get_precache_condition(resources: &RemoteResources, cluster: &str) -> Result<PrecacheCondition> {
    let condition = match resources.get_resource(VIEW_JOB, cluster).await? {
        None => PrecacheCondition::NoJobView,
        Some(view) if view.observation() == ViewObservation::Available => job_condition(&view),
        Some(_) => match dependencies_condition(resources, cluster).await? {
            PrecacheCondition::DependenciesPresent => PrecacheCondition::NoJobFoundOnSpoke,
            other => other,
        },
    };

    debug!(%condition, "Precache condition");
    Ok(condition)
}

/// `DependenciesPresent` only when every dependency view reports its
/// resource as present on the spoke
pub async fn dependencies_condition(resources: &RemoteResources, cluster: &str) -> Result<PrecacheCondition> {
    for template in sets::DEPENDENCIES_VIEW {
        if !resources.is_resource_available(template.name, cluster).await? {
            debug!(view = template.name, "Dependency not present");
            return Ok(PrecacheCondition::DependenciesNotPresent);
        }
    }
    Ok(PrecacheCondition::DependenciesPresent)
}

/// Decode the job mirrored by an available view
fn job_condition(view: &ManagedClusterView) -> PrecacheCondition {
    let Some(result) = view.result() else {
        return unforeseen("view reports no result".to_string());
    };

    let job: Job = match serde_json::from_value(result.clone()) {
        Ok(job) => job,
        Err(e) => return unforeseen(format!("{}: {}", e, result)),
    };
    let Some(status) = job.status else {
        return unforeseen(format!("job has no status: {}", result));
    };

    if status.active.unwrap_or(0) > 0 {
        return PrecacheCondition::PrecacheJobActive;
    }
    if status.succeeded.unwrap_or(0) > 0 {
        return PrecacheCondition::PrecacheJobSucceeded;
    }

    let failed = status
        .conditions
        .iter()
        .flatten()
        .find(|c| c.type_ == JOB_FAILED && c.status == "True");
    match failed.and_then(|c| c.reason.as_deref()) {
        Some(REASON_DEADLINE_EXCEEDED) => PrecacheCondition::PrecacheJobDeadline,
        Some(REASON_BACKOFF_LIMIT_EXCEEDED) => PrecacheCondition::PrecacheJobBackoffLimitExceeded,
        _ => unforeseen(serde_json::to_string(&status).unwrap_or_default()),
    }
}

fn unforeseen(status: String) -> PrecacheCondition {
    PrecacheCondition::UnforeseenCondition { status }
}
