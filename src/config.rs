// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

const DEFAULT_JOB_TIMEOUT_SECS: u64 = 3600;
const DEFAULT_VIEW_UPDATE_INTERVAL_SECS: u64 = 300;
const DEFAULT_REQUEUE_SECS: u64 = 60;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Image of the pre-cache workload run on each spoke
    pub precache_workload_image: String,
    /// activeDeadlineSeconds of the spoke job
    pub job_timeout_secs: u64,
    /// Refresh interval written into every view
    pub view_update_interval_secs: u64,
    pub requeue_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let precache_workload_image = env::var("PRECACHE_WORKLOAD_IMAGE")
            .context("PRECACHE_WORKLOAD_IMAGE environment variable not set")?;

        Ok(Config {
            precache_workload_image,
            job_timeout_secs: parse_secs("PRECACHE_JOB_TIMEOUT_SECS", DEFAULT_JOB_TIMEOUT_SECS)?,
            view_update_interval_secs: parse_secs(
                "PRECACHE_VIEW_UPDATE_INTERVAL_SECS",
                DEFAULT_VIEW_UPDATE_INTERVAL_SECS,
            )?,
            requeue_interval: Duration::from_secs(parse_secs(
                "PRECACHE_REQUEUE_SECS",
                DEFAULT_REQUEUE_SECS,
            )?),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            precache_workload_image: String::new(),
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            view_update_interval_secs: DEFAULT_VIEW_UPDATE_INTERVAL_SECS,
            requeue_interval: Duration::from_secs(DEFAULT_REQUEUE_SECS),
        }
    }
}

fn parse_secs(var: &str, default: u64) -> Result<u64> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number of seconds, got '{}'", var, value)),
        Err(_) => Ok(default),
    }
}
