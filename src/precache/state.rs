// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-cluster precache states and the conditions observed on spokes.

use std::fmt;

/// Persisted per-cluster state of the precaching state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrecacheState {
    NotStarted,
    Starting,
    Restarting,
    Active,
    Succeeded,
    PrecacheTimeout,
    UnrecoverableError,
}

impl PrecacheState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrecacheState::NotStarted => "NotStarted",
            PrecacheState::Starting => "Starting",
            PrecacheState::Restarting => "Restarting",
            PrecacheState::Active => "Active",
            PrecacheState::Succeeded => "Succeeded",
            PrecacheState::PrecacheTimeout => "PrecacheTimeout",
            PrecacheState::UnrecoverableError => "UnrecoverableError",
        }
    }

    /// Parse a persisted state name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "NotStarted" => PrecacheState::NotStarted,
            "Starting" => PrecacheState::Starting,
            "Restarting" => PrecacheState::Restarting,
            "Active" => PrecacheState::Active,
            "Succeeded" => PrecacheState::Succeeded,
            "PrecacheTimeout" => PrecacheState::PrecacheTimeout,
            "UnrecoverableError" => PrecacheState::UnrecoverableError,
            _ => return None,
        })
    }

    /// Terminal states are never left for the lifetime of the batch
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PrecacheState::Succeeded | PrecacheState::PrecacheTimeout | PrecacheState::UnrecoverableError
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PrecacheState::PrecacheTimeout | PrecacheState::UnrecoverableError)
    }
}

impl fmt::Display for PrecacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of what the proxies currently report for a cluster.
/// Recomputed on every pass, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrecacheCondition {
    NoJobView,
    NoJobFoundOnSpoke,
    JobViewExists,
    DependenciesNotPresent,
    DependenciesPresent,
    PrecacheJobActive,
    PrecacheJobSucceeded,
    PrecacheJobDeadline,
    PrecacheJobBackoffLimitExceeded,
    /// The mirrored job status matched nothing known; carries the raw status
    UnforeseenCondition { status: String },
}

impl PrecacheCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrecacheCondition::NoJobView => "NoJobView",
            PrecacheCondition::NoJobFoundOnSpoke => "NoJobFoundOnSpoke",
            PrecacheCondition::JobViewExists => "JobViewExists",
            PrecacheCondition::DependenciesNotPresent => "DependenciesNotPresent",
            PrecacheCondition::DependenciesPresent => "DependenciesPresent",
            PrecacheCondition::PrecacheJobActive => "PrecacheJobActive",
            PrecacheCondition::PrecacheJobSucceeded => "PrecacheJobSucceeded",
            PrecacheCondition::PrecacheJobDeadline => "PrecacheJobDeadline",
            PrecacheCondition::PrecacheJobBackoffLimitExceeded => "PrecacheJobBackoffLimitExceeded",
            PrecacheCondition::UnforeseenCondition { .. } => "UnforeseenCondition",
        }
    }
}

impl fmt::Display for PrecacheCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
