// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrecacheError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to render template {template}: {message}")]
    TemplateError { template: String, message: String },

    #[error("Failed to decode manifest {template}: {message}")]
    ManifestError { template: String, message: String },

    #[error("Unknown precache state '{state}' for cluster {cluster}")]
    UnknownState { cluster: String, state: String },

    #[error("Unexpected condition {condition} in {state} state for cluster {cluster}")]
    InvalidTransition {
        cluster: String,
        state: String,
        condition: String,
    },

    #[error("Unforeseen precache job status on cluster {cluster}: {status}")]
    UnforeseenJobStatus { cluster: String, status: String },

    #[error("Invalid cluster selector: {0}")]
    InvalidSelector(String),

    #[error("Failed to serialize status: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Finalizer error: {0}")]
    FinalizerError(#[source] Box<kube::runtime::finalizer::Error<PrecacheError>>),
}

pub type Result<T> = std::result::Result<T, PrecacheError>;
