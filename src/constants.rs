// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Names shared with the spoke-side pre-cache agent. These are part of the
/// wire contract and must not change.
pub mod spoke {
    pub const NAMESPACE: &str = "pre-cache";
    pub const JOB_NAME: &str = "pre-cache";
    pub const SERVICE_ACCOUNT: &str = "pre-cache-agent";
    pub const SPEC_CONFIG_MAP: &str = "pre-cache-spec";
    pub const CLUSTER_ROLE_BINDING: &str = "pre-cache-crb";
}

/// Hub-side names of the view and action proxies
pub mod proxies {
    pub const VIEW_JOB: &str = "view-precache-job";
    pub const VIEW_NAMESPACE: &str = "view-precache-namespace";
    pub const VIEW_SPEC_CONFIG_MAP: &str = "view-precache-spec-configmap";
    pub const VIEW_SERVICE_ACCOUNT: &str = "view-precache-service-acct";
    pub const VIEW_CLUSTER_ROLE_BINDING: &str = "view-precache-cluster-role-binding";

    pub const ACTION_NAMESPACE_CREATE: &str = "precache-ns-create";
    pub const ACTION_NAMESPACE_DELETE: &str = "precache-ns-delete";
    pub const ACTION_SPEC_CONFIG_MAP_CREATE: &str = "precache-spec-cm-create";
    pub const ACTION_SERVICE_ACCOUNT_CREATE: &str = "precache-sa-create";
    pub const ACTION_CLUSTER_ROLE_BINDING_CREATE: &str = "precache-crb-create";
    pub const ACTION_JOB_CREATE: &str = "precache-job-create";
}

/// Status condition types and reasons written on the ClusterGroupUpgrade
pub mod conditions {
    pub const READY: &str = "Ready";
    pub const PRECACHING_DONE: &str = "PrecachingDone";
    pub const PRECACHE_SPEC_VALID: &str = "PrecacheSpecValid";
    pub const PRECACHING_FAILED: &str = "PrecachingFailed";

    pub const STATUS_TRUE: &str = "True";
    pub const STATUS_FALSE: &str = "False";
}

/// Hub ConfigMap carrying manual precaching overrides
pub mod overrides {
    pub const CONFIG_MAP: &str = "cluster-group-upgrade-overrides";
    pub const PLATFORM_IMAGE: &str = "platform.image";
    pub const OPERATORS_INDEXES: &str = "operators.indexes";
    pub const OPERATORS_PACKAGES_AND_CHANNELS: &str = "operators.packagesAndChannels";
    pub const PRECACHE_IMAGE: &str = "precache.image";
}

/// The operator name used for field management
pub const OPERATOR_NAME: &str = "precache-operator";

/// Finalizer guarding hub and spoke cleanup when a batch is deleted
pub const CLEANUP_FINALIZER: &str = "precache.ran.openshift.io/cleanup";

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
