// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource types read and written on the hub.

pub mod policy;
pub mod proxy;
pub mod upgrade;

pub use policy::{Policy, PolicyObject};
pub use proxy::{ManagedClusterAction, ManagedClusterView, ViewObservation};
pub use upgrade::{ClusterGroupUpgrade, ClusterGroupUpgradeStatus, Condition};
