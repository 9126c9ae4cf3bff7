// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery and hub API access.

pub mod client;
pub mod crd;

pub use client::{HubClient, KubeHubClient, ProxyKind};
pub use crd::wait_for_required_crds;
