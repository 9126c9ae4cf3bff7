// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pre-caching of platform and operator images on spoke clusters, driven
//! entirely through hub-side view and action proxies.

pub mod condition;
pub mod fsm;
pub mod orchestrator;
pub mod resources;
pub mod spec;
pub mod state;
pub mod templates;

pub use fsm::PrecacheFsm;
pub use orchestrator::Precacher;
pub use resources::RemoteResources;
pub use spec::{PrecachingSpec, SpecResolver};
pub use state::{PrecacheCondition, PrecacheState};
