// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mock HTTP service for the kube client and an in-memory
//! hub for the precaching core.

use crate::constants::proxies::VIEW_JOB;
use crate::error::Result;
use crate::kubernetes::{HubClient, ProxyKind};
use crate::types::proxy::{ManagedClusterViewSpec, ViewCondition, ViewScope, ViewStatus};
use crate::types::{ClusterGroupUpgrade, ClusterGroupUpgradeStatus, ManagedClusterAction, ManagedClusterView, Policy};
use async_trait::async_trait;
use http::{Request, Response};
use http_body_util::BodyExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::core::ErrorResponse;
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

type Responses = HashMap<(String, String), (u16, String)>;

/// A mock HTTP service that returns predefined responses based on request
/// paths and records every request body it receives.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<Responses>>,
    requests: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Add a response for PUT requests matching the path
    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    /// Add a response for DELETE requests matching the path
    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Bodies of the requests received for a method and exact path
    pub fn recorded(&self, method: &str, path: &str) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, p, _)| m == method && p == path)
            .map(|(_, _, body)| body.clone())
            .collect()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Fall back to prefix match, e.g. a collection path for a named object
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let response = self.find_response(&method, &path);
        let requests = self.requests.clone();

        Box::pin(async move {
            let body = req.into_body().collect().await?.to_bytes();
            requests
                .lock()
                .unwrap()
                .push((method, path, String::from_utf8_lossy(&body).to_string()));

            // Unmatched requests get a 404
            let (status, body) = response.unwrap_or_else(|| (404, status_json(404, "NotFound")));
            Ok::<_, tower::BoxError>(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// A failure Status body as returned by the API server
pub fn status_json(code: u16, reason: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("request failed: {}", reason),
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// A batch in the `default` namespace with precaching requested
pub fn make_upgrade(clusters: &[&str]) -> ClusterGroupUpgrade {
    let mut upgrade = ClusterGroupUpgrade::new("upgrade", Default::default());
    upgrade.metadata.namespace = Some("default".to_string());
    upgrade.spec.clusters = clusters.iter().map(|c| c.to_string()).collect();
    upgrade.spec.pre_caching = true;
    upgrade
}

/// A policy in the `default` namespace with one configuration policy
/// enforcing the given objects
pub fn policy_with_objects(name: &str, objects: Vec<serde_json::Value>) -> Policy {
    let object_templates: Vec<_> = objects
        .into_iter()
        .map(|o| serde_json::json!({"complianceType": "musthave", "objectDefinition": o}))
        .collect();
    serde_json::from_value(serde_json::json!({
        "apiVersion": "policy.open-cluster-management.io/v1",
        "kind": "Policy",
        "metadata": {"name": name, "namespace": "default"},
        "spec": {
            "policy-templates": [{
                "objectDefinition": {
                    "apiVersion": "policy.open-cluster-management.io/v1",
                    "kind": "ConfigurationPolicy",
                    "spec": {"object-templates": object_templates}
                }
            }]
        }
    }))
    .unwrap()
}

/// The pre-cache Job as a view mirrors it
pub fn job_json(status: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": {"name": "pre-cache", "namespace": "pre-cache"},
        "status": status
    })
}

type Key = (String, String);

#[derive(Default)]
struct HubState {
    actions: BTreeMap<Key, ManagedClusterAction>,
    views: BTreeMap<Key, ManagedClusterView>,
    policies: BTreeMap<Key, Policy>,
    config_maps: BTreeMap<Key, ConfigMap>,
    managed_clusters: BTreeMap<String, BTreeMap<String, String>>,
    failing_reads: BTreeSet<String>,
    failing_deletes: BTreeSet<String>,
    create_calls: usize,
    written: Vec<ClusterGroupUpgradeStatus>,
}

/// In-memory [`HubClient`]. Views never refresh on their own; tests play
/// the part of the view controller through [`FakeHub::set_view_processing`].
#[derive(Default)]
pub struct FakeHub {
    state: Mutex<HubState>,
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn server_error(namespace: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("injected failure for {}", namespace),
        reason: "InternalError".to_string(),
        code: 500,
    })
}

impl FakeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted names of the proxies of one kind in a cluster namespace
    pub fn names(&self, cluster: &str, kind: ProxyKind) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let keys: Vec<&Key> = match kind {
            ProxyKind::Action => state.actions.keys().collect(),
            ProxyKind::View => state.views.keys().collect(),
        };
        keys.into_iter()
            .filter(|(ns, _)| ns == cluster)
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn action(&self, cluster: &str, name: &str) -> Option<ManagedClusterAction> {
        self.state.lock().unwrap().actions.get(&key(cluster, name)).cloned()
    }

    /// Create attempts, including ones that found the object already there
    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn written_statuses(&self) -> Vec<ClusterGroupUpgradeStatus> {
        self.state.lock().unwrap().written.clone()
    }

    /// Make every read in a cluster namespace fail with a server error
    pub fn fail_reads(&self, cluster: &str) {
        self.state.lock().unwrap().failing_reads.insert(cluster.to_string());
    }

    /// Make every delete in a cluster namespace fail with a server error
    pub fn fail_deletes(&self, cluster: &str) {
        self.state.lock().unwrap().failing_deletes.insert(cluster.to_string());
    }

    /// Place a view that has not been refreshed yet
    pub fn insert_view(&self, cluster: &str, name: &str) {
        let mut view = ManagedClusterView::new(
            name,
            ManagedClusterViewSpec {
                scope: ViewScope {
                    resource: "jobs".to_string(),
                    name: "pre-cache".to_string(),
                    namespace: None,
                    update_interval_seconds: None,
                },
            },
        );
        view.metadata.namespace = Some(cluster.to_string());
        self.state.lock().unwrap().views.insert(key(cluster, name), view);
    }

    pub fn insert_action(&self, cluster: &str, name: &str) {
        let action: ManagedClusterAction = serde_json::from_value(serde_json::json!({
            "apiVersion": "action.open-cluster-management.io/v1beta1",
            "kind": "ManagedClusterAction",
            "metadata": {"name": name, "namespace": cluster},
            "spec": {"actionType": "Create", "kube": {"resource": "job"}}
        }))
        .unwrap();
        self.state.lock().unwrap().actions.insert(key(cluster, name), action);
    }

    /// Simulate a view refresh: set the Processing condition and result
    pub fn set_view_processing(&self, cluster: &str, name: &str, status: &str, result: Option<serde_json::Value>) {
        let mut state = self.state.lock().unwrap();
        let view = state
            .views
            .get_mut(&key(cluster, name))
            .unwrap_or_else(|| panic!("no view {} in {}", name, cluster));
        view.status = Some(ViewStatus {
            conditions: vec![ViewCondition {
                condition_type: "Processing".to_string(),
                status: status.to_string(),
                reason: None,
                message: None,
            }],
            result,
        });
    }

    /// Ensure the job view exists and mirrors a job with the given status
    pub fn set_job_status(&self, cluster: &str, status: serde_json::Value) {
        let exists = self
            .state
            .lock()
            .unwrap()
            .views
            .contains_key(&key(cluster, VIEW_JOB));
        if !exists {
            self.insert_view(cluster, VIEW_JOB);
        }
        self.set_view_processing(cluster, VIEW_JOB, "True", Some(job_json(status)));
    }

    pub fn add_policy(&self, policy: Policy) {
        let k = key(&policy.namespace().unwrap_or_default(), &policy.name_any());
        self.state.lock().unwrap().policies.insert(k, policy);
    }

    pub fn add_config_map(&self, namespace: &str, name: &str, data: BTreeMap<String, String>) {
        let cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        };
        self.state.lock().unwrap().config_maps.insert(key(namespace, name), cm);
    }

    pub fn add_managed_cluster(&self, name: &str, labels: &[(&str, &str)]) {
        let labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.state
            .lock()
            .unwrap()
            .managed_clusters
            .insert(name.to_string(), labels);
    }

    fn check_read(&self, namespace: &str) -> Result<()> {
        if self.state.lock().unwrap().failing_reads.contains(namespace) {
            return Err(server_error(namespace).into());
        }
        Ok(())
    }
}

#[async_trait]
impl HubClient for FakeHub {
    async fn create_action(&self, action: &ManagedClusterAction) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        let k = key(&action.namespace().unwrap_or_default(), &action.name_any());
        if state.actions.contains_key(&k) {
            return Ok(false);
        }
        state.actions.insert(k, action.clone());
        Ok(true)
    }

    async fn create_view(&self, view: &ManagedClusterView) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        let k = key(&view.namespace().unwrap_or_default(), &view.name_any());
        if state.views.contains_key(&k) {
            return Ok(false);
        }
        let mut view = view.clone();
        view.status = None;
        state.views.insert(k, view);
        Ok(true)
    }

    async fn get_view(&self, name: &str, namespace: &str) -> Result<Option<ManagedClusterView>> {
        self.check_read(namespace)?;
        Ok(self.state.lock().unwrap().views.get(&key(namespace, name)).cloned())
    }

    async fn delete_proxy(&self, kind: ProxyKind, name: &str, namespace: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if state.failing_deletes.contains(namespace) {
            return Err(server_error(namespace).into());
        }
        let k = key(namespace, name);
        Ok(match kind {
            ProxyKind::Action => state.actions.remove(&k).is_some(),
            ProxyKind::View => state.views.remove(&k).is_some(),
        })
    }

    async fn get_policy(&self, name: &str, namespace: &str) -> Result<Option<Policy>> {
        self.check_read(namespace)?;
        Ok(self.state.lock().unwrap().policies.get(&key(namespace, name)).cloned())
    }

    async fn get_config_map(&self, name: &str, namespace: &str) -> Result<Option<ConfigMap>> {
        self.check_read(namespace)?;
        Ok(self.state.lock().unwrap().config_maps.get(&key(namespace, name)).cloned())
    }

    async fn list_managed_clusters(&self, label_selector: &str) -> Result<Vec<String>> {
        let (label, value) = match label_selector.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (label_selector, None),
        };
        let state = self.state.lock().unwrap();
        Ok(state
            .managed_clusters
            .iter()
            .filter(|(_, labels)| match (labels.get(label), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn replace_upgrade_status(&self, upgrade: &ClusterGroupUpgrade) -> Result<()> {
        let status = upgrade.status.clone().unwrap_or_default();
        self.state.lock().unwrap().written.push(status);
        Ok(())
    }
}
