// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test doubles: a mock Kubernetes HTTP service plus in-memory Vault and cluster stores.

use crate::error::{Result as SyncResult, SyncError};
use crate::store::{ClusterSecrets, CreateOutcome, SecretRef, SecretStore};
use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::stream::{self, BoxStream, StreamExt};
use http::{Request, Response};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::client::Body;
use kube::Client;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

pub const OWNER: &str = "vault-sync";

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
    uris: Arc<Mutex<Vec<String>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            uris: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Answer `GET path?watch=true` with a stream of newline-delimited watch events
    pub fn on_watch(self, path: &str, events: &[(&str, String)]) -> Self {
        let body: String = events
            .iter()
            .map(|(kind, object)| format!("{{\"type\":\"{}\",\"object\":{}}}\n", kind, object))
            .collect();
        self.on("WATCH", path, 200, &body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    /// Every (method, path) received so far, in order
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Every request URI received so far, including the query string
    pub fn request_uris(&self) -> Vec<String> {
        self.uris.lock().unwrap().clone()
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Prefix match for paths like /api/v1/namespaces/foo
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
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let query = req.uri().query().unwrap_or_default().to_string();

        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));
        self.uris.lock().unwrap().push(req.uri().to_string());

        let is_watch = method == "GET" && query.split('&').any(|p| p == "watch=true");
        let response = if is_watch {
            self.find_response("WATCH", &path)
        } else {
            self.find_response(&method, &path)
        };

        Box::pin(async move {
            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("object", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock namespace list JSON response
pub fn namespace_list_json(names: &[&str]) -> String {
    let items: Vec<Value> = names
        .iter()
        .map(|name| {
            json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": {"name": name, "uid": format!("uid-{}", name)}
            })
        })
        .collect();
    json!({
        "apiVersion": "v1",
        "kind": "NamespaceList",
        "metadata": {"resourceVersion": "1"},
        "items": items
    })
    .to_string()
}

/// Create a mock secret list JSON response
pub fn secret_list_json(secrets: &[String]) -> String {
    format!(
        r#"{{"apiVersion":"v1","kind":"SecretList","metadata":{{"resourceVersion":"10"}},"items":[{}]}}"#,
        secrets.join(",")
    )
}

/// Create a mock secret JSON response with one data key
pub fn secret_json(namespace: &str, name: &str, owner: Option<&str>) -> String {
    let mut metadata = json!({
        "name": name,
        "namespace": namespace,
        "resourceVersion": "7"
    });
    if let Some(owner) = owner {
        metadata["labels"] = json!({"managed-by": owner});
    }
    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": metadata,
        "type": "Opaque",
        "data": {"user": "dQ=="}
    })
    .to_string()
}

/// Create a Kubernetes Status failure response
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(404, "NotFound", &format!("{} \"{}\" not found", resource, name))
}

/// A kube API error as the cluster store would surface it
pub fn api_error(code: u16) -> SyncError {
    SyncError::KubeError(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("injected failure {}", code),
        reason: "InternalError".to_string(),
        code,
    }))
}

/// A KV v2 read result holding `entries`
pub fn vault_kv2(entries: &[(&str, &str)]) -> Map<String, Value> {
    let data: Map<String, Value> = entries
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    let mut response = Map::new();
    response.insert("data".to_string(), Value::Object(data));
    response.insert("metadata".to_string(), json!({"version": 1}));
    response
}

/// A KV v1 read result: the entries themselves
pub fn vault_kv1(entries: &[(&str, &str)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

/// In-memory Vault
#[derive(Default)]
pub struct FakeVault {
    secrets: Mutex<HashMap<String, Map<String, Value>>>,
    reads: AtomicUsize,
    failing: AtomicBool,
}

impl FakeVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, path: &str, response: Map<String, Value>) {
        self.secrets
            .lock()
            .unwrap()
            .insert(path.to_string(), response);
    }

    pub fn fail_reads(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for FakeVault {
    async fn read(&self, path: &str) -> SyncResult<Option<Map<String, Value>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::VaultError("connection refused".to_string()));
        }
        Ok(self.secrets.lock().unwrap().get(path).cloned())
    }
}

/// Counts of calls made against the fake cluster; only successful writes are counted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub gets: usize,
    pub creates: usize,
    pub replaces: usize,
    pub deletes: usize,
}

impl Calls {
    pub fn mutations(&self) -> usize {
        self.creates + self.replaces + self.deletes
    }
}

#[derive(Default)]
struct ClusterState {
    namespaces: Vec<String>,
    secrets: BTreeMap<(String, String), Secret>,
    calls: Calls,
    failing_gets: HashSet<String>,
    failing_deletes: bool,
    failing_list: bool,
    next_version: u64,
}

impl ClusterState {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

/// In-memory cluster secret store with a controllable deletion stream
pub struct FakeCluster {
    state: Mutex<ClusterState>,
    deletions_tx: UnboundedSender<SecretRef>,
    deletions_rx: Mutex<Option<UnboundedReceiver<SecretRef>>>,
}

impl FakeCluster {
    pub fn new(namespaces: &[&str]) -> Self {
        let (deletions_tx, deletions_rx) = unbounded();
        Self {
            state: Mutex::new(ClusterState {
                namespaces: namespaces.iter().map(|n| n.to_string()).collect(),
                ..Default::default()
            }),
            deletions_tx,
            deletions_rx: Mutex::new(Some(deletions_rx)),
        }
    }

    /// Place a secret directly, as if someone else created it
    pub fn insert(&self, mut secret: Secret) {
        let mut state = self.state.lock().unwrap();
        secret.metadata.resource_version = Some(state.bump_version());
        let key = (
            secret.metadata.namespace.clone().unwrap_or_default(),
            secret.metadata.name.clone().unwrap_or_default(),
        );
        state.secrets.insert(key, secret);
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls
    }

    pub fn reset_calls(&self) {
        self.state.lock().unwrap().calls = Calls::default();
    }

    /// Change one data value without touching the annotations
    pub fn edit_data(&self, namespace: &str, name: &str, key: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        let version = state.bump_version();
        if let Some(secret) = state
            .secrets
            .get_mut(&(namespace.to_string(), name.to_string()))
        {
            secret
                .data
                .get_or_insert_with(BTreeMap::new)
                .insert(key.to_string(), ByteString(value.as_bytes().to_vec()));
            secret.metadata.resource_version = Some(version);
        }
    }

    /// Remove a secret out of band and publish the deletion on the watch stream
    pub fn delete_externally(&self, namespace: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .secrets
            .remove(&(namespace.to_string(), name.to_string()));
        self.notify_deleted(namespace, name);
    }

    /// Publish a deletion event without changing any state
    pub fn notify_deleted(&self, namespace: &str, name: &str) {
        let _ = self.deletions_tx.unbounded_send(SecretRef {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
    }

    pub fn fail_gets_in(&self, namespace: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_gets
            .insert(namespace.to_string());
    }

    pub fn fail_deletes(&self, failing: bool) {
        self.state.lock().unwrap().failing_deletes = failing;
    }

    pub fn fail_list(&self, failing: bool) {
        self.state.lock().unwrap().failing_list = failing;
    }
}

#[async_trait]
impl ClusterSecrets for FakeCluster {
    async fn list_namespaces(&self) -> SyncResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        if state.failing_list {
            return Err(api_error(500));
        }
        Ok(state.namespaces.clone())
    }

    async fn get(&self, namespace: &str, name: &str) -> SyncResult<Option<Secret>> {
        let mut state = self.state.lock().unwrap();
        state.calls.gets += 1;
        if state.failing_gets.contains(namespace) {
            return Err(api_error(500));
        }
        Ok(state
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create(&self, namespace: &str, secret: &Secret) -> SyncResult<CreateOutcome> {
        let mut state = self.state.lock().unwrap();
        let key = (namespace.to_string(), secret.metadata.name.clone().unwrap_or_default());
        if state.secrets.contains_key(&key) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        let mut stored = secret.clone();
        stored.metadata.namespace = Some(namespace.to_string());
        stored.metadata.resource_version = Some(state.bump_version());
        state.secrets.insert(key, stored);
        state.calls.creates += 1;
        Ok(CreateOutcome::Created)
    }

    async fn replace(&self, namespace: &str, secret: &Secret) -> SyncResult<()> {
        let mut state = self.state.lock().unwrap();
        let key = (namespace.to_string(), secret.metadata.name.clone().unwrap_or_default());
        let Some(current) = state.secrets.get(&key) else {
            return Err(api_error(404));
        };
        if current.metadata.resource_version != secret.metadata.resource_version {
            return Err(api_error(409));
        }
        let mut stored = secret.clone();
        stored.metadata.resource_version = Some(state.bump_version());
        state.secrets.insert(key, stored);
        state.calls.replaces += 1;
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> SyncResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_deletes {
            return Err(api_error(500));
        }
        if state
            .secrets
            .remove(&(namespace.to_string(), name.to_string()))
            .is_some()
        {
            state.calls.deletes += 1;
        }
        Ok(())
    }

    fn watch_deletions(&self, _label_selector: &str) -> BoxStream<'static, SyncResult<SecretRef>> {
        match self.deletions_rx.lock().unwrap().take() {
            Some(rx) => rx.map(Ok).boxed(),
            None => stream::empty().boxed(),
        }
    }
}
