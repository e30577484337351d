use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
    sync::{Mutex, MutexGuard},
};

use anyhow::Context;
use async_trait::async_trait;
use certmesh_common::views::{ActionEntry, ActionState, CertStatus, Readiness};
use http::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::{Backend, BackendError, RemoteResponse, Upstream};

/// In-process stand-in for the certificate service and the member registries.
///
/// Documents are stored by path. `create` on a collection path stores the
/// body under `collection/{metadata.name}`, `read` on a collection lists its
/// direct children, and `delete` removes a document together with everything
/// below it. Paths ending in `{enrollment,distribution}/{instantiate,terminate}`
/// append to that phase's action log, which `.../status` reports back.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    documents: BTreeMap<String, Value>,
    collections: BTreeSet<String>,
    phases: BTreeMap<String, CertStatus>,
}

enum Route<'a> {
    PhaseAction {
        intent: &'a str,
        phase: &'a str,
        action: &'a str,
    },
    PhaseStatus {
        intent: &'a str,
        phase: &'a str,
    },
    Resource(&'a str),
}

fn normalize(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or(path);
    path.trim_end_matches('/')
}

fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(p, _)| p).filter(|p| !p.is_empty())
}

fn route(path: &str) -> Route<'_> {
    let Some((phase_path, last)) = path.rsplit_once('/') else {
        return Route::Resource(path);
    };
    let Some((intent, phase)) = phase_path.rsplit_once('/') else {
        return Route::Resource(path);
    };

    match (phase, last) {
        ("enrollment" | "distribution", "instantiate" | "terminate") => Route::PhaseAction {
            intent,
            phase: phase_path,
            action: last,
        },
        ("enrollment" | "distribution", "status") => Route::PhaseStatus {
            intent,
            phase: phase_path,
        },
        _ => Route::Resource(path),
    }
}

fn not_found(what: &str) -> RemoteResponse {
    RemoteResponse::new(StatusCode::NOT_FOUND, format!("{what} not found"))
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load documents from a JSON seed file (see `--memory-seed-file`).
    pub fn from_seed_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        let seed: BTreeMap<String, Value> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse seed file {}", path.display()))?;

        let backend = Self::new();
        for (path, value) in seed {
            backend.seed(&path, value);
        }
        Ok(backend)
    }

    /// Store `value` at `path`. An array is treated as a list of documents to
    /// create under the collection at `path`.
    pub fn seed(&self, path: &str, value: Value) {
        let path = normalize(path);
        let mut state = self.lock();

        match value {
            Value::Array(items) => {
                state.collections.insert(path.to_string());
                for item in items {
                    if let Some(name) = item["metadata"]["name"].as_str() {
                        state.documents.insert(format!("{path}/{name}"), item.clone());
                    }
                }
            }
            other => {
                if let Some(collection) = parent(path) {
                    state.collections.insert(collection.to_string());
                }
                state.documents.insert(path.to_string(), other);
            }
        }
    }

    /// The document stored at `path`, if any.
    pub fn document(&self, path: &str) -> Option<Value> {
        self.lock().documents.get(normalize(path)).cloned()
    }

    /// Overwrite the status reported for the phase at `phase_path`
    /// (`.../ca-certs/{intent}/{phase}`).
    pub fn set_phase_status(&self, phase_path: &str, status: CertStatus) {
        self.lock()
            .phases
            .insert(normalize(phase_path).to_string(), status);
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means another request panicked mid-update; the
        // maps themselves are always left in a usable shape.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MemoryState {
    fn children(&self, collection: &str) -> Vec<Value> {
        let prefix = format!("{collection}/");
        self.documents
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter(|(k, _)| !k[prefix.len()..].contains('/'))
            .map(|(_, v)| v.clone())
            .collect()
    }

    fn is_collection(&self, path: &str) -> bool {
        self.collections.contains(path)
            || parent(path).is_some_and(|p| self.documents.contains_key(p))
    }

    /// A collection nested under an item of another collection needs that
    /// item to exist.
    fn owner_missing(&self, collection: &str) -> bool {
        match parent(collection) {
            Some(owner) => {
                let owner_is_item = parent(owner).is_some_and(|c| self.collections.contains(c));
                owner_is_item && !self.documents.contains_key(owner)
            }
            None => false,
        }
    }

    fn phase_action(&mut self, intent: &str, phase: &str, action: &str) -> RemoteResponse {
        if !self.documents.contains_key(intent) {
            return not_found("ca cert");
        }

        let instance = intent.rsplit('/').next().unwrap_or(intent).to_string();
        let status = self.phases.entry(phase.to_string()).or_default();

        let (state, readiness) = match action {
            "instantiate" => {
                if status.is_instantiated() {
                    return RemoteResponse::new(
                        StatusCode::CONFLICT,
                        format!("{phase} is already instantiated"),
                    );
                }
                (ActionState::Instantiated, Readiness::Ready)
            }
            _ => {
                if !status.is_instantiated() {
                    return RemoteResponse::new(
                        StatusCode::CONFLICT,
                        format!("{phase} is not instantiated"),
                    );
                }
                (ActionState::Terminated, Readiness::NotReady)
            }
        };

        let revision = status.states.actions.len() as i64;
        status.deployed_status = state.to_string();
        status.ready_status = readiness;
        status.states.actions.push(ActionEntry {
            instance,
            revision,
            state,
            time: Some(chrono::Utc::now()),
        });

        RemoteResponse::empty(StatusCode::ACCEPTED)
    }

    fn create(&mut self, collection: &str, body: &Value) -> RemoteResponse {
        let Some(name) = body["metadata"]["name"].as_str() else {
            return RemoteResponse::new(StatusCode::BAD_REQUEST, "metadata.name is required");
        };

        if self.owner_missing(collection) {
            return not_found("parent resource");
        }

        let key = format!("{collection}/{name}");
        if self.documents.contains_key(&key) {
            return RemoteResponse::new(StatusCode::CONFLICT, format!("{name} already exists"));
        }

        self.collections.insert(collection.to_string());
        self.documents.insert(key, body.clone());
        RemoteResponse::json_value(StatusCode::CREATED, body)
    }

    fn read(&self, path: &str) -> RemoteResponse {
        match route(path) {
            Route::PhaseStatus { intent, phase } => {
                if !self.documents.contains_key(intent) {
                    return not_found("ca cert");
                }
                let status = self.phases.get(phase).cloned().unwrap_or_default();
                match serde_json::to_value(&status) {
                    Ok(value) => RemoteResponse::json_value(StatusCode::OK, &value),
                    Err(e) => RemoteResponse::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
                }
            }
            Route::PhaseAction { .. } => RemoteResponse::empty(StatusCode::METHOD_NOT_ALLOWED),
            Route::Resource(path) => {
                if let Some(doc) = self.documents.get(path) {
                    RemoteResponse::json_value(StatusCode::OK, doc)
                } else if self.is_collection(path) {
                    RemoteResponse::json_value(StatusCode::OK, &Value::Array(self.children(path)))
                } else {
                    not_found("resource")
                }
            }
        }
    }

    fn delete(&mut self, path: &str) -> RemoteResponse {
        if self.documents.remove(path).is_none() {
            return not_found("resource");
        }

        let prefix = format!("{path}/");
        self.documents.retain(|k, _| !k.starts_with(&prefix));
        self.collections.retain(|k| !k.starts_with(&prefix));
        self.phases.retain(|k, _| !k.starts_with(&prefix));

        RemoteResponse::empty(StatusCode::NO_CONTENT)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn create(
        &self,
        upstream: Upstream,
        path: &str,
        body: &Value,
    ) -> Result<RemoteResponse, BackendError> {
        let path = normalize(path);
        debug!(upstream = upstream.as_str(), %path, "memory create");

        let mut state = self.lock();
        Ok(match route(path) {
            Route::PhaseAction {
                intent,
                phase,
                action,
            } => state.phase_action(intent, phase, action),
            Route::PhaseStatus { .. } => RemoteResponse::empty(StatusCode::METHOD_NOT_ALLOWED),
            Route::Resource(collection) => state.create(collection, body),
        })
    }

    async fn read(&self, upstream: Upstream, path: &str) -> Result<RemoteResponse, BackendError> {
        let path = normalize(path);
        debug!(upstream = upstream.as_str(), %path, "memory read");
        Ok(self.lock().read(path))
    }

    async fn update(
        &self,
        upstream: Upstream,
        path: &str,
        body: &Value,
    ) -> Result<RemoteResponse, BackendError> {
        let path = normalize(path);
        debug!(upstream = upstream.as_str(), %path, "memory update");

        let mut state = self.lock();
        Ok(match state.documents.get_mut(path) {
            Some(doc) => {
                *doc = body.clone();
                RemoteResponse::json_value(StatusCode::OK, body)
            }
            None => not_found("resource"),
        })
    }

    async fn delete(
        &self,
        upstream: Upstream,
        path: &str,
    ) -> Result<RemoteResponse, BackendError> {
        let path = normalize(path);
        debug!(upstream = upstream.as_str(), %path, "memory delete");
        Ok(self.lock().delete(path))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const CA_CERTS: &str = "/v2/cluster-providers/cp1/ca-certs";
    const INTENT: &str = "/v2/cluster-providers/cp1/ca-certs/cp1-certintent1";

    async fn with_intent() -> MemoryBackend {
        let backend = MemoryBackend::new();
        let resp = backend
            .create(
                Upstream::CertService,
                CA_CERTS,
                &json!({"metadata": {"name": "cp1-certintent1"}}),
            )
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::CREATED);
        backend
    }

    #[tokio::test]
    async fn seeded_collection_lists_children_and_ignores_query() {
        let backend = MemoryBackend::new();
        backend.seed(
            "/v2/cluster-providers/cp1/clusters",
            json!([{"metadata": {"name": "c1"}}, {"metadata": {"name": "c2"}}]),
        );

        let resp = backend
            .read(
                Upstream::ClusterRegistry,
                "/v2/cluster-providers/cp1/clusters?withLabels=true",
            )
            .await
            .unwrap();

        let names: Vec<String> = resp
            .json::<Vec<Value>>()
            .unwrap()
            .iter()
            .map(|v| v["metadata"]["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn empty_member_collection_of_existing_intent_is_listed() {
        let backend = with_intent().await;

        let resp = backend
            .read(Upstream::CertService, &format!("{INTENT}/clusters"))
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.json::<Value>().unwrap(), json!([]));
    }

    #[tokio::test]
    async fn members_require_existing_intent() {
        let backend = MemoryBackend::new();
        backend.seed(CA_CERTS, json!([]));

        let resp = backend
            .create(
                Upstream::CertService,
                &format!("{INTENT}/clusters"),
                &json!({"metadata": {"name": "c1"}}),
            )
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let backend = with_intent().await;
        let resp = backend
            .create(
                Upstream::CertService,
                CA_CERTS,
                &json!({"metadata": {"name": "cp1-certintent1"}}),
            )
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn delete_cascades_and_then_reports_not_found() {
        let backend = with_intent().await;
        backend
            .create(
                Upstream::CertService,
                &format!("{INTENT}/clusters"),
                &json!({"metadata": {"name": "c1"}}),
            )
            .await
            .unwrap();

        let resp = backend.delete(Upstream::CertService, INTENT).await.unwrap();
        assert_eq!(resp.status, StatusCode::NO_CONTENT);
        assert!(backend.document(&format!("{INTENT}/clusters/c1")).is_none());

        let resp = backend.read(Upstream::CertService, INTENT).await.unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);

        let resp = backend.delete(Upstream::CertService, INTENT).await.unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn phase_actions_build_a_gap_free_log() {
        let backend = with_intent().await;
        let enrollment = format!("{INTENT}/enrollment");

        for action in ["instantiate", "terminate", "instantiate"] {
            let resp = backend
                .create(
                    Upstream::CertService,
                    &format!("{enrollment}/{action}"),
                    &Value::Null,
                )
                .await
                .unwrap();
            assert_eq!(resp.status, StatusCode::ACCEPTED);
        }

        let status: CertStatus = backend
            .read(Upstream::CertService, &format!("{enrollment}/status"))
            .await
            .unwrap()
            .json()
            .unwrap();

        assert_eq!(status.states.actions.len(), 3);
        assert_eq!(status.states.actions[2].revision, 2);
        assert_eq!(status.states.actions[0].instance, "cp1-certintent1");
        assert!(status.is_instantiated());
        assert!(status.ready_status.is_ready());
    }

    #[tokio::test]
    async fn terminate_without_instantiate_conflicts() {
        let backend = with_intent().await;
        let resp = backend
            .create(
                Upstream::CertService,
                &format!("{INTENT}/distribution/terminate"),
                &Value::Null,
            )
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn status_of_missing_intent_is_not_found() {
        let backend = MemoryBackend::new();
        let resp = backend
            .read(Upstream::CertService, &format!("{INTENT}/enrollment/status"))
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
    }
}
