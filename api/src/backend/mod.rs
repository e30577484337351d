//! Access to the upstream services the orchestrator drives.
//!
//! Every upstream call goes through [`Backend`], a four-verb capability
//! interface addressed by an [`Upstream`] and a path. The implementation is
//! chosen once at startup (see [`from_config`]) and shared through the API
//! context:
//!
//! - [`HttpBackend`] talks to the real certificate service and member
//!   registries.
//! - [`MemoryBackend`] emulates them in-process, for local development and
//!   tests.

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::config::{BackendKind, CertmeshApiConfig};

mod http_backend;
pub use http_backend::HttpBackend;

mod memory;
pub use memory::MemoryBackend;

/// The upstream service a call is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    /// Owns CA intents, their members and their phase status.
    CertService,

    /// Source of the clusters under a cluster-provider.
    ClusterRegistry,

    /// Source of the logical clouds under a project.
    LogicalCloudRegistry,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::CertService => "cert-service",
            Upstream::ClusterRegistry => "cluster-registry",
            Upstream::LogicalCloudRegistry => "logical-cloud-registry",
        }
    }
}

/// Status code and raw body of an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RemoteResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, Vec::new())
    }

    pub fn json_value(status: StatusCode, value: &Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).trim().to_string()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Create/read/update/delete over the upstream services.
///
/// Implementations report every upstream answer, including non-2xx ones, as
/// a [`RemoteResponse`]; an `Err` means the call never produced an answer.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn create(
        &self,
        upstream: Upstream,
        path: &str,
        body: &Value,
    ) -> Result<RemoteResponse, BackendError>;

    async fn read(&self, upstream: Upstream, path: &str) -> Result<RemoteResponse, BackendError>;

    async fn update(
        &self,
        upstream: Upstream,
        path: &str,
        body: &Value,
    ) -> Result<RemoteResponse, BackendError>;

    async fn delete(&self, upstream: Upstream, path: &str)
    -> Result<RemoteResponse, BackendError>;
}

/// Build the backend selected by the configuration.
pub fn from_config(cfg: &CertmeshApiConfig) -> anyhow::Result<Arc<dyn Backend>> {
    match cfg.backend {
        BackendKind::Http => {
            info!(
                cert_service = %cfg.cert_service_url,
                cluster_registry = %cfg.cluster_registry_url,
                logical_cloud_registry = %cfg.logical_cloud_registry_url,
                "Using HTTP backend"
            );
            Ok(Arc::new(HttpBackend::new(cfg)?))
        }
        BackendKind::Memory => {
            let backend = match &cfg.memory_seed_file {
                Some(path) => MemoryBackend::from_seed_file(path)?,
                None => MemoryBackend::new(),
            };
            info!(seed = ?cfg.memory_seed_file, "Using in-memory backend");
            Ok(Arc::new(backend))
        }
    }
}
