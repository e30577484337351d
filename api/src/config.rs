use std::{net::SocketAddr, path::PathBuf, time::Duration};

use certmesh_common::views::IssuerRef;
use clap::{Parser, ValueEnum};

use crate::orchestrator::ReadinessPoller;

/// Where upstream calls go.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Real certificate service and member registries over HTTP.
    Http,

    /// In-process emulation of the upstream services, for local development.
    Memory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Http => "http",
            BackendKind::Memory => "memory",
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(name = "certmesh-api", version)]
pub struct CertmeshApiConfig {
    #[clap(
        short,
        long,
        env = "CERTMESH_API_BIND_ADDR",
        default_value = "0.0.0.0:4000"
    )]
    pub bind_addr: SocketAddr,

    /// Origin allowed to call the API from a browser.
    #[clap(
        long,
        env = "CERTMESH_API_PUBLIC_URL",
        default_value = "http://localhost:4000"
    )]
    pub public_url: String,

    #[clap(long, default_value_t = false)]
    pub dump_openapi: bool,

    #[clap(long, env = "CERTMESH_API_BACKEND", value_enum, default_value_t = BackendKind::Http)]
    pub backend: BackendKind,

    /// Base URL of the certificate service.
    #[clap(
        long,
        env = "CERTMESH_API_CERT_SERVICE_URL",
        default_value = "http://localhost:9036"
    )]
    pub cert_service_url: String,

    /// Base URL of the cluster registry (source of cluster-provider members).
    #[clap(
        long,
        env = "CERTMESH_API_CLUSTER_REGISTRY_URL",
        default_value = "http://localhost:9061"
    )]
    pub cluster_registry_url: String,

    /// Base URL of the logical-cloud registry (source of project members).
    #[clap(
        long,
        env = "CERTMESH_API_LOGICAL_CLOUD_REGISTRY_URL",
        default_value = "http://localhost:9077"
    )]
    pub logical_cloud_registry_url: String,

    /// Timeout applied to every upstream request, in seconds.
    #[clap(long, env = "CERTMESH_API_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// How many times enrollment readiness is checked before distribution
    /// is started anyway.
    #[clap(long, env = "CERTMESH_API_READINESS_ATTEMPTS", default_value_t = 4)]
    pub readiness_attempts: u32,

    /// Sleep before the first readiness check, in milliseconds.
    #[clap(long, env = "CERTMESH_API_READINESS_BASE_DELAY_MS", default_value_t = 2000)]
    pub readiness_base_delay_ms: u64,

    /// Extra sleep added for every further readiness check, in milliseconds.
    #[clap(long, env = "CERTMESH_API_READINESS_STEP_DELAY_MS", default_value_t = 1000)]
    pub readiness_step_delay_ms: u64,

    #[clap(long, env = "CERTMESH_API_ISSUER_NAME", default_value = "certmesh-root-issuer")]
    pub issuer_name: String,

    #[clap(long, env = "CERTMESH_API_ISSUER_KIND", default_value = "ClusterIssuer")]
    pub issuer_kind: String,

    #[clap(long, env = "CERTMESH_API_ISSUER_GROUP", default_value = "cert-manager.io")]
    pub issuer_group: String,

    /// JSON file of documents to preload into the memory backend.
    ///
    /// The file maps upstream paths to either a single document or an array
    /// of documents to create under that collection, for example:
    /// ```text
    /// { "/v2/cluster-providers/cp1/clusters": [{"metadata": {"name": "c1"}}] }
    /// ```
    ///
    /// Ignored unless `--backend memory` is selected.
    #[clap(long, env = "CERTMESH_API_MEMORY_SEED_FILE")]
    pub memory_seed_file: Option<PathBuf>,
}

impl CertmeshApiConfig {
    pub fn issuer_ref(&self) -> IssuerRef {
        IssuerRef {
            name: self.issuer_name.clone(),
            kind: self.issuer_kind.clone(),
            group: self.issuer_group.clone(),
        }
    }

    pub fn readiness_poller(&self) -> ReadinessPoller {
        ReadinessPoller::new(
            self.readiness_attempts,
            Duration::from_millis(self.readiness_base_delay_ms),
            Duration::from_millis(self.readiness_step_delay_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_readiness_schedule() {
        let cfg = CertmeshApiConfig::parse_from(["certmesh-api"]);

        assert_eq!(cfg.backend, BackendKind::Http);
        assert_eq!(cfg.readiness_attempts, 4);

        let poller = cfg.readiness_poller();
        assert_eq!(poller.delay_before(0), Duration::from_secs(2));
        assert_eq!(poller.delay_before(3), Duration::from_secs(5));
    }

    #[test]
    fn memory_backend_is_selectable() {
        let cfg = CertmeshApiConfig::parse_from(["certmesh-api", "--backend", "memory"]);
        assert_eq!(cfg.backend, BackendKind::Memory);
    }
}
