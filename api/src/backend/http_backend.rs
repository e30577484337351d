use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use super::{Backend, BackendError, RemoteResponse, Upstream};
use crate::config::CertmeshApiConfig;

/// [`Backend`] speaking HTTP/JSON to the upstream services.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    cert_service_url: String,
    cluster_registry_url: String,
    logical_cloud_registry_url: String,
}

impl HttpBackend {
    pub fn new(cfg: &CertmeshApiConfig) -> Result<Self, BackendError> {
        Self::with_urls(
            cfg.request_timeout(),
            &cfg.cert_service_url,
            &cfg.cluster_registry_url,
            &cfg.logical_cloud_registry_url,
        )
    }

    pub fn with_urls(
        timeout: Duration,
        cert_service_url: &str,
        cluster_registry_url: &str,
        logical_cloud_registry_url: &str,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .user_agent(format!("certmesh-api/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(BackendError::Client)?;

        Ok(Self {
            client,
            cert_service_url: cert_service_url.trim_end_matches('/').to_string(),
            cluster_registry_url: cluster_registry_url.trim_end_matches('/').to_string(),
            logical_cloud_registry_url: logical_cloud_registry_url
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn url(&self, upstream: Upstream, path: &str) -> String {
        let base = match upstream {
            Upstream::CertService => &self.cert_service_url,
            Upstream::ClusterRegistry => &self.cluster_registry_url,
            Upstream::LogicalCloudRegistry => &self.logical_cloud_registry_url,
        };
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    async fn send(&self, url: String, req: RequestBuilder) -> Result<RemoteResponse, BackendError> {
        let response = req
            .send()
            .await
            .map_err(|source| BackendError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| BackendError::Request {
                url: url.clone(),
                source,
            })?;

        debug!(%url, %status, "Upstream responded");
        Ok(RemoteResponse::new(status, body.to_vec()))
    }

    fn with_body(req: RequestBuilder, body: &Value) -> RequestBuilder {
        if body.is_null() {
            req
        } else {
            req.json(body)
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn create(
        &self,
        upstream: Upstream,
        path: &str,
        body: &Value,
    ) -> Result<RemoteResponse, BackendError> {
        let url = self.url(upstream, path);
        let req = Self::with_body(self.client.post(&url), body);
        self.send(url, req).await
    }

    async fn read(&self, upstream: Upstream, path: &str) -> Result<RemoteResponse, BackendError> {
        let url = self.url(upstream, path);
        let req = self.client.get(&url);
        self.send(url, req).await
    }

    async fn update(
        &self,
        upstream: Upstream,
        path: &str,
        body: &Value,
    ) -> Result<RemoteResponse, BackendError> {
        let url = self.url(upstream, path);
        let req = Self::with_body(self.client.put(&url), body);
        self.send(url, req).await
    }

    async fn delete(
        &self,
        upstream: Upstream,
        path: &str,
    ) -> Result<RemoteResponse, BackendError> {
        let url = self.url(upstream, path);
        let req = self.client.delete(&url);
        self.send(url, req).await
    }
}
