use certmesh_common::{
    params::{CreateCaRequestParams, Phase, PhaseAction, UpdateMembersParams},
    views::{
        ApiEnvelope, CaCert, CaRequestCreated, CertStatus, IssuingCluster, MemberList,
        ReconcileResult,
    },
};
use reqwest::{Client, Method};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("API returned {status}: {}", .errors.join(": "))]
    ApiError { status: u16, errors: Vec<String> },

    #[error("API returned {status} without data")]
    EmptyResponse { status: u16 },

    #[error("Request failed: {0}")]
    ReqwestError(#[from] reqwest::Error),
}

/// What a `caRequest` is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    ClusterProvider(String),
    Project(String),
}

impl Target {
    fn base(&self) -> String {
        match self {
            Target::ClusterProvider(cp) => format!("/cluster-provider/{cp}/caRequest"),
            Target::Project(project) => format!("/projects/{project}/caRequest"),
        }
    }

    fn members(&self) -> String {
        match self {
            Target::ClusterProvider(_) => format!("{}/clusters", self.base()),
            Target::Project(_) => format!("{}/logical-clouds", self.base()),
        }
    }
}

pub struct ApiClient {
    api_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(api_url: String) -> Result<Self, ApiClientError> {
        let client = Client::builder()
            .user_agent(format!("certmeshctl/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { api_url, client })
    }

    async fn send<TBody, TResult>(
        &self,
        method: Method,
        path: &str,
        body: Option<&TBody>,
    ) -> Result<TResult, ApiClientError>
    where
        TBody: Serialize,
        TResult: DeserializeOwned,
    {
        let url = format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        let mut req = self.client.request(method, &url);
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().await?;
        let status = response.status().as_u16();
        let envelope = response.json::<ApiEnvelope<TResult>>().await?;

        if !envelope.is_success {
            return Err(ApiClientError::ApiError {
                status,
                errors: envelope.errors,
            });
        }
        envelope
            .data
            .ok_or(ApiClientError::EmptyResponse { status })
    }

    pub async fn create(
        &self,
        target: &Target,
        members: Vec<String>,
        issuing_cluster: IssuingCluster,
    ) -> Result<CaRequestCreated, ApiClientError> {
        let params = CreateCaRequestParams {
            members,
            issuing_cluster,
        };
        self.send(Method::POST, &target.base(), Some(&params)).await
    }

    pub async fn get(&self, target: &Target) -> Result<CaCert, ApiClientError> {
        self.send::<(), _>(Method::GET, &target.base(), None).await
    }

    pub async fn delete(&self, target: &Target) -> Result<String, ApiClientError> {
        self.send::<(), _>(Method::DELETE, &target.base(), None)
            .await
    }

    pub async fn members(&self, target: &Target) -> Result<MemberList, ApiClientError> {
        self.send::<(), _>(Method::GET, &target.members(), None)
            .await
    }

    pub async fn set_members(
        &self,
        target: &Target,
        members: Vec<String>,
    ) -> Result<ReconcileResult, ApiClientError> {
        let params = UpdateMembersParams { members };
        self.send(Method::PUT, &target.members(), Some(&params))
            .await
    }

    pub async fn phase_action(
        &self,
        target: &Target,
        phase: Phase,
        action: PhaseAction,
    ) -> Result<String, ApiClientError> {
        let path = format!("{}/{phase}/{action}", target.base());
        self.send::<(), _>(Method::POST, &path, None).await
    }

    pub async fn phase_status(
        &self,
        target: &Target,
        phase: Phase,
    ) -> Result<CertStatus, ApiClientError> {
        let path = format!("{}/{phase}/status", target.base());
        self.send::<(), _>(Method::GET, &path, None).await
    }
}

#[cfg(test)]
mod tests {
    use httptest::{Expectation, Server, matchers::*, responders::*};
    use serde_json::json;

    use super::*;

    fn client(server: &Server) -> ApiClient {
        ApiClient::new(server.url_str("/")).unwrap()
    }

    #[tokio::test]
    async fn create_posts_members_and_issuer() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/cluster-provider/cp1/caRequest"),
                request::body(json_decoded(eq(json!({
                    "members": ["c1", "c2"],
                    "issuingCluster": {"cluster": "hub", "clusterProvider": "cp1"}
                })))),
            ])
            .respond_with(status_code(201).body(
                json!({
                    "data": {"intent": "cp1-certintent1", "members": ["c1", "c2"]},
                    "errors": [],
                    "Error": null,
                    "isSuccess": true,
                    "statusCode": 201
                })
                .to_string(),
            )),
        );

        let created = client(&server)
            .create(
                &Target::ClusterProvider("cp1".into()),
                vec!["c1".into(), "c2".into()],
                IssuingCluster {
                    cluster: "hub".into(),
                    cluster_provider: "cp1".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(created.intent, "cp1-certintent1");
        assert_eq!(created.members, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn failure_envelope_becomes_api_error() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path(
                "PUT",
                "/projects/p1/caRequest/logical-clouds",
            ))
            .respond_with(status_code(400).body(
                json!({
                    "data": null,
                    "errors": ["unknown logical-clouds lc9 in project p1"],
                    "Error": "unknown logical-clouds lc9 in project p1",
                    "isSuccess": false,
                    "statusCode": 400
                })
                .to_string(),
            )),
        );

        let err = client(&server)
            .set_members(&Target::Project("p1".into()), vec!["lc9".into()])
            .await
            .unwrap_err();

        match err {
            ApiClientError::ApiError { status, errors } => {
                assert_eq!(status, 400);
                assert!(errors[0].contains("lc9"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn phase_routes_are_addressed_by_name() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path(
                "POST",
                "/cluster-provider/cp1/caRequest/distribution/terminate",
            ))
            .respond_with(status_code(202).body(
                json!({
                    "data": "distribution terminate accepted",
                    "errors": [],
                    "isSuccess": true,
                    "statusCode": 202
                })
                .to_string(),
            )),
        );

        let message = client(&server)
            .phase_action(
                &Target::ClusterProvider("cp1".into()),
                Phase::Distribution,
                PhaseAction::Terminate,
            )
            .await
            .unwrap();
        assert_eq!(message, "distribution terminate accepted");
    }
}
