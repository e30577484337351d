use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use certmesh_common::{
    params::{CreateCaRequestParams, Phase, PhaseAction, UpdateMembersParams},
    views::{ApiEnvelope, CaCert, CaRequestCreated, CertStatus, MemberList, ReconcileResult},
};

use super::ca_request::{self, Envelope};
use crate::{context::ApiContext, error::ApiError, orchestrator::Scope};

#[utoipa::path(
    post,
    path = "/cluster-provider/{cluster_provider}/caRequest",
    tags = ["cluster_providers"],
    params(("cluster_provider" = String, Path, description = "Cluster-provider name")),
    request_body(content = CreateCaRequestParams, content_type = "application/json"),
    responses(
        (status = 201, description = "CA intent created and instantiated", body = ApiEnvelope<CaRequestCreated>),
        (status = 400, description = "Unknown cluster, or clusters could not be attached")
    )
)]
pub async fn create_ca_request(
    State(ctx): State<ApiContext>,
    Path(cluster_provider): Path<String>,
    body: Result<Json<CreateCaRequestParams>, JsonRejection>,
) -> Result<Envelope<CaRequestCreated>, ApiError> {
    ca_request::create(&ctx, Scope::cluster_provider(cluster_provider)?, body).await
}

#[utoipa::path(
    get,
    path = "/cluster-provider/{cluster_provider}/caRequest",
    tags = ["cluster_providers"],
    params(("cluster_provider" = String, Path, description = "Cluster-provider name")),
    responses(
        (status = 200, description = "The cluster-provider's CA intent", body = ApiEnvelope<CaCert>),
        (status = 404, description = "No CA intent requested")
    )
)]
pub async fn get_ca_request(
    State(ctx): State<ApiContext>,
    Path(cluster_provider): Path<String>,
) -> Result<Envelope<CaCert>, ApiError> {
    ca_request::get(&ctx, Scope::cluster_provider(cluster_provider)?).await
}

#[utoipa::path(
    delete,
    path = "/cluster-provider/{cluster_provider}/caRequest",
    tags = ["cluster_providers"],
    params(("cluster_provider" = String, Path, description = "Cluster-provider name")),
    responses((status = 200, description = "CA intent terminated and deleted", body = ApiEnvelope<String>))
)]
pub async fn delete_ca_request(
    State(ctx): State<ApiContext>,
    Path(cluster_provider): Path<String>,
) -> Result<Envelope<String>, ApiError> {
    ca_request::delete(&ctx, Scope::cluster_provider(cluster_provider)?).await
}

#[utoipa::path(
    get,
    path = "/cluster-provider/{cluster_provider}/caRequest/clusters",
    tags = ["cluster_providers"],
    params(("cluster_provider" = String, Path, description = "Cluster-provider name")),
    responses((status = 200, description = "Clusters attached to the CA intent", body = ApiEnvelope<MemberList>))
)]
pub async fn list_clusters(
    State(ctx): State<ApiContext>,
    Path(cluster_provider): Path<String>,
) -> Result<Envelope<MemberList>, ApiError> {
    ca_request::members(&ctx, Scope::cluster_provider(cluster_provider)?).await
}

#[utoipa::path(
    put,
    path = "/cluster-provider/{cluster_provider}/caRequest/clusters",
    tags = ["cluster_providers"],
    params(("cluster_provider" = String, Path, description = "Cluster-provider name")),
    request_body(content = UpdateMembersParams, content_type = "application/json"),
    responses((status = 200, description = "Attached clusters reconciled", body = ApiEnvelope<ReconcileResult>))
)]
pub async fn update_clusters(
    State(ctx): State<ApiContext>,
    Path(cluster_provider): Path<String>,
    body: Result<Json<UpdateMembersParams>, JsonRejection>,
) -> Result<Envelope<ReconcileResult>, ApiError> {
    ca_request::update_members(&ctx, Scope::cluster_provider(cluster_provider)?, body).await
}

#[utoipa::path(
    post,
    path = "/cluster-provider/{cluster_provider}/caRequest/{phase}/instantiate",
    tags = ["cluster_providers"],
    params(
        ("cluster_provider" = String, Path, description = "Cluster-provider name"),
        ("phase" = Phase, Path, description = "Phase to instantiate")
    ),
    responses((status = 202, description = "Instantiate accepted", body = ApiEnvelope<String>))
)]
pub async fn instantiate_phase(
    State(ctx): State<ApiContext>,
    path: Result<Path<(String, Phase)>, PathRejection>,
) -> Result<Envelope<String>, ApiError> {
    let Path((cluster_provider, phase)) = path?;
    let scope = Scope::cluster_provider(cluster_provider)?;
    ca_request::run_phase(&ctx, scope, phase, PhaseAction::Instantiate).await
}

#[utoipa::path(
    post,
    path = "/cluster-provider/{cluster_provider}/caRequest/{phase}/terminate",
    tags = ["cluster_providers"],
    params(
        ("cluster_provider" = String, Path, description = "Cluster-provider name"),
        ("phase" = Phase, Path, description = "Phase to terminate")
    ),
    responses((status = 202, description = "Terminate accepted", body = ApiEnvelope<String>))
)]
pub async fn terminate_phase(
    State(ctx): State<ApiContext>,
    path: Result<Path<(String, Phase)>, PathRejection>,
) -> Result<Envelope<String>, ApiError> {
    let Path((cluster_provider, phase)) = path?;
    let scope = Scope::cluster_provider(cluster_provider)?;
    ca_request::run_phase(&ctx, scope, phase, PhaseAction::Terminate).await
}

#[utoipa::path(
    get,
    path = "/cluster-provider/{cluster_provider}/caRequest/{phase}/status",
    tags = ["cluster_providers"],
    params(
        ("cluster_provider" = String, Path, description = "Cluster-provider name"),
        ("phase" = Phase, Path, description = "Phase to report on")
    ),
    responses((status = 200, description = "Phase status", body = ApiEnvelope<CertStatus>))
)]
pub async fn phase_status(
    State(ctx): State<ApiContext>,
    path: Result<Path<(String, Phase)>, PathRejection>,
) -> Result<Envelope<CertStatus>, ApiError> {
    let Path((cluster_provider, phase)) = path?;
    ca_request::status(&ctx, Scope::cluster_provider(cluster_provider)?, phase).await
}
