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
    path = "/projects/{project}/caRequest",
    tags = ["projects"],
    params(("project" = String, Path, description = "Project name")),
    request_body(content = CreateCaRequestParams, content_type = "application/json"),
    responses(
        (status = 201, description = "CA intent created and instantiated", body = ApiEnvelope<CaRequestCreated>),
        (status = 400, description = "Unknown logical cloud, or logical clouds could not be attached")
    )
)]
pub async fn create_ca_request(
    State(ctx): State<ApiContext>,
    Path(project): Path<String>,
    body: Result<Json<CreateCaRequestParams>, JsonRejection>,
) -> Result<Envelope<CaRequestCreated>, ApiError> {
    ca_request::create(&ctx, Scope::project(project)?, body).await
}

#[utoipa::path(
    get,
    path = "/projects/{project}/caRequest",
    tags = ["projects"],
    params(("project" = String, Path, description = "Project name")),
    responses(
        (status = 200, description = "The project's CA intent", body = ApiEnvelope<CaCert>),
        (status = 404, description = "No CA intent requested")
    )
)]
pub async fn get_ca_request(
    State(ctx): State<ApiContext>,
    Path(project): Path<String>,
) -> Result<Envelope<CaCert>, ApiError> {
    ca_request::get(&ctx, Scope::project(project)?).await
}

#[utoipa::path(
    delete,
    path = "/projects/{project}/caRequest",
    tags = ["projects"],
    params(("project" = String, Path, description = "Project name")),
    responses((status = 200, description = "CA intent terminated and deleted", body = ApiEnvelope<String>))
)]
pub async fn delete_ca_request(
    State(ctx): State<ApiContext>,
    Path(project): Path<String>,
) -> Result<Envelope<String>, ApiError> {
    ca_request::delete(&ctx, Scope::project(project)?).await
}

#[utoipa::path(
    get,
    path = "/projects/{project}/caRequest/logical-clouds",
    tags = ["projects"],
    params(("project" = String, Path, description = "Project name")),
    responses((status = 200, description = "Logical clouds attached to the CA intent", body = ApiEnvelope<MemberList>))
)]
pub async fn list_logical_clouds(
    State(ctx): State<ApiContext>,
    Path(project): Path<String>,
) -> Result<Envelope<MemberList>, ApiError> {
    ca_request::members(&ctx, Scope::project(project)?).await
}

#[utoipa::path(
    put,
    path = "/projects/{project}/caRequest/logical-clouds",
    tags = ["projects"],
    params(("project" = String, Path, description = "Project name")),
    request_body(content = UpdateMembersParams, content_type = "application/json"),
    responses((status = 200, description = "Attached logical clouds reconciled", body = ApiEnvelope<ReconcileResult>))
)]
pub async fn update_logical_clouds(
    State(ctx): State<ApiContext>,
    Path(project): Path<String>,
    body: Result<Json<UpdateMembersParams>, JsonRejection>,
) -> Result<Envelope<ReconcileResult>, ApiError> {
    ca_request::update_members(&ctx, Scope::project(project)?, body).await
}

#[utoipa::path(
    post,
    path = "/projects/{project}/caRequest/{phase}/instantiate",
    tags = ["projects"],
    params(
        ("project" = String, Path, description = "Project name"),
        ("phase" = Phase, Path, description = "Phase to instantiate")
    ),
    responses((status = 202, description = "Instantiate accepted", body = ApiEnvelope<String>))
)]
pub async fn instantiate_phase(
    State(ctx): State<ApiContext>,
    path: Result<Path<(String, Phase)>, PathRejection>,
) -> Result<Envelope<String>, ApiError> {
    let Path((project, phase)) = path?;
    let scope = Scope::project(project)?;
    ca_request::run_phase(&ctx, scope, phase, PhaseAction::Instantiate).await
}

#[utoipa::path(
    post,
    path = "/projects/{project}/caRequest/{phase}/terminate",
    tags = ["projects"],
    params(
        ("project" = String, Path, description = "Project name"),
        ("phase" = Phase, Path, description = "Phase to terminate")
    ),
    responses((status = 202, description = "Terminate accepted", body = ApiEnvelope<String>))
)]
pub async fn terminate_phase(
    State(ctx): State<ApiContext>,
    path: Result<Path<(String, Phase)>, PathRejection>,
) -> Result<Envelope<String>, ApiError> {
    let Path((project, phase)) = path?;
    let scope = Scope::project(project)?;
    ca_request::run_phase(&ctx, scope, phase, PhaseAction::Terminate).await
}

#[utoipa::path(
    get,
    path = "/projects/{project}/caRequest/{phase}/status",
    tags = ["projects"],
    params(
        ("project" = String, Path, description = "Project name"),
        ("phase" = Phase, Path, description = "Phase to report on")
    ),
    responses((status = 200, description = "Phase status", body = ApiEnvelope<CertStatus>))
)]
pub async fn phase_status(
    State(ctx): State<ApiContext>,
    path: Result<Path<(String, Phase)>, PathRejection>,
) -> Result<Envelope<CertStatus>, ApiError> {
    let Path((project, phase)) = path?;
    ca_request::status(&ctx, Scope::project(project)?, phase).await
}
