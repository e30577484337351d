//! Request handling shared by the cluster-provider and project `caRequest`
//! routes. The route modules only differ in how the [`Scope`] is built.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
};
use certmesh_common::{
    params::{CreateCaRequestParams, Phase, PhaseAction, UpdateMembersParams},
    views::{ApiEnvelope, CaCert, CaRequestCreated, CertStatus, MemberList, ReconcileResult},
};

use crate::{context::ApiContext, error::ApiError, orchestrator::Scope};

pub type Envelope<T> = (StatusCode, Json<ApiEnvelope<T>>);

pub fn respond<T>(status: StatusCode, data: T) -> Envelope<T> {
    (status, Json(ApiEnvelope::success(status.as_u16(), data)))
}

pub async fn create(
    ctx: &ApiContext,
    scope: Scope,
    body: Result<Json<CreateCaRequestParams>, JsonRejection>,
) -> Result<Envelope<CaRequestCreated>, ApiError> {
    let Json(params) = body?;
    let created = ctx
        .orchestrator
        .create(&scope, &params.members, params.issuing_cluster)
        .await?;
    Ok(respond(StatusCode::CREATED, created))
}

pub async fn get(ctx: &ApiContext, scope: Scope) -> Result<Envelope<CaCert>, ApiError> {
    let intent = ctx.orchestrator.get_intent(&scope).await?;
    Ok(respond(StatusCode::OK, intent))
}

pub async fn delete(ctx: &ApiContext, scope: Scope) -> Result<Envelope<String>, ApiError> {
    ctx.orchestrator.delete(&scope).await?;
    Ok(respond(StatusCode::OK, scope.intent_name()))
}

pub async fn members(ctx: &ApiContext, scope: Scope) -> Result<Envelope<MemberList>, ApiError> {
    let members = ctx.orchestrator.current_members(&scope).await?;
    Ok(respond(
        StatusCode::OK,
        MemberList {
            members: members.into_iter().collect(),
        },
    ))
}

pub async fn update_members(
    ctx: &ApiContext,
    scope: Scope,
    body: Result<Json<UpdateMembersParams>, JsonRejection>,
) -> Result<Envelope<ReconcileResult>, ApiError> {
    let Json(params) = body?;
    let result = ctx.orchestrator.update(&scope, &params.members).await?;
    Ok(respond(StatusCode::OK, result))
}

pub async fn run_phase(
    ctx: &ApiContext,
    scope: Scope,
    phase: Phase,
    action: PhaseAction,
) -> Result<Envelope<String>, ApiError> {
    ctx.orchestrator.run_phase(&scope, phase, action).await?;
    Ok(respond(
        StatusCode::ACCEPTED,
        format!("{phase} {action} accepted"),
    ))
}

pub async fn status(
    ctx: &ApiContext,
    scope: Scope,
    phase: Phase,
) -> Result<Envelope<CertStatus>, ApiError> {
    let status = ctx.orchestrator.phase_status(&scope, phase).await?;
    Ok(respond(StatusCode::OK, status))
}
