use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{context::ApiContext, error::ApiError};

pub mod ca_request;
pub mod cluster_providers;
pub mod projects;


#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: &'static str,

    /// Which backend upstream calls go to (`http` or `memory`).
    pub backend: &'static str,
}

#[utoipa::path(
    get,
    path = "/healthz",
    tags = ["health"],
    responses((status = 200, description = "Service is up", body = HealthStatus))
)]
pub async fn health_check(State(ctx): State<ApiContext>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "Healthy",
        backend: ctx.config.backend.as_str(),
    })
}

/// Any route not served by this API.
pub async fn fallback() -> ApiError {
    ApiError::not_found()
}
