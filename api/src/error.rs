use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::IntoResponse,
};
use certmesh_common::views::ApiEnvelope;
use thiserror::Error;

use crate::orchestrator::OrchestratorError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    JsonBody(#[from] JsonRejection),

    #[error(transparent)]
    Path(#[from] PathRejection),
}

impl ApiError {
    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Orchestrator(e) => e.status_code(),
            Self::JsonBody(rejection) => rejection.status(),
            Self::Path(rejection) => rejection.status(),
        }
    }

    /// This error followed by every error in its source chain.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            messages.push(err.to_string());
            source = err.source();
        }
        messages
    }
}

impl From<ApiError> for ApiEnvelope<()> {
    fn from(err: ApiError) -> Self {
        ApiEnvelope::failure(err.status_code().as_u16(), err.messages())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            tracing::error!("Error returned by handler: {self}");
        } else {
            tracing::warn!("Error returned by handler: {self}");
        }

        (status_code, Json(Into::<ApiEnvelope<()>>::into(self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RemoteResponse;

    #[test]
    fn partial_failure_lists_its_cause() {
        let cause = OrchestratorError::upstream(
            "attach c2",
            &RemoteResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "store unavailable"),
        );
        let err = ApiError::from(OrchestratorError::partial_failure(
            "failed to attach clusters",
            cause,
        ));

        let envelope: ApiEnvelope<()> = err.into();
        assert_eq!(envelope.status_code, 400);
        assert_eq!(envelope.error.as_deref(), Some("failed to attach clusters"));
        assert_eq!(
            envelope.errors[1],
            "attach c2 failed with status 500 Internal Server Error: store unavailable"
        );
    }

    #[test]
    fn upstream_not_found_keeps_status() {
        let err = ApiError::from(OrchestratorError::upstream(
            "read CA intent",
            &RemoteResponse::empty(StatusCode::NOT_FOUND),
        ));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
