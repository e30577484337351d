use http::StatusCode;
use thiserror::Error;

use crate::backend::{BackendError, RemoteResponse};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The request cannot be satisfied as given (bad scope name, unknown
    /// member, ...).
    #[error("{0}")]
    Validation(String),

    /// An upstream call answered with a non-2xx status.
    #[error("{operation} failed with status {status}: {body}")]
    Upstream {
        operation: String,
        status: StatusCode,
        body: String,
    },

    /// Members could not be attached after the intent was created or while
    /// reconciling. Whatever was created in the same call has already been
    /// rolled back (best effort) when this is returned.
    #[error("{message}")]
    PartialFailure {
        message: String,
        #[source]
        source: Box<OrchestratorError>,
    },

    /// The upstream call produced no answer at all.
    #[error("{operation} failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to decode {operation} response: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },
}

impl OrchestratorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream(operation: impl Into<String>, response: &RemoteResponse) -> Self {
        let body = response.text();
        Self::Upstream {
            operation: operation.into(),
            status: response.status,
            body: if body.is_empty() {
                response
                    .status
                    .canonical_reason()
                    .unwrap_or("no response body")
                    .to_string()
            } else {
                body
            },
        }
    }

    pub fn partial_failure(message: impl Into<String>, source: OrchestratorError) -> Self {
        Self::PartialFailure {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// HTTP status this error should be reported with.
    ///
    /// Upstream 4xx/5xx statuses are passed through; anything else an
    /// upstream might send back as a failure (3xx, 1xx) becomes a 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::PartialFailure { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. }
                if status.is_client_error() || status.is_server_error() =>
            {
                *status
            }
            Self::Upstream { .. } | Self::Transport { .. } | Self::Decode { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Upstream { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_is_passed_through() {
        let resp = RemoteResponse::new(StatusCode::CONFLICT, "intent exists");
        let err = OrchestratorError::upstream("create CA intent", &resp);

        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            err.to_string(),
            "create CA intent failed with status 409 Conflict: intent exists"
        );
    }

    #[test]
    fn empty_upstream_body_falls_back_to_reason() {
        let resp = RemoteResponse::empty(StatusCode::NOT_FOUND);
        let err = OrchestratorError::upstream("read CA intent", &resp);

        assert!(err.is_not_found());
        assert!(err.to_string().ends_with("Not Found"));
    }

    #[test]
    fn redirect_from_upstream_becomes_internal_error() {
        let resp = RemoteResponse::empty(StatusCode::FOUND);
        let err = OrchestratorError::upstream("read CA intent", &resp);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn partial_failure_is_a_bad_request() {
        let cause = OrchestratorError::upstream(
            "attach member c2",
            &RemoteResponse::empty(StatusCode::INTERNAL_SERVER_ERROR),
        );
        let err = OrchestratorError::partial_failure("failed to attach members", cause);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
