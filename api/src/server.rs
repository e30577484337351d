use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info_span;
use utoipa::openapi::{Info, License, OpenApi, RefOr, Response, path::Operation};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    backend::{self, Backend},
    config::CertmeshApiConfig,
    context::ApiContext,
    handlers::{self, cluster_providers, projects},
};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the router and OpenAPI document, with the backend selected by
/// `cfg`.
pub async fn make(cfg: CertmeshApiConfig) -> anyhow::Result<(Router, OpenApi)> {
    let backend = backend::from_config(&cfg)?;
    make_with_backend(cfg, backend)
}

pub fn make_with_backend(
    cfg: CertmeshApiConfig,
    backend: Arc<dyn Backend>,
) -> anyhow::Result<(Router, OpenApi)> {
    let allowed_origin = cfg
        .public_url
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid public URL {:?}", cfg.public_url))?;

    let context = ApiContext::new(cfg, backend);

    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                let span = info_span!(
                    "http_request",
                    method = req.method().to_string(),
                    request_id = Option::<&str>::None,
                    path = Option::<&str>::None,
                );

                if let Some(request_id) = req
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                {
                    span.record("request_id", request_id);
                }

                if let Some(path) = req.extensions().get::<MatchedPath>() {
                    span.record("path", path.as_str())
                } else {
                    span.record("path", req.uri().path())
                };

                span
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_credentials(true)
                .allow_origin(allowed_origin),
        )
        .layer(PropagateRequestIdLayer::new(x_request_id));

    let openapi = OpenApi::builder()
        .info(
            Info::builder()
                .title("certmesh API Reference")
                .description(Some(
                    "Requests CA certificates for cluster-providers and projects and \
                     keeps their member lists in line.",
                ))
                .version(env!("CARGO_PKG_VERSION"))
                .license(Some(
                    License::builder()
                        .name("Apache 2.0 License")
                        .identifier(Some(env!("CARGO_PKG_LICENSE")))
                        .build(),
                )),
        )
        .build();

    let (router, mut api) = OpenApiRouter::with_openapi(openapi)
        .routes(routes!(handlers::health_check))
        .routes(routes!(
            cluster_providers::create_ca_request,
            cluster_providers::get_ca_request,
            cluster_providers::delete_ca_request
        ))
        .routes(routes!(
            cluster_providers::list_clusters,
            cluster_providers::update_clusters
        ))
        .routes(routes!(cluster_providers::instantiate_phase))
        .routes(routes!(cluster_providers::terminate_phase))
        .routes(routes!(cluster_providers::phase_status))
        .routes(routes!(
            projects::create_ca_request,
            projects::get_ca_request,
            projects::delete_ca_request
        ))
        .routes(routes!(
            projects::list_logical_clouds,
            projects::update_logical_clouds
        ))
        .routes(routes!(projects::instantiate_phase))
        .routes(routes!(projects::terminate_phase))
        .routes(routes!(projects::phase_status))
        .split_for_parts();

    let router = router
        .fallback(handlers::fallback)
        .layer(middleware)
        .with_state(context);

    api.paths.paths.iter_mut().for_each(|(_path, item)| {
        apply_default_errors(&mut item.get);
        apply_default_errors(&mut item.post);
        apply_default_errors(&mut item.put);
        apply_default_errors(&mut item.delete);
    });

    Ok((router, api))
}

/// Every route answers failures with the same envelope; document the
/// statuses that any of them can produce.
fn apply_default_errors(item: &mut Option<Operation>) {
    if let Some(item) = item {
        for (status, summary) in [
            ("400", "Invalid request, or members could not be attached"),
            ("404", "Resource not found upstream"),
            ("500", "Internal server error"),
        ] {
            item.responses
                .responses
                .entry(status.into())
                .or_insert_with(|| RefOr::T(Response::new(summary)));
        }
    }
}
