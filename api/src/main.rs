use anyhow::Context;
use certmesh_api::{config::CertmeshApiConfig, server};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CertmeshApiConfig::parse();

    if !config.dump_openapi {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or("certmesh_api=info,certmesh_common=info".into()),
            )
            .pretty()
            .init();
    }

    let (router, api) = server::make(config.clone()).await?;

    if config.dump_openapi {
        let json = api
            .to_pretty_json()
            .context("Failed to render OpenAPI document")?;
        print!("{}", json);
        return Ok(());
    }

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("Listening on http://{:?}", config.bind_addr);

    axum::serve(listener, router)
        .await
        .context("Failed to start server")
}
