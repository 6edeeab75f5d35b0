use anyhow::Context;

use warden_api::app::{AppServices, build_app};
use warden_infra::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warden_observability::init();

    let config = Config::from_env()?;
    tracing::info!(?config, "configuration loaded");

    let services = AppServices::from_config(&config).await?;
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
