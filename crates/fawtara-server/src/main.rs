use anyhow::Context;
use fawtara::PortalClient;
use fawtara_server::{AppState, router};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let portal = PortalClient::new().context("Failed to build portal client")?;
    let state = AppState::new(portal);

    let address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.into());
    let listener = tokio::net::TcpListener::bind(&address).await?;

    log::info!("Starting fawtara server on address: {}", address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
