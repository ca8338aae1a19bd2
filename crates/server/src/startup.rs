use std::net::SocketAddr;

use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Host/port from the already normalised configuration
fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    addr.parse().map_err(|_| {
        StartupError::InvalidConfig(configs::ConfigError::Invalid(format!("bad bind address {addr}")))
    })
}

/// Builds the roster store described by `cfg` and the router around it.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let roster = service::bootstrap::build_roster_store(&cfg.store).await?;
    Ok(routes::build_router(AppState::new(roster), build_cors()))
}

/// Public entry: build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;

    let addr = bind_addr(&cfg)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr: addr.to_string(), source })?;
    info!(%addr, "roster server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
