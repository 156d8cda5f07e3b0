//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod channels;
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
#[cfg(test)]
mod test_support;

use crate::config::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .compact()
        .init();

    // Si la configuración falla, la aplicación no debe iniciar
    let config = AppConfig::from_env()?;
    let pool = AppState::connect(&config).await?;

    // Aplica las migraciones de SQLx al iniciar
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("✅ Migraciones de la base de datos ejecutadas con éxito!");

    let addr = config.bind_addr();
    let app_state = AppState::from_pool(config, pool)?;
    let app = routes::build_router(app_state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Servidor escuchando en {}", listener.local_addr()?);
    tracing::info!("📚 Documentación en http://{}/swagger-ui", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
