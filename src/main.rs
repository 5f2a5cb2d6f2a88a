use hotelier::{
    config::{AppConfig, create_app_with_key},
    state::{build_pool, run_migrations},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hotelier=debug")),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!("database = {}", config.database_url);

    let pool =
        build_pool(&config.database_url, config.effective_pool_size())?;
    run_migrations(&pool)?;

    let app = create_app_with_key(pool, config.key()?);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| format!("could not bind {}: {e}", config.bind_addr))?;
    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("server error: {e}"))
}
