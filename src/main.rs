use anyhow::Result;
use occupancy_relay::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let app_config = config::AppConfig::load_or_default()?;
    let history = history_repo::open(&app_config.history).await?;
    let sync = Arc::new(sync_service::SyncService::new(
        history,
        app_config.history.query_limits(),
    ));

    if app_config.history.restore_on_start
        && let Err(e) = sync.restore_from_history().await
    {
        tracing::warn!(
            error = %e,
            operation = "restore_from_history",
            "starting with zeroed counters"
        );
    }

    let app = routes::app(sync);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal())
        .await?;

    Ok(())
}
