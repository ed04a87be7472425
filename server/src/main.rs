//! API template server.
//!
//! Reads `.env`, applies pending migrations, then serves until Ctrl+C or SIGTERM.

use api_template::migration;
use api_template::telemetry::init_tracing;
use api_template::{app_router, AppState, DatabaseSessionManager, Settings};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;
    init_tracing(&settings.log);

    let db = &settings.database;
    let sessions = Arc::new(
        DatabaseSessionManager::new()
            .with_search_path(db.schema.clone())
            .with_acquire_timeout(db.acquire_timeout),
    );
    sessions.init(&db.url, db.max_pool_size)?;
    migration::upgrade(&sessions, &db.schema).await?;

    let addr = settings.bind_addr();
    let state = AppState::new(settings, sessions.clone())?;
    let app = app_router(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(err) = sessions.close().await {
        tracing::warn!(error = %err, "closing database sessions");
    }
    served?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
