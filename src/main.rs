use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paysync::config::Config;
use paysync::db::{create_pool, init_db, queries, AppState};
use paysync::handlers;
use paysync::models::TierCatalog;
use paysync::payments::CreemClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paysync=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let pool = create_pool(&config.database_path)?;
    {
        let conn = pool.get()?;
        init_db(&conn)?;

        if config.webhook_retention_days > 0 {
            let purged = queries::purge_old_webhook_events(&conn, config.webhook_retention_days)?;
            if purged > 0 {
                info!(purged, "purged expired webhook event records");
            }
        }
    }

    if config.creem_webhook_secret.is_none() {
        warn!("CREEM_WEBHOOK_SECRET not set, inbound webhooks will be rejected");
    }

    let billing = CreemClient::new(
        config.creem_api_key.clone().unwrap_or_default(),
        config.creem_api_base.clone(),
    );

    let state = AppState {
        db: pool,
        tiers: Arc::new(TierCatalog::builtin()),
        billing: Arc::new(billing),
        webhook_secret: config.creem_webhook_secret.as_deref().map(Arc::from),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(handlers::webhooks::router())
        .merge(handlers::subscriptions::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    info!(%addr, "starting paysync");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
