use dinnerdecider_api::api::{create_router, AppState};
use dinnerdecider_api::config::Config;
use dinnerdecider_api::db::KvStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dinnerdecider_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let (kv, writer) = KvStore::open(&config.redis_url)?;

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, kv);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "DinnerDecider API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    // Flush any queued background writes before exiting
    writer.shutdown().await;
    Ok(())
}
