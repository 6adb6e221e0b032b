mod api;
mod middleware;

use anyhow::Context;
use rivalwatch_db::Store;
use rivalwatch_pipeline::Pipeline;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = rivalwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let competitors = rivalwatch_core::load_competitors(&config.competitors_path)
        .with_context(|| format!("failed to load {}", config.competitors_path.display()))?;

    let store = Store::connect(&config).await;
    if store.is_persistent() {
        if let Err(e) = store.seed_competitors(&competitors.competitors).await {
            tracing::warn!(error = %e, "failed to seed competitors at startup");
        }
    }
    let pipeline = Pipeline::from_app_config(&config, store).await?;

    tracing::info!(
        env = %config.env,
        store = pipeline.store().backend(),
        competitors = competitors.competitors.len(),
        "starting server"
    );
    let app = build_app(AppState::new(pipeline, competitors));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
