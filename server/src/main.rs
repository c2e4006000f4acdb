use anyhow::{Context, Result};
use nutrilens_config::{NutrilensConfig, Settings, load_dotenv};
use nutrilens_engine::bootstrap;
use nutrilens_server::{AppState, router};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    // Before tracing, so RUST_LOG from .env applies.
    let dotenv = load_dotenv();
    init_tracing();
    if let Some(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded .env");
    }

    let config = NutrilensConfig::load().context("failed to load configuration")?;
    let settings = Settings::resolve(config);
    let orchestrator = bootstrap::build_orchestrator(&settings);
    let state = AppState::new(orchestrator, settings.default_user_id.as_str());

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        default_user_id = %settings.default_user_id,
        "NutriLens listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Shut down");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
