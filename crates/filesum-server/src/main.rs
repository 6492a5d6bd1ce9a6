use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use filesum_server::config::Settings;
use filesum_server::handlers::build_router;
use filesum_server::services::{LlmService, SummaryController, SystemClock};
use filesum_server::state::AppState;
use filesum_server::utils::logger::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    // Keep the guard alive so buffered file logs get flushed on exit
    let _log_guard = init_logger()?;

    info!("🚀 Starting file summary server...");

    // Missing credentials are fatal
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    let llm_service = Arc::new(LlmService::new(settings.llm.clone())?);
    let controller = SummaryController::new(&settings, llm_service, Arc::new(SystemClock));
    info!(
        "✅ Summary flow ready (mode: {:?}, trigger: {:?} \"{}\")",
        settings.summary.mode, settings.summary.trigger_match, settings.summary.trigger_keyword
    );

    if settings.cache.sweep_interval_seconds > 0 {
        controller.spawn_sweeper(Duration::from_secs(settings.cache.sweep_interval_seconds));
        info!(
            "✅ Cache sweeper started (every {}s)",
            settings.cache.sweep_interval_seconds
        );
    }

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    let state = Arc::new(AppState::new(settings, controller));
    let app = build_router(state);

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
