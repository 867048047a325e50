use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use innkeep::api::{AppState, build_router};
use innkeep::config::Config;
use innkeep::engine::Engine;
use innkeep::rooms::InMemoryRooms;
use innkeep::sweeper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    innkeep::observability::init(config.metrics_port)?;

    // Ensure data directory exists
    std::fs::create_dir_all(&config.data_dir)?;

    let rooms = match &config.rooms_file {
        Some(path) => InMemoryRooms::load_json(path)?,
        None => InMemoryRooms::new(),
    };
    if rooms.is_empty() {
        tracing::warn!("no rooms loaded; set INNKEEP_ROOMS_FILE or every booking will 404");
    }
    let room_count = rooms.len();

    let engine = Arc::new(Engine::new(
        config.wal_path(),
        Arc::new(rooms),
        config.occupancy,
    )?);

    if !config.sweep_interval.is_zero() {
        tokio::spawn(sweeper::run_sweeper(engine.clone(), config.sweep_interval));
    }
    tokio::spawn(sweeper::run_compactor(engine.clone(), config.compact_threshold));

    let app = build_router(AppState { engine });

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("innkeep listening on {addr}");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  rooms: {room_count}");
    info!("  occupancy: {:?}", config.occupancy);
    info!(
        "  sweep: {}",
        if config.sweep_interval.is_zero() {
            "disabled".to_string()
        } else {
            format!("every {}s", config.sweep_interval.as_secs())
        }
    );
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    // Graceful shutdown: stop accepting on SIGTERM/ctrl-c, let in-flight requests finish
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("innkeep stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("failed to register SIGTERM handler: {e}");
                    ctrl_c.await.ok();
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    info!("shutdown signal received, draining requests");
}
