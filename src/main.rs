use club_ledger::{AppState, Config, load_data, router};
use std::net::SocketAddr;
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    if let Some(parent) = config.data_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    if config.admin_token.is_none() {
        warn!("CLUB_ADMIN_TOKEN is not set; all mutations will be rejected");
    }

    let data = load_data(&config.data_path).await;
    info!(
        members = data.members.len(),
        in_person_days = data.ledger.attendance.len(),
        online_days = data.ledger.online_attendance.len(),
        "loaded {}",
        config.data_path.display()
    );
    let state = AppState::new(config.data_path.clone(), config.admin_token.clone(), data);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
