use std::net::SocketAddr;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use site_provisioner::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env().expect("Failed to load configuration");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.log_level)
        }))
        .init();

    tracing::info!("Starting site provisioner");

    let store = site_provisioner::db::connect(&config.database_url, config.max_connections)
        .await
        .expect("Failed to connect to database");

    tracing::info!(
        "Connected to {} database (table prefix {})",
        store.dialect(),
        config.table_prefix
    );

    let addr = SocketAddr::new(config.host, config.port);
    let state = site_provisioner::build_state(store, config);

    // Catch up on sites created while nothing was listening
    if !state.config.repair_sites.is_empty() {
        let reports = state.provisioner.repair(&state.config.repair_sites).await?;
        let created: usize = reports.iter().map(|r| r.created()).sum();
        tracing::info!(
            "Repaired {} site(s), {created} table(s) created",
            reports.len()
        );
    }

    let app = site_provisioner::build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
