//! Medicine Inventory - Backend Server
//!
//! Daily stock ledger for a hospital medical store, with automatic
//! rollover shortly after midnight.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use chrono::Local;
use medicine_inventory_backend::{
    create_app,
    services::{DayEndScheduler, SchedulerSettings},
    storage::FileStore,
    AppState, Config, XlsxExporter,
};
use shared::Session;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "medstore_server=debug,medicine_inventory_backend=debug,shared=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Medicine Inventory Server");
    tracing::info!("Environment: {}", config.environment);

    let store = FileStore::open(&config.storage.data_dir, config.storage.quota_bytes)
        .with_context(|| format!("opening data directory {}", config.storage.data_dir.display()))?;
    let mut exporter = XlsxExporter::new(&config.export.output_dir);

    // Catch up a day-end missed while the server was down, then load today
    let today = Local::now().date_naive();
    let mut session = Session::start(store, today, &mut exporter).with_schedule(config.day_end.schedule());
    for notification in session.take_notifications() {
        tracing::info!("{:?}: {}", notification.kind, notification.message);
    }
    tracing::info!(
        "Ledger for {} loaded with {} medicine(s)",
        session.current_date(),
        session.records().len()
    );
    let session = Arc::new(Mutex::new(session));

    let scheduler = DayEndScheduler::spawn(
        Arc::clone(&session),
        exporter.clone(),
        SchedulerSettings::from_config(&config.day_end),
    );

    // Create application state
    let state = AppState {
        session,
        exporter,
        config: Arc::new(config.clone()),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let ip: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("invalid server host {}", config.server.host))?;
    let addr = SocketAddr::from((ip, config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
    tracing::info!("Shutdown signal received");
}
