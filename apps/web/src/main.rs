//! # Parking Web Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Browser / API client ───► HTTP (3000) ───► Handlers ───► SQLite        │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │                                           SessionLedger                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use park_core::SystemClock;
use park_db::Database;
use park_web::auth::ensure_staff_accounts;
use park_web::{build_router, AppState, WebConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting parking web server...");

    // Load configuration
    let config = WebConfig::load().context("Failed to load configuration")?;
    info!(
        port = config.http_port,
        db_path = %config.db_path.display(),
        hourly_rate = %config.hourly_rate,
        rounding = %config.fee_rounding,
        "Configuration loaded"
    );

    // Connect to database (runs migrations)
    let db = Database::new(config.db_config())
        .await
        .context("Failed to open database")?;
    info!("Database ready");

    ensure_staff_accounts(&db, &config)
        .await
        .context("Failed to bootstrap staff accounts")?;

    let addr = config.listen_addr()?;
    let state = Arc::new(AppState::new(db, config, Arc::new(SystemClock)));

    let report = state.ledger.check_consistency().await?;
    if !report.is_consistent() {
        warn!(
            violations = report.violations.len(),
            corrupt = report.corrupt_sessions.len(),
            "Occupancy ledger is inconsistent at startup"
        );
    }

    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Installs the tracing subscriber. `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,park=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
