//! # Kitshop Shop API
//!
//! HTTP server for the storefront and the admin screens.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Shop API Server                                │
//! │                                                                         │
//! │  Storefront / Admin ───► HTTP (3000) ───► Services ───► SQLite         │
//! │                                              ▲                          │
//! │                                              │                          │
//! │                                      BonusScheduler                     │
//! │                                   (process_interval)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kitshop_db::Database;
use shop_api::scheduler::BonusScheduler;
use shop_api::{router, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Kitshop shop API...");

    let config = AppConfig::load()?;
    info!(
        addr = %config.server.bind_address(),
        db = %config.database.path.display(),
        accrual_pct = config.bonus.policy().accrual_rate.percentage(),
        delay_days = config.bonus.delay_days,
        "Configuration loaded"
    );

    let db = Database::new(config.database.db_config()).await?;
    info!("Database ready");

    let state = Arc::new(AppState::new(db, config));

    let scheduler = state.config.bonus.process_interval().map(|period| {
        let (scheduler, handle) = BonusScheduler::new(state.clone(), period);
        (tokio::spawn(scheduler.run()), handle)
    });
    if scheduler.is_none() {
        info!("Bonus scheduler disabled");
    }

    let addr = state.config.server.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Starting HTTP server");

    let served = axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some((task, handle)) = scheduler {
        handle.shutdown().await;
        if let Err(e) = task.await {
            error!(error = %e, "Bonus scheduler task failed");
        }
    }

    state.db.close().await;

    served?;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
