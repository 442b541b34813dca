//! # PerkHub Portal API
//!
//! JSON HTTP server for the rewards portal.
//!
//! ```text
//! Browser ───► axum (3000) ───► services ───► SQLite
//!                                   │
//!                                   ▼
//!                                 SMTP
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use perkhub_api::config::PortalConfig;
use perkhub_api::mail::{LogMailer, Mailer, SmtpMailer};
use perkhub_api::AppState;
use perkhub_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,perkhub_api=debug,perkhub_db=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting PerkHub portal API...");

    let config = PortalConfig::load().context("loading configuration")?;
    info!(
        addr = %config.listen_addr(),
        database = %config.database_path,
        smtp = config.smtp.is_some(),
        "Configuration loaded"
    );

    if let Some(parent) = Path::new(&config.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.database_max_connections),
    )
    .await
    .context("opening database")?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => match SmtpMailer::new(smtp) {
            Ok(mailer) => {
                info!(host = %smtp.host, port = smtp.port, "SMTP transport ready");
                Arc::new(mailer)
            }
            Err(e) => {
                warn!(error = %e, "SMTP misconfigured, emails will only be logged");
                Arc::new(LogMailer)
            }
        },
        None => {
            warn!("No SMTP configured, emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let addr = config.listen_addr();
    let state = Arc::new(AppState::new(db.clone(), config, mailer));
    let app = perkhub_api::router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
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
