//! `marchesd`: the marches dashboard server.
//!
//! Usage:
//!   marchesd -c <name-or-path> [--listen <addr>]
//!
//! A bare name resolves to `/etc/marches/<name>.toml`.

mod bootstrap;
mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use marches_alert::{AlertModule, SenderRegistry};
use marches_auth::JwtAuth;

use config::ServerConfig;

/// Marches dashboard server.
#[derive(Parser, Debug)]
#[command(name = "marchesd", about = "Marches dashboard server")]
struct Cli {
    /// Config name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address.
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;
    bootstrap::verify_config(&server_config)?;

    let service_config = server_config.service_config(&cli.listen);
    let db = bootstrap::open_database(&service_config)?;

    let mut alert_module = AlertModule::new(db.clone(), server_config.queue.clone())?;
    if server_config.worker.enabled {
        let senders = SenderRegistry::with_defaults(server_config.webhook.timeout())?;
        let simulated = senders.simulated_channels();
        if !simulated.is_empty() {
            let names: Vec<_> = simulated.iter().map(|c| c.as_str()).collect();
            warn!(
                "No provider for {}: deliveries are only logged and recorded as simulated",
                names.join(", ")
            );
        }
        alert_module
            .start_worker(senders, server_config.worker.clone())
            .await;
        info!("Alert worker started");
    } else {
        info!("Alert worker disabled; jobs will only be enqueued");
    }

    let jwt = Arc::new(JwtAuth::new(&server_config.auth.jwt_secret));
    let app = routes::build_router(jwt, &[&alert_module]);

    let listener = tokio::net::TcpListener::bind(&service_config.listen).await?;
    info!("marchesd listening on {}", service_config.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    // The worker finishes the job in flight before the database goes away.
    alert_module.shutdown().await;
    db.close()?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
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
}
