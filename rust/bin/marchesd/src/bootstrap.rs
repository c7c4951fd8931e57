//! Bootstrap: startup checks and storage initialisation.

use std::sync::Arc;

use tracing::info;

use marches_core::ServiceConfig;
use marches_sql::SqliteStore;

use crate::config::ServerConfig;

/// Refuse to start on a configuration that cannot work.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.auth.jwt_secret.is_empty() {
        anyhow::bail!("JWT secret is empty in configuration.");
    }
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    if config.queue.name.trim().is_empty() {
        anyhow::bail!("Queue name is empty in configuration.");
    }
    Ok(())
}

/// Create the data directory and open the SQLite database.
pub fn open_database(service: &ServiceConfig) -> anyhow::Result<Arc<SqliteStore>> {
    if let Some(dir) = &service.data_dir {
        std::fs::create_dir_all(dir)?;
    }
    let path = service.resolve_sqlite_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let db = SqliteStore::open(&path)
        .map_err(|e| anyhow::anyhow!("failed to open SQL store {}: {e}", path.display()))?;
    info!("SQL store opened at {}", path.display());
    Ok(Arc::new(db))
}
