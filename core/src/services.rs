//! Construction of the long-lived services the host application shares.
//!
//! Everything is built once at startup and handed out by reference; there
//! are no global accessors.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::agents::{AiOrchestrator, FallbackExecutor, GatewayConfig, ProviderResolver};
use crate::db::{init_db, DbPool};
use crate::logging::DbEventLog;
use crate::model_manager::ModelManager;
use crate::settings::SqliteSettings;

#[derive(Clone)]
pub struct AppServices {
    pub db: DbPool,
    pub events: Arc<DbEventLog>,
    pub settings: Arc<SqliteSettings>,
    pub model_manager: Arc<ModelManager>,
}

impl AppServices {
    /// Open the workspace database and wire the gateway from the process
    /// environment.
    pub fn init(workspace_dir: PathBuf) -> Result<Self> {
        Self::with_config(workspace_dir, GatewayConfig::from_env())
    }

    pub fn with_config(workspace_dir: PathBuf, config: GatewayConfig) -> Result<Self> {
        let db = init_db(workspace_dir).context("failed to initialise workspace database")?;
        let events = Arc::new(DbEventLog::new(db.clone()));
        let settings = Arc::new(SqliteSettings::new(db.clone()));

        if config.providers.is_empty() {
            log::warn!("no AI providers enabled; completions will fail until one is configured");
        }

        let resolver = ProviderResolver::new(settings.clone(), Arc::new(config), events.clone());
        let executor = FallbackExecutor::new(resolver, events.clone());
        let orchestrator =
            AiOrchestrator::new().context("failed to initialise AI orchestrator")?;
        let model_manager = ModelManager::new(executor, Arc::new(orchestrator));

        Ok(Self {
            db,
            events,
            settings,
            model_manager,
        })
    }
}
