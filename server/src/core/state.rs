//! Server state
//!
//! Shared handle every request handler and background task clones: the
//! configuration, the SQLite pool, and the webhook notifier. Arc-backed
//! fields make cloning cheap.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::core::Config;
use crate::db::DbService;
use crate::services::Notifier;

#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub db: DbService,
    pub notifier: Notifier,
}

impl ServerState {
    /// Open the database, run migrations, build the notifier
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        let db = DbService::new(&config.database_path).await?;
        let notifier = Notifier::new(config.notify_webhook_url.clone());
        Ok(Self {
            config: Arc::new(config.clone()),
            db,
            notifier,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }
}
