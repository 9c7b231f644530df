//! Transport-agnostic application state shared by every request handler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::db;
use crate::prediction::{HttpPredictionClient, PredictionClient};

// ═══════════════════════════════════════════════════════════
// Core state
// ═══════════════════════════════════════════════════════════

/// Database location plus the prediction client. Immutable after startup;
/// a fresh SQLite connection is opened per request.
pub struct CoreState {
    db_path: PathBuf,
    prediction: Arc<dyn PredictionClient>,
}

impl CoreState {
    pub fn new(db_path: PathBuf, prediction: Arc<dyn PredictionClient>) -> Self {
        Self { db_path, prediction }
    }

    /// Build state from runtime configuration, using the HTTP prediction client.
    pub fn from_config(config: &Config) -> Self {
        let client = HttpPredictionClient::new(&config.prediction_url, config.prediction_timeout);
        Self::new(config.db_path.clone(), Arc::new(client))
    }

    /// Open a connection to the database, applying pending migrations.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn prediction(&self) -> Arc<dyn PredictionClient> {
        Arc::clone(&self.prediction)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}
