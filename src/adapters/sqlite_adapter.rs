//! SQLite strategy store.
//!
//! Each save is one row holding the `{config, metrics, trades}` document as
//! JSON text. Ids are the row's autoincrement key rendered as a string.

use crate::domain::config_validation::SqliteConfig;
use crate::domain::error::StratbenchError;
use crate::domain::persistence::SaveRequest;
use crate::ports::strategy_store_port::StrategyStorePort;
use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};
use serde_json::Value;
use tracing::debug;

#[derive(Clone)]
pub struct SqliteStrategyStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStrategyStore {
    pub fn from_config(config: &SqliteConfig) -> Result<Self, StratbenchError> {
        let manager = SqliteConnectionManager::file(&config.path);
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| StratbenchError::Storage {
                reason: e.to_string(),
            })?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, StratbenchError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| StratbenchError::Storage {
                reason: e.to_string(),
            })?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn initialize_schema(&self) -> Result<(), StratbenchError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| StratbenchError::Storage {
                reason: e.to_string(),
            })?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS strategies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                document TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_strategies_name ON strategies(name);",
        )
        .map_err(|e: rusqlite::Error| StratbenchError::Storage {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    fn insert(&self, request: &SaveRequest) -> Result<String, StratbenchError> {
        let document = serde_json::to_string(&request.stored_document()?)?;
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| StratbenchError::Storage {
                reason: e.to_string(),
            })?;

        conn.execute(
            "INSERT INTO strategies (name, description, document) VALUES (?1, ?2, ?3)",
            params![request.name, request.description, document],
        )
        .map_err(|e: rusqlite::Error| StratbenchError::Storage {
            reason: e.to_string(),
        })?;

        let id = conn.last_insert_rowid().to_string();
        debug!(%id, name = %request.name, "strategy row inserted");
        Ok(id)
    }

    fn fetch(&self, id: &str) -> Result<Value, StratbenchError> {
        let not_found = || StratbenchError::NotFound { id: id.to_string() };
        let row_id: i64 = id.trim().parse().map_err(|_| not_found())?;

        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| StratbenchError::Storage {
                reason: e.to_string(),
            })?;

        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM strategies WHERE id = ?1",
                params![row_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e: rusqlite::Error| StratbenchError::Storage {
                reason: e.to_string(),
            })?;

        let document = document.ok_or_else(not_found)?;
        Ok(serde_json::from_str(&document)?)
    }
}

#[async_trait]
impl StrategyStorePort for SqliteStrategyStore {
    async fn save(&self, request: &SaveRequest) -> Result<String, StratbenchError> {
        let store = self.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || store.insert(&request))
            .await
            .map_err(|e| StratbenchError::Storage {
                reason: e.to_string(),
            })?
    }

    async fn load(&self, id: &str) -> Result<Value, StratbenchError> {
        let store = self.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || store.fetch(&id))
            .await
            .map_err(|e| StratbenchError::Storage {
                reason: e.to_string(),
            })?
    }
}
