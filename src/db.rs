//! Database module
//!
//! Opens the configured collection and verifies the PostgreSQL schema.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::StorageConfig;
use crate::storage::{MemoryCollection, PgCollection, TransactionCollection};

/// Errors raised while opening storage
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Required table '{0}' does not exist. Please run migrations.")]
    MissingTable(String),
}

/// The process-wide collection handle
pub struct Storage {
    pub collection: Arc<dyn TransactionCollection>,
    pool: Option<PgPool>,
}

impl Storage {
    /// Open the collection described by `config`.
    ///
    /// For PostgreSQL this connects the pool and checks that the table
    /// exists; the service never creates or migrates it.
    pub async fn open(config: &StorageConfig) -> Result<Self, DbError> {
        match config {
            StorageConfig::Memory => {
                tracing::warn!("Using in-memory storage; transactions will not survive a restart");
                Ok(Self {
                    collection: Arc::new(MemoryCollection::new()),
                    pool: None,
                })
            }
            StorageConfig::Postgres {
                database_url,
                max_connections,
                table,
            } => {
                tracing::info!("Connecting to database...");

                let pool = PgPoolOptions::new()
                    .max_connections(*max_connections)
                    .connect(database_url)
                    .await?;

                verify_connection(&pool).await?;

                if !check_schema(&pool, table).await? {
                    return Err(DbError::MissingTable(table.clone()));
                }

                tracing::info!("Database connected successfully");

                Ok(Self {
                    collection: Arc::new(PgCollection::new(pool.clone(), table.clone())),
                    pool: Some(pool),
                })
            }
        }
    }

    /// Close database connections, if any
    pub async fn close(self) {
        if let Some(pool) = self.pool {
            pool.close().await;
            tracing::info!("Database connections closed");
        }
    }
}

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check if the transactions table exists in the current schema
pub async fn check_schema(pool: &PgPool, table: &str) -> Result<bool, sqlx::Error> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.tables
            WHERE table_schema = current_schema() AND table_name = $1
        )
        "#,
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    if !exists {
        tracing::error!("Required table '{}' does not exist", table);
    }

    Ok(exists)
}
