//! PostgreSQL backend

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgConnection, Pool, Postgres, Transaction};

use super::{Store, StoreTx};
use crate::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
};

/// Connection pool over the library database
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create the connection pool
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        tracing::info!("Connected to database");
        Ok(Self::new(pool))
    }

    /// Run pending schema migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;

        tracing::info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx: Some(tx) }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}

/// Open PostgreSQL transaction. Dropping it without commit rolls back.
pub struct PgTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTx {
    /// Connection of the still-open transaction
    pub(super) fn conn(&mut self) -> AppResult<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))
    }

    fn take(&mut self) -> AppResult<Transaction<'static, Postgres>> {
        self.tx
            .take()
            .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(&mut self) -> AppResult<()> {
        self.take()?.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        self.take()?.rollback().await?;
        Ok(())
    }
}
