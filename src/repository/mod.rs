//! Repository layer: storage traits and backends
//!
//! The inventory store, member store and loan ledger all live behind one
//! transactional [`Store`]. Every operation runs inside a [`StoreTx`] obtained
//! from [`Repository::begin`]; a transaction that is dropped without
//! [`StoreTx::commit`] is rolled back, and any row locks it holds are released.

pub mod books;
pub mod loans;
pub mod members;
pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::{DatabaseConfig, StorageBackend},
    error::AppResult,
};

pub use books::InventoryStore;
pub use loans::LoanLedger;
pub use members::MemberStore;

/// A storage engine able to open transactions
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a new transaction
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    /// Check that the engine answers
    async fn ping(&self) -> AppResult<()>;

    /// Release connections; no further transactions can be opened
    async fn close(&self);
}

/// One open transaction spanning all three stores
#[async_trait]
pub trait StoreTx: InventoryStore + MemberStore + LoanLedger {
    /// Make every change of this transaction visible and release its locks
    async fn commit(&mut self) -> AppResult<()>;

    /// Discard every change of this transaction and release its locks
    async fn rollback(&mut self) -> AppResult<()>;
}

/// Shared handle on the configured store
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
}

impl Repository {
    /// Create a repository over an already constructed store
    pub fn new(store: impl Store + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Connect to the backend selected in configuration
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        match config.backend {
            StorageBackend::Postgres => {
                let store = postgres::PgStore::connect(config).await?;
                store.migrate().await?;
                Ok(Self::new(store))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage, data will not survive a restart");
                Ok(Self::new(memory::MemoryStore::new()))
            }
        }
    }

    pub async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        self.store.begin().await
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }

    pub async fn close(&self) {
        self.store.close().await
    }
}
