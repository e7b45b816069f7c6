//! # Payroll Persistence
//!
//! SQLite state plus a JSONL audit log.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Database                               │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐ │
//! │  │   SQLite    │    │    JSONL    │    │     Repos       │ │
//! │  │  (state)    │    │  (audit)    │    │   (queries)     │ │
//! │  └─────────────┘    └─────────────┘    └─────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use payroll_persistence::{BatchRepo, Database};
//!
//! let db = Database::init_with_migrations("sqlite:payroll.db", "data/events").await?;
//!
//! let mut tx = db.pool().begin().await?;
//! let batch = BatchRepo::get_by_id(&mut *tx, 1).await?;
//! tx.commit().await?;
//!
//! db.events().append(event)?;
//! ```

pub mod error;
pub mod events;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
pub use events::{EventFilter, EventReader, EventStore};
pub use sqlite::schema::{
    BankAccountRow, BankChangeRequestRow, BatchReversalRow, CompanyRow, EmployeeRow,
    ProfileChangeRequestRow, SalaryBatchRow, SalaryTransactionRow, TransactionDetailRow,
};
pub use sqlite::{
    create_pool, init_database, memory_pool, run_migrations, BankAccountRepo, BankChangeRepo,
    BatchRepo, CompanyRepo, EmployeeRepo, NewEmployee, NewTransaction, ProfileChangeRepo,
    ReversalRepo, SalaryTxnRepo,
};

use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

/// Database facade - unified access to SQLite + audit events
pub struct Database {
    pool: SqlitePool,
    event_store: Arc<EventStore>,
}

impl Database {
    /// Open an existing database without running migrations
    ///
    /// # Arguments
    /// * `db_url` - SQLite database URL (e.g., "sqlite:payroll.db")
    /// * `events_path` - Path to the JSONL events directory
    pub async fn new<Q: AsRef<Path>>(db_url: &str, events_path: Q) -> PersistenceResult<Self> {
        let pool = create_pool(db_url).await?;
        let event_store = Arc::new(EventStore::new(events_path)?);

        Ok(Self { pool, event_store })
    }

    /// Open the database and apply migrations
    pub async fn init_with_migrations<Q: AsRef<Path>>(
        db_url: &str,
        events_path: Q,
    ) -> PersistenceResult<Self> {
        let pool = init_database(db_url).await?;
        let event_store = Arc::new(EventStore::new(events_path)?);

        Ok(Self { pool, event_store })
    }

    /// In-memory database with events under `events_path`
    pub async fn in_memory<Q: AsRef<Path>>(events_path: Q) -> PersistenceResult<Self> {
        let pool = memory_pool().await?;
        let event_store = Arc::new(EventStore::new(events_path)?);

        Ok(Self { pool, event_store })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn events(&self) -> &EventStore {
        &self.event_store
    }

    /// Shared handle to the event store
    pub fn events_handle(&self) -> Arc<EventStore> {
        Arc::clone(&self.event_store)
    }

    /// Reader over the same events directory
    pub fn event_reader(&self) -> EventReader {
        EventReader::new(self.event_store.base_path())
    }
}
