//! Embedded relational store.
//!
//! One SQLite file owns all persisted state; everything else in the process
//! reaches it through [`Store`]. Connections come from a small pool and each
//! one is initialised with WAL journaling (concurrent readers, single
//! writer), enforced foreign keys, and a busy timeout.

use std::path::Path;
use std::time::Duration;

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use thiserror::Error;

mod queries;
mod schema;
mod snapshot;

pub use queries::{
    EventRow, FilesystemMetricRow, HostRow, HostSummary, MAX_EVENT_ROWS, MetricPoint, ServiceRow,
};
pub use schema::SCHEMA_VERSION;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_SIZE: u32 = 8;

/// Store failures. Open/migration failures are fatal at startup; everything
/// else is recoverable and the caller decides whether siblings continue.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error(
        "database schema version {found} is newer than the supported version {supported}; \
         refusing to open"
    )]
    VersionAhead { found: i64, supported: i64 },
    #[error("no migration path from schema version {from}")]
    MigrationGap { from: i64 },
}

/// Handle to the embedded store. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct Store {
    pool: r2d2::Pool<SqliteConnectionManager>,
}

impl Store {
    /// Open (creating if missing) the database at `path`, apply pragmas,
    /// create the schema idempotently, and run pending migrations. Fails if
    /// the on-disk schema version is ahead of this binary.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys=ON;")?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            // The pragma returns the resulting mode as a row.
            conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
            Ok(())
        });
        let pool = r2d2::Pool::builder().max_size(POOL_SIZE).build(manager)?;

        let store = Self { pool };
        let mut conn = store.conn()?;
        schema::initialize(&mut conn)?;
        Ok(store)
    }

    /// Current on-disk schema version.
    pub fn schema_version(&self) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        Ok(schema::read_version(&conn)?.unwrap_or(0))
    }

    pub(crate) fn conn(
        &self,
    ) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.pool.get()?)
    }
}
