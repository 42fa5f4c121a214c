pub mod domains;
pub mod ledger;
pub mod migrations;
pub mod recorder;
pub mod schema;

use duckdb::Connection;
use parking_lot::{Mutex, MutexGuard};
use std::path::Path;
use std::sync::Arc;

/// Handle to the backing DuckDB store.
///
/// Constructed once at startup and passed into the router state; cloning
/// shares the underlying connection. All access goes through `lock()`, and
/// correctness of the uniqueness decision is delegated to the store's
/// constraint checks rather than any in-process coordination.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database file and bring the schema up to date.
    pub fn open(path: &Path) -> Result<Self, duckdb::Error> {
        let conn = Connection::open(path)?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, duckdb::Error> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}
