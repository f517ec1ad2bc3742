// Ledger Store - the SQLite database that hosts one ledger
//
// Layout:
//   ledgers         control-plane record (name, state, deletion protection)
//   ledger_tables   user tables created through the driver
//   ledger_indexes  indexed fields per table
//   revisions       every revision ever written (append-only, hash-chained)
//   documents       current revision of each live document

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{LedgerError, LedgerResult};

/// Shared handle to the backing database
#[derive(Clone)]
pub struct LedgerStore {
    conn: Arc<Mutex<Connection>>,
}

impl LedgerStore {
    /// Open (or create) a file-backed store
    pub fn open(path: &Path) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;
        // WAL for crash recovery, same as any other file store
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    /// Throwaway store, used by tests and demos
    pub fn open_in_memory() -> LedgerResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> LedgerResult<Self> {
        // Conflicts surface immediately; the driver owns retrying
        conn.busy_timeout(Duration::from_millis(0))?;
        setup_schema(&conn)?;
        Ok(LedgerStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with exclusive access to the connection
    pub fn with_connection<R, F>(&self, f: F) -> LedgerResult<R>
    where
        F: FnOnce(&mut Connection) -> LedgerResult<R>,
    {
        let mut conn = self.conn.lock().map_err(|_| LedgerError::LockPoisoned)?;
        f(&mut conn)
    }
}

pub fn setup_schema(conn: &Connection) -> LedgerResult<()> {
    // ==========================================================================
    // Control plane
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ledgers (
            name TEXT PRIMARY KEY,
            state TEXT NOT NULL,
            deletion_protection INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Catalog
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ledger_tables (
            name TEXT PRIMARY KEY,
            table_id TEXT UNIQUE NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ledger_indexes (
            table_name TEXT NOT NULL,
            field TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (table_name, field)
        )",
        [],
    )?;

    // ==========================================================================
    // Journal (append-only) and current state
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS revisions (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            table_name TEXT NOT NULL,
            document_id TEXT NOT NULL,
            version INTEGER NOT NULL,
            data TEXT,
            hash TEXT NOT NULL,
            previous_hash TEXT,
            tx_id TEXT NOT NULL,
            tx_time TEXT NOT NULL,
            UNIQUE (document_id, version)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            document_id TEXT PRIMARY KEY,
            table_name TEXT NOT NULL,
            version INTEGER NOT NULL,
            data TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_table ON documents(table_name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_revisions_document ON revisions(document_id, version)",
        [],
    )?;

    Ok(())
}
