// Ledger Errors
// Everything the driver, client and handlers can fail with.

use thiserror::Error;

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    // ========================================================================
    // Control plane
    // ========================================================================
    /// No ledger with this name exists in the store
    #[error("Ledger not found: {0}")]
    LedgerNotFound(String),

    /// Ledger exists but is not ACTIVE yet
    #[error("Ledger {name} is not active (state: {state})")]
    LedgerNotActive { name: String, state: String },

    /// A store hosts exactly one ledger
    #[error("Store already hosts ledger {0}")]
    LedgerAlreadyExists(String),

    // ========================================================================
    // Schema
    // ========================================================================
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableAlreadyExists(String),

    #[error("Index already exists on {table}({field})")]
    IndexAlreadyExists { table: String, field: String },

    /// Table names and field path segments must be plain identifiers
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    // ========================================================================
    // Documents
    // ========================================================================
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Documents must be JSON objects
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A stored revision could not be decoded
    #[error("Corrupt revision {document_id}@{version}: {reason}")]
    CorruptRevision {
        document_id: String,
        version: u64,
        reason: String,
    },

    /// A field path did not resolve to a list inside the document
    #[error("Field {path} of document {document_id} is not a list")]
    NotAList { document_id: String, path: String },

    // ========================================================================
    // Transactions
    // ========================================================================
    /// Busy or locked database; retried by the driver
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// The driver gave up after repeated conflicts
    #[error("Transaction aborted after {attempts} attempts")]
    TransactionAborted { attempts: u32 },

    // ========================================================================
    // Plumbing
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl LedgerError {
    /// Whether the driver should retry the transaction
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Conflict(_) => true,
            LedgerError::Storage(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}
