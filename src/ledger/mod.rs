// Ledger - driver, client and storage for the vehicle-registration ledger
//
// The store is SQLite; locking, atomic commit and index structures are
// SQLite's. This layer maps a closed set of typed statements onto it,
// keeps a hash-chained revision journal, and retries conflicting
// transactions.

pub mod client;
pub mod digest;
pub mod driver;
pub mod executor;
pub mod statement;
pub mod store;

pub use client::{LedgerClient, LedgerDescription, LedgerState};
pub use digest::VerificationReport;
pub use driver::{LedgerDriver, RetryPolicy};
pub use executor::{CommittedRevision, RevisionMetadata, TableInfo, TransactionExecutor};
pub use statement::{Filter, Statement};
pub use store::LedgerStore;
