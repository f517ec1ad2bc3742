// Ledger Driver - transactional execution with retry
//
// Every unit of work runs inside `execute`: an immediate SQLite transaction
// is opened, the closure gets a `TransactionExecutor`, and the transaction
// commits when the closure returns Ok. Conflicts (busy or locked database)
// re-run the whole closure, so it must be safe to call more than once.

use rusqlite::TransactionBehavior;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::client::{LedgerClient, LedgerState};
use super::digest::{verify_chain, VerificationReport};
use super::executor::{TableInfo, TransactionExecutor};
use super::store::LedgerStore;
use crate::error::{LedgerError, LedgerResult};

// ============================================================================
// RETRY POLICY
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 4,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        RetryPolicy {
            max_retries,
            ..Default::default()
        }
    }

    /// Exponential backoff for the given retry (0-based), capped at `max_delay`
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

// ============================================================================
// DRIVER
// ============================================================================

#[derive(Clone)]
pub struct LedgerDriver {
    store: LedgerStore,
    ledger_name: String,
    retry_policy: RetryPolicy,
}

impl LedgerDriver {
    /// Connect to an existing ACTIVE ledger
    pub fn connect(
        store: LedgerStore,
        ledger_name: &str,
        retry_policy: RetryPolicy,
    ) -> LedgerResult<Self> {
        let description = LedgerClient::new(store.clone()).describe_ledger(ledger_name)?;
        if description.state != LedgerState::Active {
            return Err(LedgerError::LedgerNotActive {
                name: ledger_name.to_string(),
                state: description.state.as_str().to_string(),
            });
        }

        debug!(ledger = ledger_name, ?retry_policy, "driver connected");
        Ok(LedgerDriver {
            store,
            ledger_name: ledger_name.to_string(),
            retry_policy,
        })
    }

    pub fn ledger_name(&self) -> &str {
        &self.ledger_name
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Run `body` in a transaction, retrying on conflicts.
    ///
    /// If `body` calls [`TransactionExecutor::abort`], everything it wrote is
    /// rolled back and its return value is passed through.
    pub fn execute<T, F>(&self, mut body: F) -> LedgerResult<T>
    where
        F: FnMut(&mut TransactionExecutor<'_>) -> LedgerResult<T>,
    {
        let mut retries = 0;
        loop {
            match self.run_once(&mut body) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    if retries >= self.retry_policy.max_retries {
                        warn!(
                            ledger = %self.ledger_name,
                            attempts = retries + 1,
                            error = %err,
                            "giving up on conflicting transaction"
                        );
                        return Err(LedgerError::TransactionAborted {
                            attempts: retries + 1,
                        });
                    }

                    let delay = self.retry_policy.backoff(retries);
                    debug!(retry = retries + 1, ?delay, error = %err, "retrying transaction");
                    std::thread::sleep(delay);
                    retries += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn run_once<T, F>(&self, body: &mut F) -> LedgerResult<T>
    where
        F: FnMut(&mut TransactionExecutor<'_>) -> LedgerResult<T>,
    {
        self.store.with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let mut executor = TransactionExecutor::new(&tx);
            let outcome = body(&mut executor);
            let aborted = executor.is_aborted();
            let tx_id = executor.transaction_id().to_string();

            match outcome {
                Ok(value) if aborted => {
                    tx.rollback()?;
                    info!(%tx_id, "Transaction aborted.");
                    Ok(value)
                }
                Ok(value) => {
                    tx.commit()?;
                    debug!(%tx_id, "transaction committed");
                    Ok(value)
                }
                // Dropping `tx` rolls back
                Err(err) => Err(err),
            }
        })
    }

    // ========================================================================
    // CONVENIENCE
    // ========================================================================

    pub fn list_table_names(&self) -> LedgerResult<Vec<String>> {
        self.execute(|txn| txn.list_table_names())
    }

    pub fn list_tables(&self) -> LedgerResult<Vec<TableInfo>> {
        self.execute(|txn| txn.list_tables())
    }

    /// Recompute the revision hash chain of one document
    pub fn verify_document(&self, document_id: &str) -> LedgerResult<VerificationReport> {
        let revisions = self.execute(|txn| txn.stored_revisions(document_id))?;
        if revisions.is_empty() {
            return Err(LedgerError::DocumentNotFound(document_id.to_string()));
        }
        Ok(verify_chain(document_id, &revisions))
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &LedgerStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::statement::Statement;
    use serde_json::json;
    use std::cell::Cell;

    fn test_driver() -> LedgerDriver {
        let store = LedgerStore::open_in_memory().unwrap();
        LedgerClient::new(store.clone())
            .create_ledger("vehicle-registration", false)
            .unwrap();
        LedgerDriver::connect(store, "vehicle-registration", RetryPolicy::default()).unwrap()
    }

    fn count_vehicles(driver: &LedgerDriver) -> usize {
        driver
            .execute(|txn| txn.execute(&Statement::select_all("Vehicle")))
            .unwrap()
            .len()
    }

    #[test]
    fn test_connect_requires_ledger() {
        let store = LedgerStore::open_in_memory().unwrap();
        let err = LedgerDriver::connect(store, "missing", RetryPolicy::default())
            .err()
            .unwrap();
        assert!(matches!(err, LedgerError::LedgerNotFound(_)));
    }

    #[test]
    fn test_commit_persists_writes() {
        let driver = test_driver();
        driver
            .execute(|txn| {
                txn.execute(&Statement::create_table("Vehicle"))?;
                txn.execute(&Statement::Insert {
                    table: "Vehicle".to_string(),
                    document: json!({"VIN": "A"}),
                })
            })
            .unwrap();

        assert_eq!(count_vehicles(&driver), 1);
        assert_eq!(driver.list_table_names().unwrap(), vec!["Vehicle".to_string()]);
    }

    #[test]
    fn test_abort_rolls_back_and_returns_value() {
        let driver = test_driver();
        driver
            .execute(|txn| txn.execute(&Statement::create_table("Vehicle")))
            .unwrap();

        let outcome = driver
            .execute(|txn| {
                txn.execute(&Statement::Insert {
                    table: "Vehicle".to_string(),
                    document: json!({"VIN": "A"}),
                })?;
                txn.abort();
                Ok("not modified")
            })
            .unwrap();

        assert_eq!(outcome, "not modified");
        assert_eq!(count_vehicles(&driver), 0);
    }

    #[test]
    fn test_error_rolls_back() {
        let driver = test_driver();
        driver
            .execute(|txn| txn.execute(&Statement::create_table("Vehicle")))
            .unwrap();

        let result: LedgerResult<()> = driver.execute(|txn| {
            txn.execute(&Statement::Insert {
                table: "Vehicle".to_string(),
                document: json!({"VIN": "A"}),
            })?;
            txn.execute(&Statement::select_all("Ghost"))?;
            Ok(())
        });

        assert!(matches!(result, Err(LedgerError::TableNotFound(_))));
        assert_eq!(count_vehicles(&driver), 0);
    }

    #[test]
    fn test_conflicts_are_retried_then_aborted() {
        let store = LedgerStore::open_in_memory().unwrap();
        LedgerClient::new(store.clone())
            .create_ledger("vehicle-registration", false)
            .unwrap();
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let driver = LedgerDriver::connect(store, "vehicle-registration", policy).unwrap();

        let attempts = Cell::new(0);
        let result: LedgerResult<()> = driver.execute(|_txn| {
            attempts.set(attempts.get() + 1);
            Err(LedgerError::Conflict("simulated".to_string()))
        });

        assert!(matches!(result, Err(LedgerError::TransactionAborted { attempts: 3 })));
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_conflict_then_success() {
        let driver = test_driver();
        let attempts = Cell::new(0);

        let value = driver
            .execute(|_txn| {
                attempts.set(attempts.get() + 1);
                if attempts.get() < 2 {
                    Err(LedgerError::Conflict("simulated".to_string()))
                } else {
                    Ok(42)
                }
            })
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(10));
        assert_eq!(policy.backoff(2), Duration::from_millis(40));
        assert_eq!(policy.backoff(20), Duration::from_millis(500));
    }

    #[test]
    fn test_verify_detects_tampering() {
        let driver = test_driver();
        let inserted = driver
            .execute(|txn| {
                txn.execute(&Statement::create_table("Vehicle"))?;
                txn.execute(&Statement::Insert {
                    table: "Vehicle".to_string(),
                    document: json!({"VIN": "A", "Color": "Red"}),
                })
            })
            .unwrap();
        let id = inserted[0]["documentId"].as_str().unwrap().to_string();

        assert!(driver.verify_document(&id).unwrap().verified);

        driver
            .store()
            .with_connection(|conn| {
                conn.execute(
                    "UPDATE revisions SET data = '{\"VIN\":\"A\",\"Color\":\"Blue\"}'
                     WHERE document_id = ?1",
                    rusqlite::params![id],
                )?;
                Ok(())
            })
            .unwrap();

        let report = driver.verify_document(&id).unwrap();
        assert!(!report.verified);
        assert_eq!(report.first_mismatch, Some(0));
        assert!(matches!(
            driver.verify_document("nope"),
            Err(LedgerError::DocumentNotFound(_))
        ));
    }
}
