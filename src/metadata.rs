// Metadata Lookup - natural key -> ledger document id
//
// Reads the committed view so the id comes from ledger metadata rather than
// from anything stored in the document body.

use tracing::debug;

use crate::error::LedgerResult;
use crate::ledger::{CommittedRevision, Statement, TransactionExecutor};

/// Document id of the first committed record in `table` whose `field`
/// equals `value`, or `None`
pub fn get_document_id(
    txn: &mut TransactionExecutor<'_>,
    table: &str,
    field: &str,
    value: &str,
) -> LedgerResult<Option<String>> {
    let rows = txn.execute(&Statement::committed_where(table, field, value))?;

    let document_id = match rows.into_iter().next() {
        Some(row) => {
            let revision: CommittedRevision = serde_json::from_value(row)?;
            Some(revision.metadata.id)
        }
        None => None,
    };

    debug!(table, field, value, ?document_id, "document id lookup");
    Ok(document_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerClient, LedgerDriver, LedgerStore, RetryPolicy};
    use serde_json::json;

    fn driver_with_person() -> (LedgerDriver, String) {
        let store = LedgerStore::open_in_memory().unwrap();
        LedgerClient::new(store.clone())
            .create_ledger("vehicle-registration", false)
            .unwrap();
        let driver =
            LedgerDriver::connect(store, "vehicle-registration", RetryPolicy::default()).unwrap();

        let rows = driver
            .execute(|txn| {
                txn.execute(&Statement::create_table("Person"))?;
                txn.execute(&Statement::Insert {
                    table: "Person".to_string(),
                    document: json!({"GovId": "LEWISR261LL", "FirstName": "Raul"}),
                })
            })
            .unwrap();
        let id = rows[0]["documentId"].as_str().unwrap().to_string();
        (driver, id)
    }

    #[test]
    fn test_lookup_finds_document_id() {
        let (driver, id) = driver_with_person();
        let found = driver
            .execute(|txn| get_document_id(txn, "Person", "GovId", "LEWISR261LL"))
            .unwrap();
        assert_eq!(found, Some(id));
    }

    #[test]
    fn test_lookup_missing_value() {
        let (driver, _) = driver_with_person();
        let found = driver
            .execute(|txn| get_document_id(txn, "Person", "GovId", "NOBODY"))
            .unwrap();
        assert_eq!(found, None);
    }
}
