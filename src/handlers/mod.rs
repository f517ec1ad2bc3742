// Request Handlers - one per DMV operation
//
// Each handler takes an already-parsed request, runs a read followed by a
// conditional write inside one driver transaction, and reports an outcome
// that the HTTP layer maps to a status code. Nothing is kept between calls.

pub mod find_vehicles;
pub mod history;
pub mod person;
pub mod registration;
pub mod secondary_owner;
pub mod vehicle;

pub use find_vehicles::find_vehicles_by_owner;
pub use history::{query_registration_history, verify_registration};
pub use person::add_person;
pub use registration::add_vehicle_registration;
pub use secondary_owner::{add_secondary_owner, SecondaryOwnerRequest};
pub use vehicle::add_vehicle;

use tracing::warn;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{Statement, TransactionExecutor};

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerStatus {
    /// 200
    Ok,
    /// 304: entity already exists or nothing changed
    NotModified,
    /// 404: referenced entity is missing
    NotFound,
    /// 409: the driver gave up on a conflicting transaction
    Conflict,
}

impl HandlerStatus {
    pub fn code(&self) -> u16 {
        match self {
            HandlerStatus::Ok => 200,
            HandlerStatus::NotModified => 304,
            HandlerStatus::NotFound => 404,
            HandlerStatus::Conflict => 409,
        }
    }
}

/// Result of a read handler: the rows, 404 when there are none, 409 with
/// no rows when the driver gave up
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse<T> {
    pub status: HandlerStatus,
    pub items: Vec<T>,
}

impl<T> QueryResponse<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        let status = if items.is_empty() {
            HandlerStatus::NotFound
        } else {
            HandlerStatus::Ok
        };
        QueryResponse { status, items }
    }

    pub fn conflict() -> Self {
        QueryResponse {
            status: HandlerStatus::Conflict,
            items: Vec::new(),
        }
    }
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Catch and log an aborted transaction instead of failing the request
pub(crate) fn recover_aborted(result: LedgerResult<HandlerStatus>) -> LedgerResult<HandlerStatus> {
    catch_aborted(result, || HandlerStatus::Conflict)
}

/// Same for read handlers: an aborted read is a 409 with no rows
pub(crate) fn recover_aborted_query<T>(
    result: LedgerResult<QueryResponse<T>>,
) -> LedgerResult<QueryResponse<T>> {
    catch_aborted(result, QueryResponse::conflict)
}

fn catch_aborted<T>(result: LedgerResult<T>, on_abort: impl FnOnce() -> T) -> LedgerResult<T> {
    match result {
        Err(err @ LedgerError::TransactionAborted { .. }) => {
            warn!(error = %err, "Transaction aborted.");
            Ok(on_abort())
        }
        other => other,
    }
}

/// Whether any current document in `table` has `field == value`
pub(crate) fn exists(
    txn: &mut TransactionExecutor<'_>,
    table: &str,
    field: &str,
    value: &str,
) -> LedgerResult<bool> {
    let rows = txn.execute(&Statement::select_where(table, field, value))?;
    Ok(rows
        .iter()
        .any(|row| row.get(field).and_then(|v| v.as_str()) == Some(value)))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(HandlerStatus::Ok.code(), 200);
        assert_eq!(HandlerStatus::NotModified.code(), 304);
        assert_eq!(HandlerStatus::NotFound.code(), 404);
        assert_eq!(HandlerStatus::Conflict.code(), 409);
    }

    #[test]
    fn test_empty_query_is_not_found() {
        let empty: QueryResponse<u8> = QueryResponse::from_items(vec![]);
        assert_eq!(empty.status, HandlerStatus::NotFound);
        assert_eq!(QueryResponse::from_items(vec![1u8]).status, HandlerStatus::Ok);
    }

    #[test]
    fn test_aborted_transaction_is_recovered() {
        let recovered = recover_aborted(Err(LedgerError::TransactionAborted { attempts: 5 }));
        assert_eq!(recovered.unwrap(), HandlerStatus::Conflict);

        let other = recover_aborted(Err(LedgerError::TableNotFound("Person".to_string())));
        assert!(other.is_err());
    }

    #[test]
    fn test_aborted_query_is_conflict_without_rows() {
        let recovered: QueryResponse<u8> =
            recover_aborted_query(Err(LedgerError::TransactionAborted { attempts: 2 })).unwrap();
        assert_eq!(recovered.status, HandlerStatus::Conflict);
        assert!(recovered.items.is_empty());

        let other: LedgerResult<QueryResponse<u8>> =
            recover_aborted_query(Err(LedgerError::TableNotFound("Vehicle".to_string())));
        assert!(other.is_err());
    }
}
