// Registration History - every revision of a registration, oldest first,
// plus hash-chain verification of the same document

use tracing::info;

use super::{recover_aborted_query, QueryResponse};
use crate::entities::{VehicleRegistration, VehicleRegistrationHistory, VEHICLE_REGISTRATION_TABLE};
use crate::error::LedgerResult;
use crate::ledger::{CommittedRevision, LedgerDriver, Statement, VerificationReport};
use crate::metadata::get_document_id;

pub fn query_registration_history(
    driver: &LedgerDriver,
    vin: &str,
) -> LedgerResult<QueryResponse<VehicleRegistrationHistory>> {
    let history = driver.execute(|txn| {
        let Some(document_id) = get_document_id(
            txn,
            VEHICLE_REGISTRATION_TABLE,
            VehicleRegistration::VIN_FIELD,
            vin,
        )?
        else {
            info!("No vehicle registration found for VIN {}.", vin);
            return Ok(Vec::new());
        };

        info!(
            "Getting history for vehicle registration where document ID is {}.",
            document_id
        );
        let rows = txn.execute(&Statement::history(VEHICLE_REGISTRATION_TABLE, &document_id))?;

        let mut history = Vec::with_capacity(rows.len());
        for row in rows {
            let revision: CommittedRevision = serde_json::from_value(row)?;
            // Deletion revisions carry no registration
            let Some(data) = revision.data else { continue };

            history.push(VehicleRegistrationHistory {
                version: revision.metadata.version,
                tx_time: revision.metadata.tx_time,
                vehicle_registration: serde_json::from_value(data)?,
            });
        }
        Ok(history)
    });

    recover_aborted_query(history.map(QueryResponse::from_items))
}

/// Hash-chain report for the registration of `vin`: one item, or none
/// (404) if the VIN is unknown
pub fn verify_registration(
    driver: &LedgerDriver,
    vin: &str,
) -> LedgerResult<QueryResponse<VerificationReport>> {
    let report = driver
        .execute(|txn| {
            get_document_id(
                txn,
                VEHICLE_REGISTRATION_TABLE,
                VehicleRegistration::VIN_FIELD,
                vin,
            )
        })
        .and_then(|document_id| match document_id {
            Some(id) => Ok(vec![driver.verify_document(&id)?]),
            None => {
                info!("No vehicle registration found for VIN {}.", vin);
                Ok(Vec::new())
            }
        });

    recover_aborted_query(report.map(QueryResponse::from_items))
}
