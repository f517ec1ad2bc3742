// Find Vehicles - every vehicle whose registration names the person as
// primary owner

use serde_json::Value;
use tracing::info;

use super::{recover_aborted_query, QueryResponse};
use crate::entities::{
    Owners, Person, Vehicle, VehicleRegistration, PERSON_TABLE, VEHICLE_REGISTRATION_TABLE,
    VEHICLE_TABLE,
};
use crate::error::LedgerResult;
use crate::ledger::{LedgerDriver, Statement};
use crate::metadata::get_document_id;

pub fn find_vehicles_by_owner(
    driver: &LedgerDriver,
    gov_id: &str,
) -> LedgerResult<QueryResponse<Vehicle>> {
    let vehicles = driver.execute(|txn| {
        let Some(person_id) = get_document_id(txn, PERSON_TABLE, Person::GOV_ID_FIELD, gov_id)?
        else {
            info!("No person found with GovId {}.", gov_id);
            return Ok(Vec::new());
        };

        info!("Searching for vehicles where primary owner ID is {}.", person_id);
        let registrations = txn.execute(&Statement::select_where(
            VEHICLE_REGISTRATION_TABLE,
            Owners::PRIMARY_OWNER_PATH,
            &person_id,
        ))?;

        let mut vehicles = Vec::new();
        for registration in registrations {
            let Some(vin) = registration
                .get(VehicleRegistration::VIN_FIELD)
                .and_then(Value::as_str)
            else {
                continue;
            };

            for row in txn.execute(&Statement::select_where(VEHICLE_TABLE, Vehicle::VIN_FIELD, vin))? {
                vehicles.push(serde_json::from_value::<Vehicle>(row)?);
            }
        }
        Ok(vehicles)
    });

    recover_aborted_query(vehicles.map(QueryResponse::from_items))
}
