// Add Secondary Owner
//
// Resolves the requested GovIds, skips owners already on the registration,
// and appends whatever is new in a single list append. The stored list
// never holds the same person twice.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{recover_aborted, HandlerStatus};
use crate::entities::{
    Owner, Owners, Person, VehicleRegistration, PERSON_TABLE, VEHICLE_REGISTRATION_TABLE,
};
use crate::error::LedgerResult;
use crate::ledger::{Filter, LedgerDriver, Statement};
use crate::metadata::get_document_id;

/// Registration-shaped request; only `VIN` and `Owners.SecondaryOwners` are read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecondaryOwnerRequest {
    #[serde(rename = "VIN")]
    pub vin: String,

    #[serde(default)]
    pub owners: Owners,
}

pub fn add_secondary_owner(
    driver: &LedgerDriver,
    request: &SecondaryOwnerRequest,
) -> LedgerResult<HandlerStatus> {
    let result = driver.execute(|txn| {
        info!("Checking vehicle registration already exists for VIN {}.", request.vin);
        let rows = txn.execute(&Statement::select_where(
            VEHICLE_REGISTRATION_TABLE,
            VehicleRegistration::VIN_FIELD,
            &request.vin,
        ))?;
        let Some(current) = rows.into_iter().next() else {
            info!(
                "Vehicle registration does not exist for VIN {}, returning not found.",
                request.vin
            );
            return Ok(HandlerStatus::NotFound);
        };
        let current: VehicleRegistration = serde_json::from_value(current)?;

        info!("Vehicle registration already exists, checking what's changed between current value and request.");
        let mut new_owner_ids: Vec<String> = Vec::new();
        for owner in &request.owners.secondary_owners {
            let Some(person_id) =
                get_document_id(txn, PERSON_TABLE, Person::GOV_ID_FIELD, &owner.person_id)?
            else {
                info!("No person found with GovId {}, returning not found.", owner.person_id);
                return Ok(HandlerStatus::NotFound);
            };

            if current.owners.has_secondary_owner(&person_id) || new_owner_ids.contains(&person_id) {
                continue;
            }
            new_owner_ids.push(person_id);
        }

        if new_owner_ids.is_empty() {
            info!("Nothing changed, returning not modified.");
            return Ok(HandlerStatus::NotModified);
        }

        let values = new_owner_ids
            .iter()
            .map(|id| serde_json::to_value(Owner::new(id.as_str())))
            .collect::<Result<Vec<_>, _>>()?;
        txn.execute(&Statement::append_where(
            VEHICLE_REGISTRATION_TABLE,
            Filter::eq(VehicleRegistration::VIN_FIELD, request.vin.as_str()),
            Owners::SECONDARY_OWNERS_PATH,
            values,
        ))?;

        info!(
            "Secondary owners added with document IDs {:?}, returning OK.",
            new_owner_ids
        );
        Ok(HandlerStatus::Ok)
    });

    recover_aborted(result)
}
