// Add Vehicle - insert a vehicle unless its VIN is already on file

use tracing::info;

use super::{exists, recover_aborted, HandlerStatus};
use crate::entities::{Vehicle, VEHICLE_TABLE};
use crate::error::LedgerResult;
use crate::ledger::{LedgerDriver, Statement};

pub fn add_vehicle(driver: &LedgerDriver, vehicle: &Vehicle) -> LedgerResult<HandlerStatus> {
    let result = driver.execute(|txn| {
        info!("Checking vehicle already exists for VIN {}.", vehicle.vin);
        if exists(txn, VEHICLE_TABLE, Vehicle::VIN_FIELD, &vehicle.vin)? {
            info!("Vehicle does exist for VIN {}, returning not modified.", vehicle.vin);
            return Ok(HandlerStatus::NotModified);
        }

        info!("Inserting vehicle for VIN {}.", vehicle.vin);
        txn.execute(&Statement::insert(VEHICLE_TABLE, vehicle)?)?;
        info!("Inserted vehicle for VIN {}, returning OK.", vehicle.vin);
        Ok(HandlerStatus::Ok)
    });

    recover_aborted(result)
}
