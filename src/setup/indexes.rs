// Create the lookup indexes that are not there yet

use anyhow::{Context, Result};
use tracing::info;

use crate::entities::{
    DriversLicense, Person, Vehicle, VehicleRegistration, DRIVERS_LICENSE_TABLE, PERSON_TABLE,
    VEHICLE_REGISTRATION_TABLE, VEHICLE_TABLE,
};
use crate::ledger::{LedgerDriver, Statement};

/// (table, field) pairs the handlers look documents up by
pub const INDEXES: [(&str, &str); 6] = [
    (VEHICLE_REGISTRATION_TABLE, VehicleRegistration::VIN_FIELD),
    (VEHICLE_REGISTRATION_TABLE, VehicleRegistration::LICENSE_PLATE_FIELD),
    (VEHICLE_TABLE, Vehicle::VIN_FIELD),
    (PERSON_TABLE, Person::GOV_ID_FIELD),
    (DRIVERS_LICENSE_TABLE, DriversLicense::LICENSE_NUMBER_FIELD),
    (DRIVERS_LICENSE_TABLE, DriversLicense::PERSON_ID_FIELD),
];

/// Returns the (table, field) pairs indexed by this call
pub fn create_indexes(driver: &LedgerDriver) -> Result<Vec<(String, String)>> {
    let tables = driver.list_tables()?;
    let mut created = Vec::new();

    for (table, field) in INDEXES {
        let exists = tables
            .iter()
            .any(|info| info.name == table && info.indexes.iter().any(|f| f == field));
        if exists {
            info!("Index already exists for {} and {}.", table, field);
            continue;
        }

        info!("Index does not exist, creating index on {} for {}.", table, field);
        driver
            .execute(|txn| txn.execute(&Statement::create_index(table, field)))
            .with_context(|| format!("Failed to create index on {}({})", table, field))?;
        created.push((table.to_string(), field.to_string()));
    }

    Ok(created)
}
