// Add Vehicle Registration
//
// The request names owners by GovId; the stored registration names them by
// Person document id. Missing owners are 404, an existing VIN is 304.

use tracing::info;

use super::{exists, recover_aborted, HandlerStatus};
use crate::entities::{
    Owner, Owners, Person, VehicleRegistration, PERSON_TABLE, VEHICLE_REGISTRATION_TABLE,
};
use crate::error::LedgerResult;
use crate::ledger::{LedgerDriver, Statement};
use crate::metadata::get_document_id;

pub fn add_vehicle_registration(
    driver: &LedgerDriver,
    registration: &VehicleRegistration,
) -> LedgerResult<HandlerStatus> {
    let result = driver.execute(|txn| {
        let primary_gov_id = registration
            .owners
            .primary_owner
            .as_ref()
            .map(|owner| owner.person_id.as_str());

        info!("Looking for person document ID {:?}.", primary_gov_id);
        let primary_id = match primary_gov_id {
            Some(gov_id) => get_document_id(txn, PERSON_TABLE, Person::GOV_ID_FIELD, gov_id)?,
            None => None,
        };
        let Some(primary_id) = primary_id else {
            info!("No person found with GovId {:?}, returning not found.", primary_gov_id);
            txn.abort();
            return Ok(HandlerStatus::NotFound);
        };

        info!("Checking vehicle registration already exists for VIN {}.", registration.vin);
        if exists(
            txn,
            VEHICLE_REGISTRATION_TABLE,
            VehicleRegistration::VIN_FIELD,
            &registration.vin,
        )? {
            info!(
                "Vehicle registration does exist for VIN {}, returning not modified.",
                registration.vin
            );
            txn.abort();
            return Ok(HandlerStatus::NotModified);
        }

        let mut secondary_ids: Vec<String> = Vec::new();
        for owner in &registration.owners.secondary_owners {
            match get_document_id(txn, PERSON_TABLE, Person::GOV_ID_FIELD, &owner.person_id)? {
                Some(id) if !secondary_ids.contains(&id) => secondary_ids.push(id),
                Some(_) => {}
                None => {
                    info!(
                        "No person found with secondary owner GovId {}, returning not found.",
                        owner.person_id
                    );
                    txn.abort();
                    return Ok(HandlerStatus::NotFound);
                }
            }
        }

        let mut document = registration.clone();
        document.owners = Owners {
            primary_owner: Some(Owner::new(primary_id)),
            secondary_owners: secondary_ids.into_iter().map(Owner::new).collect(),
        };

        info!("Inserting vehicle registration for VIN {}.", registration.vin);
        txn.execute(&Statement::insert(VEHICLE_REGISTRATION_TABLE, &document)?)?;
        info!(
            "Inserted vehicle registration for VIN {}, returning OK.",
            registration.vin
        );
        Ok(HandlerStatus::Ok)
    });

    recover_aborted(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Owner;
    use crate::handlers::add_person;
    use crate::handlers::test_support::{person, registration, test_driver};

    fn stored_registrations(driver: &LedgerDriver) -> Vec<VehicleRegistration> {
        driver
            .execute(|txn| txn.execute(&Statement::select_all(VEHICLE_REGISTRATION_TABLE)))
            .unwrap()
            .into_iter()
            .map(|row| serde_json::from_value(row).unwrap())
            .collect()
    }

    #[test]
    fn test_unknown_owner_is_not_found() {
        let driver = test_driver();
        let status = add_vehicle_registration(&driver, &registration("VIN1", "NOBODY")).unwrap();

        assert_eq!(status, HandlerStatus::NotFound);
        assert!(stored_registrations(&driver).is_empty());
    }

    #[test]
    fn test_missing_primary_owner_is_not_found() {
        let driver = test_driver();
        let mut request = registration("VIN1", "unused");
        request.owners.primary_owner = None;

        assert_eq!(
            add_vehicle_registration(&driver, &request).unwrap(),
            HandlerStatus::NotFound
        );
    }

    #[test]
    fn test_registration_stores_document_ids() {
        let driver = test_driver();
        add_person(&driver, &person("LOGANB486CG", "Brent")).unwrap();
        add_person(&driver, &person("744 849 301", "Alexis")).unwrap();

        let mut request = registration("KM8SRDHF6EU074761", "LOGANB486CG");
        request.owners.secondary_owners = vec![Owner::new("744 849 301"), Owner::new("744 849 301")];

        assert_eq!(
            add_vehicle_registration(&driver, &request).unwrap(),
            HandlerStatus::Ok
        );

        let stored = stored_registrations(&driver);
        assert_eq!(stored.len(), 1);

        let (brent_id, alexis_id) = driver
            .execute(|txn| {
                Ok((
                    get_document_id(txn, PERSON_TABLE, "GovId", "LOGANB486CG")?,
                    get_document_id(txn, PERSON_TABLE, "GovId", "744 849 301")?,
                ))
            })
            .unwrap();
        assert_eq!(stored[0].owners.primary_owner, Some(Owner::new(brent_id.unwrap())));
        assert_eq!(stored[0].owners.secondary_owners, vec![Owner::new(alexis_id.unwrap())]);
    }

    #[test]
    fn test_existing_vin_is_not_modified() {
        let driver = test_driver();
        add_person(&driver, &person("LOGANB486CG", "Brent")).unwrap();
        let request = registration("KM8SRDHF6EU074761", "LOGANB486CG");

        assert_eq!(add_vehicle_registration(&driver, &request).unwrap(), HandlerStatus::Ok);
        assert_eq!(
            add_vehicle_registration(&driver, &request).unwrap(),
            HandlerStatus::NotModified
        );
        assert_eq!(stored_registrations(&driver).len(), 1);
    }

    #[test]
    fn test_unknown_secondary_owner_is_not_found() {
        let driver = test_driver();
        add_person(&driver, &person("LOGANB486CG", "Brent")).unwrap();

        let mut request = registration("KM8SRDHF6EU074761", "LOGANB486CG");
        request.owners.secondary_owners = vec![Owner::new("GHOST")];

        assert_eq!(
            add_vehicle_registration(&driver, &request).unwrap(),
            HandlerStatus::NotFound
        );
        assert!(stored_registrations(&driver).is_empty());
    }
}
