// Add Person - insert a person unless their GovId is already on file

use tracing::info;

use super::{exists, recover_aborted, HandlerStatus};
use crate::entities::{Person, PERSON_TABLE};
use crate::error::LedgerResult;
use crate::ledger::{LedgerDriver, Statement};

pub fn add_person(driver: &LedgerDriver, person: &Person) -> LedgerResult<HandlerStatus> {
    let result = driver.execute(|txn| {
        info!("Checking person already exists for GovId {}.", person.gov_id);
        if exists(txn, PERSON_TABLE, Person::GOV_ID_FIELD, &person.gov_id)? {
            info!(
                "Person does exist for GovId {}, aborting transaction and returning not modified.",
                person.gov_id
            );
            txn.abort();
            return Ok(HandlerStatus::NotModified);
        }

        info!("Inserting person for GovId {}.", person.gov_id);
        txn.execute(&Statement::insert(PERSON_TABLE, person)?)?;
        info!("Inserted person for GovId {}, returning OK.", person.gov_id);
        Ok(HandlerStatus::Ok)
    });

    recover_aborted(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{person, test_driver};

    #[test]
    fn test_add_person_then_duplicate() {
        let driver = test_driver();
        let raul = person("LEWISR261LL", "Raul");

        assert_eq!(add_person(&driver, &raul).unwrap(), HandlerStatus::Ok);
        assert_eq!(add_person(&driver, &raul).unwrap(), HandlerStatus::NotModified);

        let rows = driver
            .execute(|txn| txn.execute(&Statement::select_all(PERSON_TABLE)))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["FirstName"], "Raul");
    }

    #[test]
    fn test_same_name_different_gov_id() {
        let driver = test_driver();

        assert_eq!(add_person(&driver, &person("A-1", "Sam")).unwrap(), HandlerStatus::Ok);
        assert_eq!(add_person(&driver, &person("A-2", "Sam")).unwrap(), HandlerStatus::Ok);
    }
}
