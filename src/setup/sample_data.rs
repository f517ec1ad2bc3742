// Sample Data - five people, their vehicles, licenses and registrations
//
// Loading is check-then-delete-and-reinsert per table, so the ledger ends up
// with exactly one copy no matter how often this runs. Person i owns vehicle
// i and holds license i.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::entities::{
    DriversLicense, Owners, Person, Vehicle, VehicleRegistration, DRIVERS_LICENSE_TABLE,
    PERSON_TABLE, VEHICLE_REGISTRATION_TABLE, VEHICLE_TABLE,
};
use crate::ledger::{LedgerDriver, Statement};

#[derive(Debug, Clone, PartialEq)]
pub struct SampleData {
    pub vehicles: Vec<Vehicle>,
    pub people: Vec<Person>,

    /// `PersonId` is filled in at load time
    pub licenses: Vec<DriversLicense>,

    /// `Owners.PrimaryOwner` is filled in at load time
    pub registrations: Vec<VehicleRegistration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleDataReport {
    pub vehicles: usize,
    pub people: usize,
    pub licenses: usize,
    pub registrations: usize,
}

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d).with_context(|| format!("Invalid sample date {}-{}-{}", y, m, d))
}

fn vehicle(vin: &str, vehicle_type: &str, year: i32, make: &str, model: &str, color: &str) -> Vehicle {
    Vehicle {
        vin: vin.to_string(),
        vehicle_type: vehicle_type.to_string(),
        year,
        make: make.to_string(),
        model: model.to_string(),
        color: color.to_string(),
    }
}

fn person(first: &str, last: &str, dob: NaiveDate, gov_id: &str, gov_id_type: &str, address: &str) -> Person {
    Person {
        first_name: first.to_string(),
        last_name: last.to_string(),
        date_of_birth: dob,
        gov_id: gov_id.to_string(),
        gov_id_type: gov_id_type.to_string(),
        address: address.to_string(),
    }
}

fn license(number: &str, license_type: &str, from: NaiveDate, to: NaiveDate) -> DriversLicense {
    DriversLicense {
        person_id: String::new(),
        license_number: number.to_string(),
        license_type: license_type.to_string(),
        valid_from_date: from,
        valid_to_date: to,
    }
}

fn registration(
    vin: &str,
    plate: &str,
    city: &str,
    penalty: f64,
    from: NaiveDate,
    to: NaiveDate,
) -> VehicleRegistration {
    VehicleRegistration {
        vin: vin.to_string(),
        license_plate_number: plate.to_string(),
        state: "WA".to_string(),
        city: city.to_string(),
        pending_penalty_ticket_amount: Some(penalty),
        valid_from_date: from,
        valid_to_date: to,
        owners: Owners::default(),
    }
}

impl SampleData {
    /// The five-person data set `dmv-ledger setup` loads
    pub fn standard() -> Result<Self> {
        Ok(SampleData {
            vehicles: vec![
                vehicle("1N4AL11D75C109151", "Sedan", 2011, "Audi", "A5", "Silver"),
                vehicle("KM8SRDHF6EU074761", "Sedan", 2015, "Tesla", "Model S", "Blue"),
                vehicle("3HGGK5G53FM761765", "Motorcycle", 2011, "Ducati", "Monster", "Yellow"),
                vehicle("1HVBBAANXWH544237", "Semi", 2009, "Ford", "F 150", "Black"),
                vehicle("1C4RJFAG0FC625797", "Sedan", 2019, "Mercedes", "CLK 350", "White"),
            ],
            people: vec![
                person("Raul", "Lewis", date(1963, 8, 19)?, "LEWISR261LL", "Driver License",
                    "1719 University Street, Seattle, WA, 98109"),
                person("Brent", "Logan", date(1967, 7, 3)?, "LOGANB486CG", "Driver License",
                    "43 Stockert Hollow Road, Everett, WA, 98203"),
                person("Alexis", "Pena", date(1974, 2, 10)?, "744 849 301", "SSN",
                    "4058 Melrose Street, Spokane Valley, WA, 99206"),
                person("Melvin", "Parker", date(1976, 5, 22)?, "P626-168-229-765", "Passport",
                    "4362 Ryder Avenue, Seattle, WA, 98101"),
                person("Salvatore", "Spencer", date(1997, 11, 15)?, "S152-780-97-415-0", "Passport",
                    "4450 Honeysuckle Lane, Seattle, WA, 98101"),
            ],
            licenses: vec![
                license("LEWISR261LL", "Learner", date(2016, 12, 20)?, date(2020, 11, 15)?),
                license("LOGANB486CG", "Probationary", date(2016, 4, 6)?, date(2020, 11, 15)?),
                license("744 849 301", "Full", date(2017, 12, 6)?, date(2022, 10, 15)?),
                license("P626-168-229-765", "Learner", date(2017, 8, 16)?, date(2021, 11, 15)?),
                license("S152-780-97-415-0", "Probationary", date(2015, 8, 15)?, date(2021, 8, 21)?),
            ],
            registrations: vec![
                registration("1N4AL11D75C109151", "LEWISR261LL", "Seattle", 90.25,
                    date(2017, 8, 21)?, date(2020, 5, 11)?),
                registration("KM8SRDHF6EU074761", "CA762X", "Kent", 130.75,
                    date(2017, 9, 14)?, date(2020, 6, 25)?),
                registration("3HGGK5G53FM761765", "CD820Z", "Everett", 442.30,
                    date(2011, 3, 17)?, date(2021, 3, 24)?),
                registration("1HVBBAANXWH544237", "LS477D", "Tacoma", 42.20,
                    date(2011, 10, 26)?, date(2023, 9, 25)?),
                registration("1C4RJFAG0FC625797", "TH393F", "Olympia", 30.45,
                    date(2013, 9, 2)?, date(2023, 9, 25)?),
            ],
        })
    }
}

/// Clear `table` if it has documents, then insert `documents`.
/// Returns the new document ids in insertion order.
fn replace_table<T: Serialize>(driver: &LedgerDriver, table: &str, documents: &[T]) -> Result<Vec<String>> {
    let ids = driver
        .execute(|txn| {
            let existing = txn.execute(&Statement::select_all(table))?;
            if !existing.is_empty() {
                info!("Deleting {} existing documents from {}.", existing.len(), table);
                txn.execute(&Statement::delete_all(table))?;
            }

            let mut ids = Vec::with_capacity(documents.len());
            for document in documents {
                let rows = txn.execute(&Statement::insert(table, document)?)?;
                if let Some(id) = rows
                    .first()
                    .and_then(|row| row.get("documentId"))
                    .and_then(|id| id.as_str())
                {
                    ids.push(id.to_string());
                }
            }
            Ok(ids)
        })
        .with_context(|| format!("Failed to load sample data into {}", table))?;

    info!("Inserted {} documents into {}.", ids.len(), table);
    Ok(ids)
}

pub fn load_sample_data(driver: &LedgerDriver, data: &SampleData) -> Result<SampleDataReport> {
    if data.licenses.len() > data.people.len() || data.registrations.len() > data.people.len() {
        bail!("Sample data needs one person per license and per registration");
    }

    let vehicle_ids = replace_table(driver, VEHICLE_TABLE, &data.vehicles)?;
    let person_ids = replace_table(driver, PERSON_TABLE, &data.people)?;
    if person_ids.len() != data.people.len() {
        bail!("Expected {} person document ids, got {}", data.people.len(), person_ids.len());
    }

    let licenses: Vec<DriversLicense> = data
        .licenses
        .iter()
        .zip(&person_ids)
        .map(|(license, person_id)| DriversLicense {
            person_id: person_id.clone(),
            ..license.clone()
        })
        .collect();
    let license_ids = replace_table(driver, DRIVERS_LICENSE_TABLE, &licenses)?;

    let registrations: Vec<VehicleRegistration> = data
        .registrations
        .iter()
        .zip(&person_ids)
        .map(|(registration, person_id)| VehicleRegistration {
            owners: Owners::with_primary(person_id.as_str()),
            ..registration.clone()
        })
        .collect();
    let registration_ids = replace_table(driver, VEHICLE_REGISTRATION_TABLE, &registrations)?;

    Ok(SampleDataReport {
        vehicles: vehicle_ids.len(),
        people: person_ids.len(),
        licenses: license_ids.len(),
        registrations: registration_ids.len(),
    })
}
