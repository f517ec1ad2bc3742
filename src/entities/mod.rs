// Entity Models - the documents stored in the vehicle-registration ledger
//
// Field names on the wire and in stored documents are PascalCase
// ("GovId", "VIN", "Owners.PrimaryOwner.PersonId").

pub mod person;
pub mod vehicle;
pub mod registration;
pub mod drivers_license;

pub use person::Person;
pub use vehicle::Vehicle;
pub use registration::{Owner, Owners, VehicleRegistration, VehicleRegistrationHistory};
pub use drivers_license::DriversLicense;

// ============================================================================
// TABLE NAMES
// ============================================================================

pub const PERSON_TABLE: &str = "Person";
pub const VEHICLE_TABLE: &str = "Vehicle";
pub const VEHICLE_REGISTRATION_TABLE: &str = "VehicleRegistration";
pub const DRIVERS_LICENSE_TABLE: &str = "DriversLicense";

/// Every table the application expects, in creation order
pub const ALL_TABLES: [&str; 4] = [
    VEHICLE_REGISTRATION_TABLE,
    VEHICLE_TABLE,
    PERSON_TABLE,
    DRIVERS_LICENSE_TABLE,
];
