// Drivers License Entity
// Seeded by the setup scripts only; linked to a Person by document id.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DriversLicense {
    /// Person document id (not GovId)
    #[serde(default)]
    pub person_id: String,
    pub license_number: String,

    /// Learner, Probationary, Full
    pub license_type: String,
    pub valid_from_date: NaiveDate,
    pub valid_to_date: NaiveDate,
}

impl DriversLicense {
    pub const LICENSE_NUMBER_FIELD: &'static str = "LicenseNumber";

    /// Indexed so a person's licenses can be found by document id
    pub const PERSON_ID_FIELD: &'static str = "PersonId";
}
