// Person Entity
// Natural key: GovId. Other documents refer to a person by document id.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A registered person (vehicle owner, license holder)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Person {
    pub first_name: String,
    pub last_name: String,

    /// Serialized as `YYYY-MM-DD`
    pub date_of_birth: NaiveDate,

    /// Government-issued identifier (license number, SSN, passport)
    pub gov_id: String,
    pub gov_id_type: String,
    pub address: String,
}

impl Person {
    /// Field used by lookups and the unique-ish index on the Person table
    pub const GOV_ID_FIELD: &'static str = "GovId";
}
