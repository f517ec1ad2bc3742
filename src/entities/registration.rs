// Vehicle Registration Entity
//
// Natural key: VIN. Owners are stored by Person document id; in requests the
// same PersonId field carries a GovId that the handlers resolve first.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// OWNERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Owner {
    pub person_id: String,
}

impl Owner {
    pub fn new(person_id: impl Into<String>) -> Self {
        Owner {
            person_id: person_id.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Owners {
    #[serde(default)]
    pub primary_owner: Option<Owner>,

    #[serde(default)]
    pub secondary_owners: Vec<Owner>,
}

impl Owners {
    /// Field path of the secondary owner list inside a registration document
    pub const SECONDARY_OWNERS_PATH: &'static str = "Owners.SecondaryOwners";

    /// Field path of the primary owner's person id
    pub const PRIMARY_OWNER_PATH: &'static str = "Owners.PrimaryOwner.PersonId";

    pub fn with_primary(person_id: impl Into<String>) -> Self {
        Owners {
            primary_owner: Some(Owner::new(person_id)),
            secondary_owners: Vec::new(),
        }
    }

    pub fn has_secondary_owner(&self, person_id: &str) -> bool {
        self.secondary_owners
            .iter()
            .any(|owner| owner.person_id == person_id)
    }
}

// ============================================================================
// REGISTRATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VehicleRegistration {
    #[serde(rename = "VIN")]
    pub vin: String,
    pub license_plate_number: String,
    pub state: String,
    pub city: String,

    #[serde(default)]
    pub pending_penalty_ticket_amount: Option<f64>,
    pub valid_from_date: NaiveDate,
    pub valid_to_date: NaiveDate,

    #[serde(default)]
    pub owners: Owners,
}

impl VehicleRegistration {
    pub const VIN_FIELD: &'static str = "VIN";
    pub const LICENSE_PLATE_FIELD: &'static str = "LicensePlateNumber";
}

/// One revision of a registration, as returned by the history query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VehicleRegistrationHistory {
    pub version: u64,
    pub tx_time: DateTime<Utc>,
    pub vehicle_registration: VehicleRegistration,
}
