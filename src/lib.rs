// DMV Ledger - Core Library
// Exposes all modules for use in the setup CLI, the API server, and tests

pub mod config;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod metadata;
pub mod setup;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{LedgerConfig, ServerConfig};
pub use entities::{
    DriversLicense, Owner, Owners, Person, Vehicle, VehicleRegistration,
    VehicleRegistrationHistory,
};
pub use error::{LedgerError, LedgerResult};
pub use handlers::{
    add_person, add_secondary_owner, add_vehicle, add_vehicle_registration,
    find_vehicles_by_owner, query_registration_history, verify_registration, HandlerStatus,
    QueryResponse, SecondaryOwnerRequest,
};
pub use ledger::{
    LedgerClient, LedgerDescription, LedgerDriver, LedgerState, LedgerStore, RetryPolicy,
    Statement, VerificationReport,
};
pub use metadata::get_document_id;
pub use setup::run_setup;
