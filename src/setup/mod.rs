// Setup Scripts - bring a store up to a usable vehicle-registration ledger
//
// Every step checks before it acts, so re-running setup is both safe and
// the way to recover from a run that failed halfway.

pub mod indexes;
pub mod ledger;
pub mod sample_data;
pub mod tables;

pub use indexes::{create_indexes, INDEXES};
pub use ledger::ensure_ledger;
pub use sample_data::{load_sample_data, SampleData, SampleDataReport};
pub use tables::create_tables;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::LedgerConfig;
use crate::ledger::{LedgerDriver, LedgerStore};

/// Ledger, tables, indexes and (optionally) sample data, in that order
pub fn run_setup(store: &LedgerStore, config: &LedgerConfig, with_sample_data: bool) -> Result<LedgerDriver> {
    ensure_ledger(store, &config.ledger_name, config.deletion_protection)?;

    let driver = LedgerDriver::connect(store.clone(), &config.ledger_name, config.retry_policy())
        .with_context(|| format!("Failed to connect to ledger {}", config.ledger_name))?;

    create_tables(&driver)?;
    create_indexes(&driver)?;

    if with_sample_data {
        let report = load_sample_data(&driver, &SampleData::standard()?)?;
        info!(
            vehicles = report.vehicles,
            people = report.people,
            licenses = report.licenses,
            registrations = report.registrations,
            "sample data loaded"
        );
    }

    Ok(driver)
}
