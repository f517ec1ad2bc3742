// Create the application tables that are not there yet

use anyhow::{Context, Result};
use tracing::info;

use crate::entities::ALL_TABLES;
use crate::ledger::{LedgerDriver, Statement};

/// Returns the tables created by this call
pub fn create_tables(driver: &LedgerDriver) -> Result<Vec<String>> {
    let existing = driver.list_table_names()?;
    let mut created = Vec::new();

    for table in ALL_TABLES {
        if existing.iter().any(|name| name == table) {
            info!("Table {} already exists, ignoring.", table);
            continue;
        }

        info!("Table does not exist, creating table with name {}.", table);
        driver
            .execute(|txn| txn.execute(&Statement::create_table(table)))
            .with_context(|| format!("Failed to create table {}", table))?;
        created.push(table.to_string());
    }

    Ok(created)
}
