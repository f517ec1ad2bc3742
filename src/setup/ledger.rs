// Create the ledger if it does not exist, then wait for it to be ACTIVE

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::ledger::{LedgerClient, LedgerDescription, LedgerStore};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const MAX_POLLS: u32 = 50;

pub fn ensure_ledger(
    store: &LedgerStore,
    name: &str,
    deletion_protection: bool,
) -> Result<LedgerDescription> {
    let client = LedgerClient::new(store.clone());

    info!("Checking if ledger {} exists.", name);
    if !client.ledger_exists(name)? {
        info!("Ledger doesn't exist, creating.");
        client
            .create_ledger(name, deletion_protection)
            .with_context(|| format!("Failed to create ledger {}", name))?;
    }

    info!("Waiting for ledger to become active.");
    let description = client.wait_until_active(name, POLL_INTERVAL, MAX_POLLS)?;
    info!("Ledger is active.");
    Ok(description)
}
