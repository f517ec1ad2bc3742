// Ledger Client - control-plane operations on the ledger itself
//
// A store hosts at most one ledger. Creation is synchronous here, but the
// state machine (CREATING -> ACTIVE) is kept so callers wait the same way
// they would for a remote service.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::store::LedgerStore;
use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerState {
    Creating,
    Active,
    Deleting,
}

impl LedgerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerState::Creating => "CREATING",
            LedgerState::Active => "ACTIVE",
            LedgerState::Deleting => "DELETING",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATING" => Some(LedgerState::Creating),
            "ACTIVE" => Some(LedgerState::Active),
            "DELETING" => Some(LedgerState::Deleting),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerDescription {
    pub name: String,
    pub state: LedgerState,
    pub deletion_protection: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct LedgerClient {
    store: LedgerStore,
}

impl LedgerClient {
    pub fn new(store: LedgerStore) -> Self {
        LedgerClient { store }
    }

    pub fn list_ledgers(&self) -> LedgerResult<Vec<LedgerDescription>> {
        self.store.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, state, deletion_protection, created_at FROM ledgers ORDER BY name",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, bool>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(name, state, deletion_protection, created_at)| {
                    to_description(name, &state, deletion_protection, &created_at)
                })
                .collect()
        })
    }

    pub fn ledger_exists(&self, name: &str) -> LedgerResult<bool> {
        Ok(self.list_ledgers()?.iter().any(|ledger| ledger.name == name))
    }

    pub fn describe_ledger(&self, name: &str) -> LedgerResult<LedgerDescription> {
        self.list_ledgers()?
            .into_iter()
            .find(|ledger| ledger.name == name)
            .ok_or_else(|| LedgerError::LedgerNotFound(name.to_string()))
    }

    /// Create the ledger. Fails if the store already hosts one.
    pub fn create_ledger(
        &self,
        name: &str,
        deletion_protection: bool,
    ) -> LedgerResult<LedgerDescription> {
        self.store.with_connection(|conn| {
            let existing: Option<String> = conn
                .query_row("SELECT name FROM ledgers LIMIT 1", [], |row| row.get(0))
                .optional()?;
            if let Some(existing) = existing {
                return Err(LedgerError::LedgerAlreadyExists(existing));
            }

            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO ledgers (name, state, deletion_protection, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![name, LedgerState::Creating.as_str(), deletion_protection, now],
            )?;
            debug!(ledger = name, "ledger record created");

            // Nothing to provision for an embedded store
            conn.execute(
                "UPDATE ledgers SET state = ?1 WHERE name = ?2",
                params![LedgerState::Active.as_str(), name],
            )?;
            Ok(())
        })?;

        info!(ledger = name, deletion_protection, "ledger created");
        self.describe_ledger(name)
    }

    /// Poll until the ledger is ACTIVE, at most `max_polls` times
    pub fn wait_until_active(
        &self,
        name: &str,
        poll_interval: Duration,
        max_polls: u32,
    ) -> LedgerResult<LedgerDescription> {
        let mut polls = 0;
        loop {
            let description = self.describe_ledger(name)?;
            if description.state == LedgerState::Active {
                return Ok(description);
            }

            polls += 1;
            if polls >= max_polls {
                return Err(LedgerError::LedgerNotActive {
                    name: name.to_string(),
                    state: description.state.as_str().to_string(),
                });
            }
            debug!(ledger = name, state = description.state.as_str(), "waiting for ledger");
            std::thread::sleep(poll_interval);
        }
    }
}

fn to_description(
    name: String,
    state: &str,
    deletion_protection: bool,
    created_at: &str,
) -> LedgerResult<LedgerDescription> {
    let state = LedgerState::parse(state).ok_or_else(|| {
        LedgerError::InvalidDocument(format!("unknown ledger state {:?}", state))
    })?;
    let created_at = DateTime::parse_from_rfc3339(created_at)
        .map_err(|e| LedgerError::InvalidDocument(format!("bad ledger timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(LedgerDescription {
        name,
        state,
        deletion_protection,
        created_at,
    })
}
