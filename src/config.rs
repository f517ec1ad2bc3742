// Configuration - command-line flags with environment fallbacks
//
// Shared by the setup CLI and the HTTP server.

use clap::{ArgAction, Args};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::error::LedgerResult;
use crate::ledger::{LedgerStore, RetryPolicy};

pub const DEFAULT_LEDGER_NAME: &str = "vehicle-registration";

/// Where the ledger lives and how the driver talks to it
#[derive(Debug, Clone, Args)]
pub struct LedgerConfig {
    /// SQLite file backing the ledger
    #[arg(long = "db", env = "DMV_LEDGER_DB", default_value = "vehicle-registration.db")]
    pub database: PathBuf,

    /// Ledger name
    #[arg(long, env = "DMV_LEDGER_NAME", default_value = DEFAULT_LEDGER_NAME)]
    pub ledger_name: String,

    /// Driver retries for conflicting transactions
    #[arg(long, env = "DMV_MAX_RETRIES", default_value_t = 4)]
    pub max_retries: u32,

    /// Deletion protection flag recorded when the ledger is created
    #[arg(long, env = "DMV_DELETION_PROTECTION", default_value_t = true, action = ArgAction::Set)]
    pub deletion_protection: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database: PathBuf::from("vehicle-registration.db"),
            ledger_name: DEFAULT_LEDGER_NAME.to_string(),
            max_retries: 4,
            deletion_protection: true,
        }
    }
}

impl LedgerConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_retries(self.max_retries)
    }

    pub fn open_store(&self) -> LedgerResult<LedgerStore> {
        LedgerStore::open(&self.database)
    }
}

/// HTTP bind address
#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    #[arg(long, env = "DMV_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "DMV_PORT", default_value_t = 3000)]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `RUST_LOG` wins; otherwise `default_directive` (e.g. "info")
pub fn init_logging(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        ledger: LedgerConfig,
        #[command(flatten)]
        server: ServerConfig,
    }

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.ledger_name, "vehicle-registration");
        assert_eq!(config.retry_policy().max_retries, 4);
        assert_eq!(ServerConfig::default().socket_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::try_parse_from([
            "dmv",
            "--db",
            "/tmp/dmv.db",
            "--max-retries",
            "9",
            "--deletion-protection",
            "false",
            "--port",
            "8080",
        ])
        .unwrap();

        assert_eq!(cli.ledger.database, PathBuf::from("/tmp/dmv.db"));
        assert_eq!(cli.ledger.max_retries, 9);
        assert!(!cli.ledger.deletion_protection);
        assert_eq!(cli.server.socket_addr(), "0.0.0.0:8080");
    }
}
