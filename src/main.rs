// DMV Ledger - Setup CLI
//
//   dmv-ledger setup [--no-sample-data]
//   dmv-ledger tables
//   dmv-ledger verify --vin <VIN>

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use dmv_ledger::config::init_logging;
use dmv_ledger::{run_setup, verify_registration, HandlerStatus, LedgerConfig, LedgerDriver};

#[derive(Parser)]
#[command(name = "dmv-ledger", version, about = "Vehicle registration ledger setup and inspection")]
struct Cli {
    #[command(flatten)]
    ledger: LedgerConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the ledger, tables and indexes, then load sample data
    Setup {
        /// Skip the sample people, vehicles, licenses and registrations
        #[arg(long)]
        no_sample_data: bool,
    },
    /// List tables and their indexed fields
    Tables,
    /// Check the revision hash chain of a vehicle registration
    Verify {
        #[arg(long)]
        vin: String,
    },
}

fn main() -> Result<()> {
    init_logging("info");
    let cli = Cli::parse();

    let store = cli
        .ledger
        .open_store()
        .with_context(|| format!("Failed to open {}", cli.ledger.database.display()))?;

    match cli.command {
        Command::Setup { no_sample_data } => {
            println!("🗄️  DMV Ledger setup");
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            let driver = run_setup(&store, &cli.ledger, !no_sample_data)?;
            println!("✓ Ledger {} is ready", driver.ledger_name());
            print_tables(&driver)?;
        }
        Command::Tables => {
            let driver = connect(store, &cli.ledger)?;
            print_tables(&driver)?;
        }
        Command::Verify { vin } => {
            let driver = connect(store, &cli.ledger)?;
            let response = verify_registration(&driver, &vin)?;
            if response.status == HandlerStatus::Conflict {
                anyhow::bail!("Verification of VIN {} aborted after repeated conflicts", vin);
            }
            match response.items.into_iter().next() {
                Some(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    if !report.verified {
                        anyhow::bail!("Revision chain for VIN {} does not verify", vin);
                    }
                    println!("✓ {} revisions verified", report.revisions);
                }
                None => anyhow::bail!("No vehicle registration found for VIN {}", vin),
            }
        }
    }

    Ok(())
}

fn connect(store: dmv_ledger::LedgerStore, config: &LedgerConfig) -> Result<LedgerDriver> {
    LedgerDriver::connect(store, &config.ledger_name, config.retry_policy()).with_context(|| {
        format!(
            "Failed to connect to ledger {} (run `dmv-ledger setup` first)",
            config.ledger_name
        )
    })
}

fn print_tables(driver: &LedgerDriver) -> Result<()> {
    let tables = driver.list_tables()?;
    info!("{} tables in ledger {}", tables.len(), driver.ledger_name());

    println!("\n📋 Tables:");
    for table in tables {
        if table.indexes.is_empty() {
            println!("  {}", table.name);
        } else {
            println!("  {} (indexed: {})", table.name, table.indexes.join(", "));
        }
    }
    Ok(())
}
