// DMV Ledger - Web Server
// REST API over the vehicle-registration ledger

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use dmv_ledger::api::{router, AppState};
use dmv_ledger::config::init_logging;
use dmv_ledger::{run_setup, LedgerConfig, ServerConfig};

#[derive(Parser)]
#[command(name = "dmv-server", version, about = "Vehicle registration ledger HTTP API")]
struct Cli {
    #[command(flatten)]
    ledger: LedgerConfig,

    #[command(flatten)]
    server: ServerConfig,

    /// Load the sample data set on startup
    #[arg(long, env = "DMV_SAMPLE_DATA")]
    sample_data: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging("info,tower_http=debug");
    let cli = Cli::parse();

    let store = cli
        .ledger
        .open_store()
        .with_context(|| format!("Failed to open {}", cli.ledger.database.display()))?;

    // Setup is idempotent, so every start brings the ledger up to date
    let driver = run_setup(&store, &cli.ledger, cli.sample_data)?;
    let app = router(AppState { driver });

    let addr = cli.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🚀 DMV ledger API listening on http://{}", addr);
    info!("   POST /persons");
    info!("   POST /vehicles");
    info!("   POST /vehicle-registrations");
    info!("   POST /vehicle-registrations/secondary-owners");
    info!("   GET  /vehicles?GovId=");
    info!("   GET  /vehicle-registrations/history?VIN=");
    info!("   GET  /vehicle-registrations/verify?VIN=");

    axum::serve(listener, app).await?;
    Ok(())
}
