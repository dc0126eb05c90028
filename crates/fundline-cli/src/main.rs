use anyhow::Result;
use clap::{Parser, Subcommand};
use fundline_core::config::FundlineConfig;
use fundline_core::feed::DonationFeed;
use fundline_core::flow::DonationFlow;
use fundline_core::session::SessionStore;
use fundline_gateways::storage::ConfigFile;
use fundline_gateways::{IdentityApiClient, LedgerApiClient, PaymentApiClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "fundline")]
#[command(about = "Fundline - terminal donation kiosk", long_about = None)]
struct Cli {
    /// Path to an alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the ledger backend base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the donation total and the recent donations, then exit
    Status,
    /// Write a default config.toml and print its path
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::Status) => {
            logging::init_stderr();
            commands::status::run(&config).await
        }
        Some(Commands::InitConfig) => {
            logging::init_stderr();
            commands::init_config::run(cli.config.as_ref())
        }
        None => run_kiosk(config).await,
    }
}

fn load_config(cli: &Cli) -> Result<FundlineConfig> {
    let file = match &cli.config {
        Some(path) => ConfigFile::new(path.clone()),
        None => ConfigFile::at_default_location()?,
    };
    let mut config = file.load_or_default()?;
    if let Some(url) = &cli.api_url {
        config.ledger.base_url = url.clone();
    }
    Ok(config)
}

async fn run_kiosk(config: FundlineConfig) -> Result<()> {
    let log_path = logging::init_file()?;
    info!(ledger = %config.ledger.base_url, "fundline starting");

    let timeout = config.request_timeout();
    let identity = Arc::new(IdentityApiClient::new(&config.identity.base_url, timeout)?);
    let ledger = Arc::new(LedgerApiClient::new(&config.ledger.base_url, timeout)?);
    let payment = Arc::new(PaymentApiClient::new(&config.payment.base_url, timeout)?);

    let feed = DonationFeed::spawn(ledger.clone(), config.poll_interval());
    let store = Arc::new(SessionStore::new());
    let flow = Arc::new(DonationFlow::new(
        store,
        identity,
        ledger,
        payment,
        feed.refresh_handle(),
    ));

    flow.bootstrap().await;
    let _auth_watch = flow.watch_auth();

    let result = fundline_tui::run(flow, &feed, config.feed.funding_goal_dollars).await;
    if result.is_err() {
        eprintln!("fundline exited with an error; see {}", log_path.display());
    }
    result.map_err(Into::into)
}
