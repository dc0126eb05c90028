//! One-shot `status` subcommand: print the total and the recent donations
//! without starting the TUI.

use anyhow::Result;
use fundline_core::config::FundlineConfig;
use fundline_core::gateway::LedgerGateway;
use fundline_gateways::LedgerApiClient;
use fundline_tui::ui::log_line;

pub async fn run(config: &FundlineConfig) -> Result<()> {
    let ledger = LedgerApiClient::new(&config.ledger.base_url, config.request_timeout())?;

    let total = ledger.total_raised().await?;
    println!("TOTAL_RAISED: ${total:.2}");

    let recent = ledger.recent_donations().await?;
    if recent.is_empty() {
        println!("-- no donations yet --");
    }
    for entry in &recent {
        println!("{}", log_line(entry));
    }
    Ok(())
}
