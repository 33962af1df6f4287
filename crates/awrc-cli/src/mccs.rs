//! MCC list and sub-account command handlers.

use std::sync::Arc;

use awrc_client::Session;
use awrc_core::Ccid;
use awrc_views::AccountsListScreen;
use clap::Subcommand;

use crate::screen_error;

/// Sub-commands available under `mccs`.
#[derive(Debug, Subcommand)]
pub enum MccCommands {
    /// List the MCCs on your account list
    List,
    /// Remove an MCC from your account list
    Delete { mcc: Ccid },
}

pub(crate) async fn run_mccs(session: &Arc<Session>, command: MccCommands) -> anyhow::Result<()> {
    let mut screen = AccountsListScreen::new(Arc::clone(session));
    let mccs = match screen.load().await {
        Ok(mccs) => mccs.to_vec(),
        Err(e) => return Err(screen_error(screen.error_text(), e)),
    };

    match command {
        MccCommands::List => {
            if mccs.is_empty() {
                println!("no MCCs on your account list yet");
                return Ok(());
            }
            println!("{:<15}{:<10}{:<22}NAME", "ID", "CURRENCY", "TIME ZONE");
            for mcc in &mccs {
                println!(
                    "{:<15}{:<10}{:<22}{}",
                    mcc.top_account_id.formatted(),
                    mcc.currency_code.as_deref().unwrap_or("-"),
                    mcc.date_time_zone.as_deref().unwrap_or("-"),
                    mcc.display_name()
                );
            }
        }
        MccCommands::Delete { mcc } => {
            // Same check the list screen applies before navigating.
            screen.select(mcc)?;
            screen.delete(mcc).await?;
            println!("removed {mcc}; {} MCCs left", screen.mccs().len());
        }
    }
    Ok(())
}

/// List sub-accounts of an MCC.
///
/// # Errors
///
/// Returns an error if the MCC is unknown or the request fails.
pub(crate) async fn run_accounts(session: &Session, mcc: Ccid, live: bool) -> anyhow::Result<()> {
    let accounts = session
        .list_accounts(mcc, live)
        .await
        .map_err(|e| anyhow::anyhow!(e.failure().describe("Unable to load accounts for this MCC")))?;

    if accounts.is_empty() {
        println!("no {}sub-accounts under {mcc}", if live { "live " } else { "" });
        return Ok(());
    }
    println!("{:<15}{:<10}NAME", "ID", "CURRENCY");
    for account in &accounts {
        println!(
            "{:<15}{:<10}{}",
            account.id.formatted(),
            account.currency_code.as_deref().unwrap_or("-"),
            account.display_name()
        );
    }
    println!("{} accounts", accounts.len());
    Ok(())
}
