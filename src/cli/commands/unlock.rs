//! `passvault unlock`: check the master password and summarize the vault.

use chrono::Utc;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `unlock` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (settings, vault) = open_vault(cli)?;

    output::success("Master password accepted.");

    let expiring = vault
        .expiring_cards(settings.expiry_warning_days, Utc::now().date_naive())?
        .len();

    let mut table = output::table(vec!["Item", "Count"]);
    table.add_row(vec!["Credentials".to_string(), vault.list_credentials()?.len().to_string()]);
    table.add_row(vec!["Notes".to_string(), vault.list_notes()?.len().to_string()]);
    table.add_row(vec!["Cards".to_string(), vault.list_cards()?.len().to_string()]);
    table.add_row(vec!["Collections".to_string(), vault.list_collections()?.len().to_string()]);
    table.add_row(vec!["Files".to_string(), vault.list_files(None)?.len().to_string()]);
    table.add_row(vec!["Backups".to_string(), vault.list_backups()?.len().to_string()]);
    println!("{table}");

    if expiring > 0 {
        output::warning(&format!(
            "{expiring} card(s) expire within {} days. Run `passvault card expiring`.",
            settings.expiry_warning_days
        ));
    }

    Ok(())
}
