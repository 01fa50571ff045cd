//! `passvault passwd`: change the master password.
//!
//! Everything sealed under the master key is re-sealed under the key
//! derived from the new password in one store batch.  Collections with
//! their own secret keep it.

use crate::cli::output;
use crate::cli::{open_locked, prompt_new_password, prompt_password, Cli, NEW_PASSWORD_ENV};
use crate::errors::{Result, VaultError};

/// Execute the `passwd` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (_, mut vault) = open_locked(cli)?;

    output::info("Enter your current master password.");
    let current = prompt_password()?;
    if !vault.verify_master_password(current.clone())? {
        return Err(VaultError::AuthFailed);
    }

    output::info("Choose your new master password.");
    let new = prompt_new_password(NEW_PASSWORD_ENV)?;

    vault.change_master_password(current, new)?;

    output::success("Master password changed.");
    output::tip("Take a new backup: older ones are sealed under the previous master password.");
    Ok(())
}
