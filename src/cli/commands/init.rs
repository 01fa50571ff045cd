//! `passvault init`: create a new vault protected by a master password.

use crate::cli::output;
use crate::cli::{load_context, prompt_new_password, Cli, PASSWORD_ENV};
use crate::crypto::SecureRandom;
use crate::errors::{Result, VaultError};
use crate::vault::Vault;

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (settings, layout) = load_context(cli)?;

    if layout.exists() {
        output::tip("Use `passvault unlock` to check the existing vault.");
        return Err(VaultError::AlreadyExists(format!(
            "vault at {}",
            layout.root().display()
        )));
    }

    let password = prompt_new_password(PASSWORD_ENV)?;
    let vault = Vault::create(layout, password, settings.kdf_params(), SecureRandom::new()?)?;

    output::success(&format!(
        "Vault created at {}",
        vault.layout().root().display()
    ));
    output::tip("Run `passvault credential add <TITLE>` to store your first login.");
    output::tip("Run `passvault backup create` to take an encrypted backup.");

    Ok(())
}
