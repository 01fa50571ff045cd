//! `passvault credential`: website and service logins.
//!
//! Usage:
//!   passvault credential add GitHub --username octo --url https://github.com
//!   passvault credential list
//!   passvault credential show 3
//!   passvault credential delete 3

use console::style;
use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{confirm, open_vault, Cli, CredentialAction};
use crate::errors::{Result, VaultError};
use crate::model::{Credential, NewCredential};

/// Execute a `credential` subcommand.
pub fn execute(cli: &Cli, action: &CredentialAction) -> Result<()> {
    match action {
        CredentialAction::Add {
            title,
            username,
            email,
            url,
            password,
            tags,
        } => {
            let (_, mut vault) = open_vault(cli)?;
            let secret = match password {
                Some(p) => Zeroizing::new(p.clone()),
                None => prompt_entry_password(title)?,
            };
            let new = NewCredential {
                title: title.clone(),
                username: username.clone(),
                email: email.clone(),
                url: url.clone(),
                tags: tags.clone(),
                ..NewCredential::default()
            };
            let credential = vault.add_credential(new, &secret)?;
            output::success(&format!("Added '{}' (id {})", credential.title, credential.id));
            Ok(())
        }
        CredentialAction::List { search, favorites } => {
            let (_, vault) = open_vault(cli)?;
            let mut credentials = match search {
                Some(query) => vault.search_credentials(query)?,
                None => vault.list_credentials()?,
            };
            if *favorites {
                credentials.retain(|c| c.favorite);
            }
            print_credentials_table(&credentials);
            Ok(())
        }
        CredentialAction::Favorite { id, off } => {
            let (_, mut vault) = open_vault(cli)?;
            let credential = vault.set_credential_favorite(*id, !*off)?;
            if credential.favorite {
                output::success(&format!("'{}' is now a favorite", credential.title));
            } else {
                output::success(&format!("'{}' is no longer a favorite", credential.title));
            }
            Ok(())
        }
        CredentialAction::Show { id } => {
            let (_, vault) = open_vault(cli)?;
            let credential = vault.get_credential(*id)?;
            let password = vault.reveal_password(*id)?;

            println!("{}", style(&credential.title).bold());
            println!("  Username: {}", output::or_dash(credential.username.as_deref()));
            println!("  Email:    {}", output::or_dash(credential.email.as_deref()));
            println!("  URL:      {}", output::or_dash(credential.url.as_deref()));
            println!("  Password: {}", password.as_str());
            if !credential.tags.is_empty() {
                println!("  Tags:     {}", credential.tags.join(", "));
            }
            Ok(())
        }
        CredentialAction::Delete { id, force } => {
            if !confirm(&format!("Delete credential {id}?"), *force)? {
                output::info("Cancelled.");
                return Ok(());
            }
            let (_, mut vault) = open_vault(cli)?;
            vault.delete_credential(*id)?;
            output::success(&format!("Deleted credential {id}"));
            Ok(())
        }
    }
}

fn prompt_entry_password(title: &str) -> Result<Zeroizing<String>> {
    let value = dialoguer::Password::new()
        .with_prompt(format!("Password for '{title}'"))
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(value))
}

/// Title with a star for favorites.
pub(crate) fn favorite_title(title: &str, favorite: bool) -> String {
    if favorite {
        format!("{title} {}", style("\u{2605}").yellow())
    } else {
        title.to_string()
    }
}

fn print_credentials_table(credentials: &[Credential]) {
    if credentials.is_empty() {
        output::info("No credentials in this vault yet.");
        output::tip("Run `passvault credential add <TITLE>` to add one.");
        return;
    }

    let mut table = output::table(vec!["ID", "Title", "Username", "URL", "Updated"]);
    for c in credentials {
        table.add_row(vec![
            c.id.to_string(),
            favorite_title(&c.title, c.favorite),
            output::or_dash(c.username.as_deref().or(c.email.as_deref())),
            output::or_dash(c.url.as_deref()),
            output::timestamp(&c.last_modified),
        ]);
    }
    println!("{table}");
}
