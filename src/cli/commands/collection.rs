//! `passvault collection`: named groups of files and how they are keyed.
//!
//! A collection is protected either by the master key or by its own
//! secret.  `protect` and `unprotect` switch between the two and re-seal
//! the collection's files.

use crate::cli::output;
use crate::cli::{collection_secret, new_collection_secret, open_vault, Cli, CollectionAction};
use crate::errors::{Result, VaultError};
use crate::model::{Collection, CollectionKind};

/// Execute a `collection` subcommand.
pub fn execute(cli: &Cli, action: &CollectionAction) -> Result<()> {
    match action {
        CollectionAction::Create {
            name,
            kind,
            protect,
        } => {
            let kind = parse_kind(kind)?;
            let (_, mut vault) = open_vault(cli)?;
            let secret = if *protect {
                Some(new_collection_secret(name)?)
            } else {
                None
            };
            let collection = vault.create_collection(name, kind, secret)?;
            output::success(&format!(
                "Created collection '{}' ({})",
                collection.name,
                protection(&collection)
            ));
            Ok(())
        }
        CollectionAction::Protect { name } => {
            let (_, mut vault) = open_vault(cli)?;
            let current = collection_secret(&vault, name)?;
            let new = new_collection_secret(name)?;
            vault.set_collection_secret(name, current, Some(new))?;
            output::success(&format!("Collection '{name}' now has its own secret."));
            output::tip("Keep this secret safe: it is not recoverable from the master password.");
            Ok(())
        }
        CollectionAction::Unprotect { name } => {
            let (_, mut vault) = open_vault(cli)?;
            if !vault.has_separate_secret(name)? {
                output::info(&format!("Collection '{name}' already uses the master key."));
                return Ok(());
            }
            let current = collection_secret(&vault, name)?;
            vault.set_collection_secret(name, current, None)?;
            output::success(&format!("Collection '{name}' now uses the master key."));
            Ok(())
        }
        CollectionAction::List => {
            let (_, vault) = open_vault(cli)?;
            let files = vault.list_files(None)?;
            let collections = vault.list_collections()?;
            if collections.is_empty() {
                output::info("No collections yet.");
                output::tip("Run `passvault collection create <NAME>` to add one.");
                return Ok(());
            }

            let mut table = output::table(vec!["Name", "Kind", "Protection", "Files", "Created"]);
            for c in &collections {
                let count = files.iter().filter(|f| f.collection == c.name).count();
                table.add_row(vec![
                    c.name.clone(),
                    c.kind.display_name().to_string(),
                    protection(c).to_string(),
                    count.to_string(),
                    output::timestamp(&c.created_at),
                ]);
            }
            println!("{table}");
            Ok(())
        }
    }
}

fn parse_kind(name: &str) -> Result<CollectionKind> {
    CollectionKind::parse(name).ok_or_else(|| {
        let all: Vec<&str> = CollectionKind::ALL.iter().map(|k| k.display_name()).collect();
        VaultError::InvalidInput(format!(
            "unknown collection kind '{name}' (expected one of: {})",
            all.join(", ")
        ))
    })
}

fn protection(collection: &Collection) -> &'static str {
    if collection.descriptor.has_separate_secret() {
        "own secret"
    } else {
        "master key"
    }
}
