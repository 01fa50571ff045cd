//! `passvault file`: files encrypted into collections.
//!
//! Files in a collection with its own secret need that secret for every
//! read and delete (`PASSVAULT_COLLECTION_SECRET` or a prompt).

use std::fs;
use std::path::PathBuf;

use zeroize::Zeroizing;

use crate::cli::commands::note::{default_output, file_name, write_new_file};
use crate::cli::output;
use crate::cli::{collection_secret, confirm, open_vault, Cli, FileAction};
use crate::errors::Result;
use crate::model::EncryptedFile;

/// Execute a `file` subcommand.
pub fn execute(cli: &Cli, action: &FileAction) -> Result<()> {
    match action {
        FileAction::Put {
            collection,
            path,
            name,
        } => {
            let name = match name {
                Some(n) => n.clone(),
                None => file_name(path)?,
            };
            let bytes = Zeroizing::new(fs::read(path)?);
            let (_, mut vault) = open_vault(cli)?;
            let secret = collection_secret(&vault, collection)?;
            let file = vault.put_file(collection, secret, &name, &bytes)?;
            output::success(&format!(
                "Stored '{}' in {} (id {}, {})",
                file.original_name,
                file.collection,
                file.id,
                output::format_size(file.original_size)
            ));
            Ok(())
        }
        FileAction::Get { id, output: out } => {
            let (_, vault) = open_vault(cli)?;
            let file = vault
                .list_files(None)?
                .into_iter()
                .find(|f| f.id == *id);
            let secret = match &file {
                Some(f) => collection_secret(&vault, &f.collection)?,
                None => None,
            };
            let bytes = vault.get_file(*id, secret)?;
            let target = match (out, file) {
                (Some(p), _) => p.clone(),
                (None, Some(f)) => default_output(&f.original_name)?,
                (None, None) => PathBuf::from(format!("file-{id}")),
            };
            write_new_file(&target, &bytes)?;
            output::success(&format!("Wrote {}", target.display()));
            Ok(())
        }
        FileAction::List { collection } => {
            let (_, vault) = open_vault(cli)?;
            print_files_table(&vault.list_files(collection.as_deref())?);
            Ok(())
        }
        FileAction::Delete { id, force } => {
            if !confirm(&format!("Delete file {id}?"), *force)? {
                output::info("Cancelled.");
                return Ok(());
            }
            let (_, mut vault) = open_vault(cli)?;
            let secret = match vault.list_files(None)?.iter().find(|f| f.id == *id) {
                Some(f) => collection_secret(&vault, &f.collection)?,
                None => None,
            };
            vault.delete_file(*id, secret)?;
            output::success(&format!("Deleted file {id}"));
            Ok(())
        }
    }
}

fn print_files_table(files: &[EncryptedFile]) {
    if files.is_empty() {
        output::info("No files stored yet.");
        output::tip("Run `passvault file put <COLLECTION> <PATH>` to store one.");
        return;
    }

    let mut table = output::table(vec!["ID", "Name", "Collection", "Size", "Type", "Uploaded"]);
    for f in files {
        table.add_row(vec![
            f.id.to_string(),
            f.original_name.clone(),
            f.collection.clone(),
            output::format_size(f.original_size),
            output::or_dash(f.mime_type.as_deref()),
            output::timestamp(&f.uploaded_at),
        ]);
    }
    println!("{table}");
}
