//! `passvault note`: secure notes and their attachments.

use std::fs;
use std::path::{Path, PathBuf};

use console::style;
use zeroize::Zeroizing;

use crate::cli::commands::credential::favorite_title;
use crate::cli::output;
use crate::cli::{confirm, open_vault, Cli, NoteAction};
use crate::errors::{Result, VaultError};
use crate::model::{NoteCategory, SecureNote};

/// Execute a `note` subcommand.
pub fn execute(cli: &Cli, action: &NoteAction) -> Result<()> {
    match action {
        NoteAction::Add {
            title,
            category,
            body,
            tags,
        } => {
            let category = parse_category(category)?;
            let (_, mut vault) = open_vault(cli)?;
            let body = match body {
                Some(b) => Zeroizing::new(b.clone()),
                None => Zeroizing::new(
                    dialoguer::Input::<String>::new()
                        .with_prompt("Note")
                        .interact_text()
                        .map_err(|e| VaultError::CommandFailed(format!("note prompt: {e}")))?,
                ),
            };
            let note = vault.add_note(title, category, &body, tags.clone())?;
            output::success(&format!("Added note '{}' (id {})", note.title, note.id));
            Ok(())
        }
        NoteAction::List {
            search,
            category,
            favorites,
        } => {
            let category = category.as_deref().map(parse_category).transpose()?;
            let (_, vault) = open_vault(cli)?;
            let mut notes = match (search, category) {
                (Some(query), _) => vault.search_notes(query)?,
                (None, Some(category)) => vault.list_notes_by_category(category)?,
                (None, None) => vault.list_notes()?,
            };
            if let Some(category) = category {
                notes.retain(|n| n.category == category);
            }
            if *favorites {
                notes.retain(|n| n.favorite);
            }
            print_notes_table(&notes);
            Ok(())
        }
        NoteAction::Favorite { id, off } => {
            let (_, mut vault) = open_vault(cli)?;
            let note = vault.set_note_favorite(*id, !*off)?;
            if note.favorite {
                output::success(&format!("Note '{}' is now a favorite", note.title));
            } else {
                output::success(&format!("Note '{}' is no longer a favorite", note.title));
            }
            Ok(())
        }
        NoteAction::Show { id } => {
            let (_, vault) = open_vault(cli)?;
            let note = vault.get_note(*id)?;
            let body = vault.read_note(*id)?;

            println!(
                "{} {}",
                style(&note.title).bold(),
                style(format!("[{}]", note.category.display_name())).dim()
            );
            println!("{}", body.as_str());

            let attachments = vault.list_attachments(*id)?;
            if !attachments.is_empty() {
                let mut table = output::table(vec!["Attachment", "Name", "Size", "Type"]);
                for a in &attachments {
                    table.add_row(vec![
                        a.id.to_string(),
                        a.original_name.clone(),
                        output::format_size(a.size),
                        output::or_dash(a.mime_type.as_deref()),
                    ]);
                }
                println!("{table}");
            }
            Ok(())
        }
        NoteAction::Attach { id, path } => {
            let name = file_name(path)?;
            let bytes = Zeroizing::new(fs::read(path)?);
            let (_, mut vault) = open_vault(cli)?;
            let attachment = vault.attach_file(*id, &name, &bytes)?;
            output::success(&format!(
                "Attached '{}' to note {id} (attachment {})",
                attachment.original_name, attachment.id
            ));
            Ok(())
        }
        NoteAction::Export {
            attachment_id,
            output: out,
        } => {
            let (_, vault) = open_vault(cli)?;
            let bytes = vault.read_attachment(*attachment_id)?;
            let target = match out {
                Some(p) => p.clone(),
                None => default_output(&vault.get_attachment(*attachment_id)?.original_name)?,
            };
            write_new_file(&target, &bytes)?;
            output::success(&format!("Wrote {}", target.display()));
            Ok(())
        }
        NoteAction::Delete { id, force } => {
            if !confirm(&format!("Delete note {id} and its attachments?"), *force)? {
                output::info("Cancelled.");
                return Ok(());
            }
            let (_, mut vault) = open_vault(cli)?;
            vault.delete_note(*id)?;
            output::success(&format!("Deleted note {id}"));
            Ok(())
        }
    }
}

fn parse_category(name: &str) -> Result<NoteCategory> {
    NoteCategory::parse(name).ok_or_else(|| {
        let all: Vec<&str> = NoteCategory::ALL.iter().map(|c| c.display_name()).collect();
        VaultError::InvalidInput(format!(
            "unknown category '{name}' (expected one of: {})",
            all.join(", ")
        ))
    })
}

/// The final path component, as the name stored in the vault.
pub(crate) fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| VaultError::InvalidInput(format!("'{}' has no file name", path.display())))
}

/// Output path for a stored name: its last component, in the current
/// directory.
pub(crate) fn default_output(stored_name: &str) -> Result<PathBuf> {
    match Path::new(stored_name).file_name() {
        Some(name) => Ok(PathBuf::from(name)),
        None => Err(VaultError::InvalidInput(format!(
            "stored name '{}' is not usable as a path; pass --output",
            stored_name.escape_debug()
        ))),
    }
}

/// Write decrypted bytes to a path that must not exist yet.
pub(crate) fn write_new_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if path.exists() {
        return Err(VaultError::AlreadyExists(format!("{}", path.display())));
    }
    fs::write(path, bytes)?;
    Ok(())
}

fn print_notes_table(notes: &[SecureNote]) {
    if notes.is_empty() {
        output::info("No notes in this vault yet.");
        output::tip("Run `passvault note add <TITLE>` to add one.");
        return;
    }

    let mut table = output::table(vec!["ID", "Title", "Category", "Attachments", "Updated"]);
    for n in notes {
        table.add_row(vec![
            n.id.to_string(),
            favorite_title(&n.title, n.favorite),
            n.category.display_name().to_string(),
            if n.has_attachments { "yes" } else { "-" }.to_string(),
            output::timestamp(&n.last_modified),
        ]);
    }
    println!("{table}");
}
