//! `passvault backup`: encrypted backups of the whole vault.
//!
//! Usage:
//!   passvault backup create -d "before travel"
//!   passvault backup list
//!   passvault backup verify <ID|NAME>
//!   passvault backup restore <ID|NAME>
//!   passvault backup cleanup

use console::style;

use crate::backup::{BackupRecord, BackupStatus};
use crate::cli::output;
use crate::cli::{confirm, open_locked, open_vault, BackupAction, Cli};
use crate::errors::{Result, VaultError};

/// Execute a `backup` subcommand.
pub fn execute(cli: &Cli, action: &BackupAction) -> Result<()> {
    match action {
        BackupAction::Create { description } => {
            let (_, vault) = open_vault(cli)?;
            let record = vault.create_backup(description.as_deref())?;
            output::success(&format!(
                "Backup {} written ({})",
                record.name,
                output::format_size(record.size)
            ));
            output::tip(&format!("Backup id: {}", record.id));
            Ok(())
        }
        BackupAction::List => {
            let (_, vault) = open_locked(cli)?;
            print_backups_table(&vault.list_backups()?);
            Ok(())
        }
        BackupAction::Verify { id } => {
            // Checksums cover the encrypted artifact, so no password is needed.
            let (_, vault) = open_locked(cli)?;
            if vault.verify_backup(id)? {
                output::success(&format!("Backup {id} is intact."));
                Ok(())
            } else {
                Err(VaultError::IntegrityFailed(format!("backup {id}")))
            }
        }
        BackupAction::Restore { id, force } => {
            let (_, mut vault) = open_vault(cli)?;
            if !confirm(
                &format!("Replace the live vault with backup {id}?"),
                *force,
            )? {
                output::info("Cancelled.");
                return Ok(());
            }
            let report = vault.restore_backup(id)?;
            output::success(&format!(
                "Restored {} (snapshot of {}, {} blobs)",
                report.backup,
                output::timestamp(&report.snapshot_taken_at),
                report.blobs
            ));
            output::tip("The previous store was kept. Run `passvault backup cleanup` to remove it.");
            Ok(())
        }
        BackupAction::Delete { id, force } => {
            if !confirm(&format!("Delete backup {id}?"), *force)? {
                output::info("Cancelled.");
                return Ok(());
            }
            let (_, vault) = open_vault(cli)?;
            let record = vault.delete_backup(id)?;
            output::success(&format!("Deleted backup {}", record.name));
            Ok(())
        }
        BackupAction::Cleanup => {
            let (_, vault) = open_vault(cli)?;
            if vault.cleanup_before_restore()? {
                output::success("Removed the store kept by the last restore.");
            } else {
                output::info("Nothing to clean up.");
            }
            Ok(())
        }
        BackupAction::Stats => {
            let (_, vault) = open_locked(cli)?;
            let stats = vault.backup_statistics()?;
            let when = |at: Option<chrono::DateTime<chrono::Utc>>| {
                at.map_or_else(|| "-".to_string(), |t| output::timestamp(&t))
            };

            let mut table = output::table(vec!["", ""]);
            table.add_row(vec!["Backups".to_string(), stats.count.to_string()]);
            table.add_row(vec!["Total size".to_string(), output::format_size(stats.total_size)]);
            table.add_row(vec!["Latest".to_string(), when(stats.latest)]);
            table.add_row(vec!["Oldest".to_string(), when(stats.oldest)]);
            println!("{table}");
            Ok(())
        }
    }
}

fn print_backups_table(backups: &[BackupRecord]) {
    if backups.is_empty() {
        output::info("No backups yet.");
        output::tip("Run `passvault backup create` to take one.");
        return;
    }

    let mut table = output::table(vec!["ID", "Created", "Size", "Status", "Description"]);
    for b in backups {
        let status = match b.status {
            BackupStatus::Completed => style("completed").green().to_string(),
            BackupStatus::Failed => style("failed").red().to_string(),
        };
        table.add_row(vec![
            b.id.clone(),
            output::timestamp(&b.created_at),
            output::format_size(b.size),
            status,
            output::or_dash(b.description.as_deref()),
        ]);
    }
    println!(
        "{}",
        style(format!("{} backup(s):", backups.len())).bold()
    );
    println!("{table}");
}
