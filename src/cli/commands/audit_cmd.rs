//! `passvault audit`: display the audit log.
//!
//! Usage:
//!   passvault audit               # show last 50 entries
//!   passvault audit --last 20     # show last 20
//!   passvault audit --since 7d    # entries from last 7 days

use chrono::Utc;

use crate::cli::{load_context, Cli};
use crate::errors::{Result, VaultError};

#[cfg(feature = "audit-log")]
use crate::audit::{AuditEntry, AuditLog};
#[cfg(feature = "audit-log")]
use crate::cli::output;

/// Execute the `audit` command.
#[cfg(feature = "audit-log")]
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let (_, layout) = load_context(cli)?;

    let audit = AuditLog::open(&layout.audit_db())
        .ok_or_else(|| VaultError::Audit("failed to open audit database".into()))?;

    let since_dt = match since {
        Some(s) => Some(parse_duration(s)?),
        None => None,
    };

    let entries = audit.query(last, since_dt)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);

    Ok(())
}

#[cfg(not(feature = "audit-log"))]
pub fn execute(cli: &Cli, _last: usize, since: Option<&str>) -> Result<()> {
    let _ = load_context(cli)?;
    if let Some(s) = since {
        parse_duration(s)?;
    }
    Err(VaultError::CommandFailed(
        "this build has no audit log (enable the `audit-log` feature)".into(),
    ))
}

/// Parse a human-friendly duration string like "7d", "24h", "30m".
fn parse_duration(input: &str) -> Result<chrono::DateTime<Utc>> {
    let input = input.trim();

    let (num_str, unit) = if let Some(s) = input.strip_suffix('d') {
        (s, 'd')
    } else if let Some(s) = input.strip_suffix('h') {
        (s, 'h')
    } else if let Some(s) = input.strip_suffix('m') {
        (s, 'm')
    } else {
        return Err(VaultError::CommandFailed(format!(
            "invalid duration '{input}', use a format like 7d, 24h, or 30m"
        )));
    };

    let num: i64 = num_str.parse().map_err(|_| {
        VaultError::CommandFailed(format!(
            "invalid duration '{input}': number part is not valid"
        ))
    })?;

    let duration = match unit {
        'd' => chrono::Duration::days(num),
        'h' => chrono::Duration::hours(num),
        _ => chrono::Duration::minutes(num),
    };

    Ok(Utc::now() - duration)
}

/// Print audit entries in a formatted table.
#[cfg(feature = "audit-log")]
pub fn print_audit_table(entries: &[AuditEntry]) {
    use console::style;

    let mut table = output::table(vec!["Time", "Operation", "Subject", "Details"]);

    for entry in entries {
        table.add_row(vec![
            output::timestamp(&entry.timestamp),
            colorize_operation(&entry.operation),
            output::or_dash(entry.subject.as_deref()),
            output::or_dash(entry.details.as_deref()),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

/// Colorize operation names by their verb (`credential.add` -> green).
#[cfg(feature = "audit-log")]
fn colorize_operation(op: &str) -> String {
    use console::style;

    let verb = op.rsplit('.').next().unwrap_or(op);
    match verb {
        "create" | "add" | "attach" | "put" => style(op).green().to_string(),
        "update" | "passwd" | "protect" | "unprotect" => style(op).blue().to_string(),
        "delete" | "detach" | "cleanup" => style(op).red().to_string(),
        "restore" | "verify" => style(op).cyan().to_string(),
        "unlock_failed" | "restore_failed" => style(op).red().bold().to_string(),
        "reveal" => style(op).yellow().to_string(),
        _ => op.to_string(),
    }
}
