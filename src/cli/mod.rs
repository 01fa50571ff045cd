//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::{Password, SecureRandom};
use crate::errors::{Result, VaultError};
use crate::store::VaultLayout;
use crate::vault::Vault;

/// Minimum master password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Master password, read before any prompt.
pub const PASSWORD_ENV: &str = "PASSVAULT_PASSWORD";
/// New master password for `passwd`.
pub const NEW_PASSWORD_ENV: &str = "PASSVAULT_NEW_PASSWORD";
/// Current secret of a protected collection.
pub const COLLECTION_SECRET_ENV: &str = "PASSVAULT_COLLECTION_SECRET";
/// Secret to set on a collection.
pub const NEW_COLLECTION_SECRET_ENV: &str = "PASSVAULT_NEW_COLLECTION_SECRET";

/// PassVault CLI: local encrypted vault for passwords, notes, ID cards and files.
#[derive(Parser)]
#[command(
    name = "passvault",
    about = "Local encrypted vault for passwords, notes, identity cards and files",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault directory (default: `vault_dir` from .passvault.toml, else .passvault)
    #[arg(long, global = true)]
    pub vault_dir: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault protected by a master password
    Init,

    /// Check the master password and show what the vault holds
    Unlock,

    /// Change the master password (re-seals everything it protects)
    Passwd,

    /// Website and service logins
    Credential {
        #[command(subcommand)]
        action: CredentialAction,
    },

    /// Secure notes and their attachments
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },

    /// Identity documents and payment cards
    Card {
        #[command(subcommand)]
        action: CardAction,
    },

    /// Files stored in collections
    File {
        #[command(subcommand)]
        action: FileAction,
    },

    /// Collections and their protection
    Collection {
        #[command(subcommand)]
        action: CollectionAction,
    },

    /// Encrypted backups of the whole vault
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },
}

#[derive(clap::Subcommand)]
pub enum CredentialAction {
    /// Add a login
    Add {
        title: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        url: Option<String>,
        /// Password (omit for interactive prompt)
        #[arg(long)]
        password: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List logins (passwords stay sealed)
    List {
        /// Only titles containing this text
        #[arg(long)]
        search: Option<String>,
        /// Only favorites
        #[arg(long)]
        favorites: bool,
    },
    /// Show a login and its password
    Show { id: u64 },
    /// Mark a login as favorite (or clear it with --off)
    Favorite {
        id: u64,
        #[arg(long)]
        off: bool,
    },
    /// Delete a login
    Delete {
        id: u64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(clap::Subcommand)]
pub enum NoteAction {
    /// Add a note
    Add {
        title: String,
        /// Personal, Work, Financial, Medical or Other
        #[arg(long, default_value = "Personal")]
        category: String,
        /// Note body (omit for interactive prompt)
        #[arg(long)]
        body: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List notes
    List {
        /// Only titles containing this text
        #[arg(long)]
        search: Option<String>,
        /// Only notes in this category
        #[arg(long)]
        category: Option<String>,
        /// Only favorites
        #[arg(long)]
        favorites: bool,
    },
    /// Show a note's body and attachments
    Show { id: u64 },
    /// Mark a note as favorite (or clear it with --off)
    Favorite {
        id: u64,
        #[arg(long)]
        off: bool,
    },
    /// Attach a file to a note
    Attach { id: u64, path: PathBuf },
    /// Write an attachment out to a file
    Export {
        attachment_id: u64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a note and its attachments
    Delete {
        id: u64,
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(clap::Subcommand)]
pub enum CardAction {
    /// Add a card; fields as `--field name=value`
    Add {
        /// Card type, e.g. passport, credit_card (see `card types`)
        card_type: String,
        name: String,
        #[arg(long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,
        /// Expiry date (YYYY-MM-DD)
        #[arg(long)]
        expires: Option<String>,
        /// Issue date (YYYY-MM-DD)
        #[arg(long)]
        issued: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        authority: Option<String>,
        /// Photo or scan of the card
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    /// List cards with their expiry status
    List {
        /// Only cards whose name, number hint or tags contain this text
        #[arg(long)]
        search: Option<String>,
        /// Only cards of this type (see `card types`)
        #[arg(long = "type", value_name = "TYPE")]
        card_type: Option<String>,
    },
    /// Show a card's fields
    Show { id: u64 },
    /// Cards expiring soon (default window from .passvault.toml)
    Expiring {
        #[arg(long)]
        days: Option<i64>,
    },
    /// Cards already past their expiry date
    Expired,
    /// Card counts by status and type
    Stats,
    /// List card types and their fields
    Types,
    /// Delete a card
    Delete {
        id: u64,
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(clap::Subcommand)]
pub enum FileAction {
    /// Encrypt a file into a collection
    Put {
        collection: String,
        path: PathBuf,
        /// Name to store (default: the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Decrypt a file
    Get {
        id: u64,
        /// Output path (default: the stored name, in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List files
    List {
        #[arg(long)]
        collection: Option<String>,
    },
    /// Delete a file
    Delete {
        id: u64,
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(clap::Subcommand)]
pub enum CollectionAction {
    /// Create a collection
    Create {
        name: String,
        /// Images, PDFs, Documents, Others or Custom
        #[arg(long, default_value = "Custom")]
        kind: String,
        /// Protect it with its own secret instead of the master key
        #[arg(long)]
        protect: bool,
    },
    /// Set or change a collection's own secret
    Protect { name: String },
    /// Go back to master-key protection
    Unprotect { name: String },
    /// List collections
    List,
}

#[derive(clap::Subcommand)]
pub enum BackupAction {
    /// Back up the whole vault
    Create {
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List backups, newest first
    List,
    /// Check a backup's checksum (no password needed)
    Verify { id: String },
    /// Restore a backup over the live vault
    Restore {
        id: String,
        #[arg(short, long)]
        force: bool,
    },
    /// Delete a backup
    Delete {
        id: String,
        #[arg(short, long)]
        force: bool,
    },
    /// Remove the copy of the store kept by the last restore
    Cleanup,
    /// Backup count, total size and dates
    Stats,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve settings and the vault layout for the current directory.
pub fn load_context(cli: &Cli) -> Result<(Settings, VaultLayout)> {
    let cwd = std::env::current_dir()?;
    let mut settings = Settings::load(&cwd)?;
    if let Some(dir) = &cli.vault_dir {
        settings.vault_dir = dir.clone();
    }
    let layout = settings.layout(&cwd);
    Ok((settings, layout))
}

/// Open the vault without unlocking it.
pub fn open_locked(cli: &Cli) -> Result<(Settings, Vault)> {
    let (settings, layout) = load_context(cli)?;
    if !layout.exists() {
        output::tip("Run `passvault init` to create a vault here.");
    }
    let vault = Vault::open(layout, settings.kdf_params(), SecureRandom::new()?)?;
    Ok((settings, vault))
}

/// Open and unlock the vault with the master password.
pub fn open_vault(cli: &Cli) -> Result<(Settings, Vault)> {
    let (settings, mut vault) = open_locked(cli)?;
    vault.unlock(prompt_password()?)?;
    Ok((settings, vault))
}

/// Get the master password, trying in order:
/// 1. `PASSVAULT_PASSWORD` env var (scripts)
/// 2. Interactive prompt
pub fn prompt_password() -> Result<Password> {
    read_secret(PASSWORD_ENV, "Enter master password")
}

/// Prompt for a new master password with confirmation.
///
/// Also respects `env_var` for scripted usage.  Enforces a minimum length.
pub fn prompt_new_password(env_var: &str) -> Result<Password> {
    if let Some(pw) = env_secret(env_var) {
        if pw.len() < MIN_PASSWORD_LEN {
            return Err(VaultError::InvalidInput(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        return Ok(pw);
    }

    loop {
        let password = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose master password")
                .with_confirmation("Confirm master password", "Passwords do not match, try again")
                .interact()
                .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?,
        );

        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Password::from(password));
    }
}

/// The current secret for `collection`, if it has one.
///
/// Unknown collections get `None`; the vault then reports an
/// authentication failure.
pub fn collection_secret(vault: &Vault, collection: &str) -> Result<Option<Password>> {
    match vault.has_separate_secret(collection) {
        Ok(true) => Ok(Some(read_secret(
            COLLECTION_SECRET_ENV,
            &format!("Secret for collection '{collection}'"),
        )?)),
        _ => Ok(None),
    }
}

/// A new collection secret, with confirmation when prompting.
pub fn new_collection_secret(collection: &str) -> Result<Password> {
    if let Some(secret) = env_secret(NEW_COLLECTION_SECRET_ENV) {
        return Ok(secret);
    }
    let secret = Zeroizing::new(
        dialoguer::Password::new()
            .with_prompt(format!("New secret for collection '{collection}'"))
            .with_confirmation("Confirm secret", "Secrets do not match, try again")
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?,
    );
    Ok(Password::from(secret))
}

/// Ask before a destructive action unless `force` is set.
pub fn confirm(prompt: &str, force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("failed to read confirmation: {e}")))
}

fn read_secret(env_var: &str, prompt: &str) -> Result<Password> {
    if let Some(secret) = env_secret(env_var) {
        return Ok(secret);
    }
    let pw = Zeroizing::new(
        dialoguer::Password::new()
            .with_prompt(prompt)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?,
    );
    Ok(Password::from(pw))
}

fn env_secret(env_var: &str) -> Option<Password> {
    let value = Zeroizing::new(std::env::var(env_var).ok()?);
    if value.is_empty() {
        return None;
    }
    Some(Password::from(value))
}
