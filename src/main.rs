use clap::Parser;
use tracing_subscriber::EnvFilter;

use passvault::cli::commands;
use passvault::cli::{Cli, Commands};

/// Log filter, e.g. `PASSVAULT_LOG=passvault=debug`.
const LOG_ENV: &str = "PASSVAULT_LOG";

fn main() {
    let cli = Cli::parse();

    // Diagnostics go to stderr so they never mix with command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli),
        Commands::Unlock => commands::unlock::execute(&cli),
        Commands::Passwd => commands::passwd::execute(&cli),
        Commands::Credential { ref action } => commands::credential::execute(&cli, action),
        Commands::Note { ref action } => commands::note::execute(&cli, action),
        Commands::Card { ref action } => commands::card::execute(&cli, action),
        Commands::File { ref action } => commands::file::execute(&cli, action),
        Commands::Collection { ref action } => commands::collection::execute(&cli, action),
        Commands::Backup { ref action } => commands::backup::execute(&cli, action),
        Commands::Completions { ref shell } => commands::completions::execute(shell),
        Commands::Audit { last, ref since } => {
            commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
    };

    if let Err(e) = result {
        passvault::cli::output::error(&e.to_string());
        std::process::exit(if e.is_fatal() { 2 } else { 1 });
    }
}
