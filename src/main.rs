//! chatshelf - Manage local AI assistant session logs
//!
#![doc = "chatshelf - Manage local AI assistant session logs"]
#![doc = "Main entry point for the chatshelf CLI."]

use anyhow::Result;
use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatshelf::cli::{Cli, Commands};
use chatshelf::commands;
use chatshelf::config::Config;
use chatshelf::library::SessionLibrary;
use chatshelf::providers::SessionState;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load and validate configuration
    let config = Config::load(cli.config.as_deref(), &cli)?;
    config.validate()?;
    let paths = config.resolve()?;
    tracing::debug!(?paths, "Resolved configuration");

    let library = SessionLibrary::new(&paths);
    let json = cli.json;

    let all_succeeded = match &cli.command {
        Commands::List {
            provider,
            archived,
            all,
        } => {
            let state = match (*archived, *all) {
                (_, true) => None,
                (true, false) => Some(SessionState::Archived),
                (false, false) => Some(SessionState::Active),
            };
            commands::sessions::list_sessions(&library, *provider, state, json).await?;
            true
        }
        Commands::Archive { ids } => commands::sessions::archive(&library, ids, json).await?,
        Commands::Unarchive { ids } => commands::sessions::unarchive(&library, ids, json).await?,
        Commands::Trash { ids } => commands::sessions::trash(&library, ids, json).await?,
        Commands::TrashList => {
            commands::trash::list_trash(&library, json).await?;
            true
        }
        Commands::Restore { ids } => commands::trash::restore(&library, ids, json).await?,
        Commands::Purge { ids } => commands::trash::purge(&library, ids, json).await?,
        Commands::Cleanup => commands::trash::cleanup(&library, json).await?,
    };

    if all_succeeded {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "chatshelf=debug"
    } else {
        "chatshelf=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
