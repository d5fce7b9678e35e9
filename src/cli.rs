//! Command-line entry points: feed processing, migrations and manual
//! rollback.

use clap::{Parser, Subcommand};

use crate::{
    configuration::{get_configuration, set_configuration, AppState, Config, State},
    dao::{EntityStore, MemoryStore},
    error::Error,
    migration,
    provider::{DatabasePool, Event, Rpc},
};

/// Money market ETL
#[derive(Parser)]
#[command(name = "mm-etl")]
#[command(about = "Indexes money market events into per-account positions", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process the event feed (default if no command specified)
    Run {
        /// Keep entities in memory instead of the database
        #[arg(long)]
        dry_run: bool,

        /// Feed file, or `-` for stdin. Defaults to EVENTS_SOURCE
        #[arg(long)]
        source: Option<String>,
    },

    /// Run database migrations
    Migrate,

    /// Roll the store back to the state after a block
    Revert {
        #[arg(long)]
        to_block: i64,
    },
}

/// Initialize configuration and return Config
pub fn init_config() -> Result<Config, Error> {
    set_configuration()?;
    get_configuration()
}

pub async fn run_migrate() -> Result<(), Error> {
    let config = init_config()?;
    migration::run_migrations(&config.database_url).await?;
    tracing::info!("Migrations complete");

    Ok(())
}

pub async fn run_feed(dry_run: bool, source: Option<String>) -> Result<(), Error> {
    let config = init_config()?;
    let source = source.unwrap_or_else(|| config.events_source.to_owned());

    let store: Box<dyn EntityStore> = if dry_run {
        tracing::info!("DRY RUN MODE - entities are kept in memory");
        Box::new(MemoryStore::new())
    } else {
        migration::run_migrations(&config.database_url).await?;
        Box::new(DatabasePool::new(&config).await?)
    };
    let reader = Rpc::new(&config)?;

    let app_state = AppState::new(State::new(config, store, Box::new(reader)));
    let summary = Event::new(app_state).run(&source).await?;

    tracing::info!(
        "Processed {} blocks ({} re-delivered after a reorg)",
        summary.applied + summary.reapplied,
        summary.reapplied
    );

    Ok(())
}

pub async fn run_revert(to_block: i64) -> Result<(), Error> {
    let config = init_config()?;
    migration::run_migrations(&config.database_url).await?;

    let database = DatabasePool::new(&config).await?;
    let restored = database.revert_to(to_block).await?;
    tracing::info!(
        "Reverted to block {}, {} entity images restored",
        to_block,
        restored
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_optional() {
        let cli = Cli::try_parse_from(["mm-etl"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn run_flags_are_parsed() {
        let cli =
            Cli::try_parse_from(["mm-etl", "run", "--dry-run", "--source", "feed.jsonl"])
                .unwrap();
        match cli.command {
            Some(Commands::Run { dry_run, source }) => {
                assert!(dry_run);
                assert_eq!(source.as_deref(), Some("feed.jsonl"));
            },
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn revert_requires_a_block() {
        assert!(Cli::try_parse_from(["mm-etl", "revert"]).is_err());

        let cli = Cli::try_parse_from(["mm-etl", "revert", "--to-block", "42"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Revert { to_block: 42 })));
    }
}
