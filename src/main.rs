use clap::Parser;
use tracing::{error, Level};

use mm_etl::{
    cli::{run_feed, run_migrate, run_revert, Cli, Commands},
    error::Error,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level({
            #[cfg(debug_assertions)]
            {
                Level::DEBUG
            }

            #[cfg(not(debug_assertions))]
            {
                Level::INFO
            }
        })
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        None => run_feed(false, None).await,
        Some(Commands::Run { dry_run, source }) => run_feed(dry_run, source).await,
        Some(Commands::Migrate) => run_migrate().await,
        Some(Commands::Revert { to_block }) => run_revert(to_block).await,
    }
}
