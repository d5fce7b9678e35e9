//! Schema migrations, embedded at compile time and applied with refinery.
//! Applied versions are tracked in `refinery_schema_history`.

use refinery::embed_migrations;
use tokio_postgres::{Client, NoTls};

use crate::error::Error;

embed_migrations!("migrations");

async fn connect(database_url: &str) -> Result<Client, Error> {
    let config: tokio_postgres::Config = database_url.parse().map_err(|e| {
        Error::MigrationError(format!("invalid database URL: {}", e))
    })?;

    let (client, connection) = config.connect(NoTls).await.map_err(|e| {
        Error::MigrationError(format!("unable to connect: {}", e))
    })?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Migration connection error: {}", e);
        }
    });

    Ok(client)
}

/// Applies every pending migration in version order. A failing migration
/// is rolled back and aborts the run.
pub async fn run_migrations(database_url: &str) -> Result<(), Error> {
    tracing::info!("Running database migrations...");

    let mut client = connect(database_url).await?;
    let report = migrations::runner()
        .run_async(&mut client)
        .await
        .map_err(|e| Error::MigrationError(e.to_string()))?;

    let applied = report.applied_migrations();
    if applied.is_empty() {
        tracing::info!("No new migrations to apply");
    } else {
        for migration in applied {
            tracing::info!(
                "Applied migration: V{:03}__{} (checksum: {})",
                migration.version(),
                migration.name(),
                migration.checksum()
            );
        }
        tracing::info!("Successfully applied {} migration(s)", applied.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_and_history_migrations_are_embedded() {
        let runner = migrations::runner();
        let mut versions: Vec<u32> = runner
            .get_migrations()
            .iter()
            .map(|migration| migration.version())
            .collect();
        versions.sort();

        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn migration_names_describe_their_content() {
        let runner = migrations::runner();
        let mut names: Vec<String> = runner
            .get_migrations()
            .iter()
            .map(|migration| migration.name().to_owned())
            .collect();
        names.sort();

        assert_eq!(names, vec!["block_history", "market_entities"]);
    }
}
