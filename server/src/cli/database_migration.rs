//! Checking and applying the database schema migrations, which are embedded into the binary.
use crate::cli_error::CliError;
use crate::setup::get_database_url_from_env;
use diesel::migration::Migration;
use diesel::pg::PgConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;

pub(crate) const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgresql");

fn connect() -> Result<PgConnection, CliError> {
    Ok(PgConnection::establish(&get_database_url_from_env()?)?)
}

/// Migrate the database schema to the latest migration known to this application version.
///
/// The database connection URL is taken from the `DATABASE_URL` environment variable. The applied
/// migrations are printed to stdout.
pub fn run_migrations() -> Result<(), CliError> {
    let mut connection = connect()?;
    let mut harness = diesel_migrations::HarnessWithOutput::new(&mut connection, std::io::stdout());
    let applied = harness
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| CliError::DatabaseMigrationFailed(e.to_string()))?;
    info!("Applied {} database migrations.", applied.len());
    Ok(())
}

/// Check if the database schema has been migrated to the latest migration known to this
/// application version. If not, return [CliError::PendingMigrations] with the names of the
/// pending migrations.
pub fn check_migration_state() -> Result<(), CliError> {
    let mut connection = connect()?;
    let pending_migrations = connection
        .pending_migrations(MIGRATIONS)
        .map_err(|e| CliError::DatabaseMigrationFailed(e.to_string()))?;
    if !pending_migrations.is_empty() {
        return Err(CliError::PendingMigrations(
            pending_migrations
                .iter()
                .map(|m| m.name().to_string())
                .collect(),
        ));
    }
    Ok(())
}
