// src/infrastructure/repositories/sqlite/migration.rs
use diesel::sqlite::Sqlite;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{debug, info, instrument};

use super::connection::ConnectionPool;
use super::error::{SqliteRepositoryError, SqliteResult};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Run any pending database migrations; returns the names of those applied
#[instrument(skip(pool), level = "info")]
pub fn run_pending_migrations(pool: &ConnectionPool) -> SqliteResult<Vec<String>> {
    let mut conn = pool.get()?;
    apply_migrations(&mut *conn)
}

pub fn apply_migrations(
    connection: &mut impl MigrationHarness<Sqlite>,
) -> SqliteResult<Vec<String>> {
    let pending = connection.pending_migrations(MIGRATIONS).map_err(|e| {
        SqliteRepositoryError::MigrationError(format!("Failed to check pending migrations: {}", e))
    })?;

    if pending.is_empty() {
        debug!("No pending migrations to run");
        return Ok(Vec::new());
    }

    let applied = connection.run_pending_migrations(MIGRATIONS).map_err(|e| {
        SqliteRepositoryError::MigrationError(format!("Failed to run migrations: {}", e))
    })?;

    let names: Vec<String> = applied.iter().map(|m| m.to_string()).collect();
    for name in &names {
        info!("Applied migration {}", name);
    }
    Ok(names)
}
