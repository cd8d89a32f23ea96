#[cfg(not(any(feature = "db-sqlite", feature = "db-postgres")))]
compile_error!("Either the `db-sqlite` or `db-postgres` feature must be enabled.");

#[cfg(all(feature = "db-sqlite", feature = "db-postgres"))]
compile_error!("Only one of `db-sqlite` or `db-postgres` can be enabled.");

use sqlx::migrate::Migrator;

use crate::config::DatabaseConfig;

#[cfg(feature = "db-postgres")]
pub use sqlx::postgres::{PgPool as DbPool, PgPoolOptions as DbPoolOptions, Postgres as Db};

#[cfg(feature = "db-sqlite")]
pub use sqlx::sqlite::{Sqlite as Db, SqlitePool as DbPool, SqlitePoolOptions as DbPoolOptions};

#[cfg(feature = "db-postgres")]
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations/postgres");

#[cfg(feature = "db-sqlite")]
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations/sqlite");

/// Opens the pool and brings the schema up to date.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let pool = DbPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;

    tracing::info!("Running database migrations...");
    MIGRATOR.run(&pool).await?;
    tracing::info!("Migrations complete.");

    Ok(pool)
}

/// True when the error is a unique-constraint violation, on either backend.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}
