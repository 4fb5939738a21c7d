//! Schema migrations.
//!
//! Every migration is idempotent and runs on each start, in order.

use sqlx::SqlitePool;
use tracing::info;

use crate::{Error, Result};

/// A named schema change.
pub(crate) struct Migration {
    pub name: &'static str,
    pub up: &'static str,
}

pub(crate) const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "init schema",
        up: r"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS blocks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                block_id INTEGER NOT NULL REFERENCES blocks(id),
                user_id INTEGER NOT NULL REFERENCES users(id),
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
        ",
    },
    Migration {
        name: "index posts by block",
        up: r"
            CREATE INDEX IF NOT EXISTS idx_posts_block ON posts(block_id);
        ",
    },
];

/// Applies every migration.
///
/// # Errors
///
/// Returns an error naming the first migration that fails.
pub(crate) async fn migrate(pool: &SqlitePool) -> Result<()> {
    info!("Applying migrations");

    for migration in MIGRATIONS {
        sqlx::raw_sql(migration.up)
            .execute(pool)
            .await
            .map_err(|e| Error::Config(format!("failed in migration {}: {e}", migration.name)))?;

        info!(migration = migration.name, "Applied migration");
    }

    info!("Finished applying migrations");
    Ok(())
}
