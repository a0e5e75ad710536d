//! SQLite pool for the to-do service.
//!
//! The database file and its parent folder are created on first use. The
//! pool runs in WAL mode so list requests do not block behind a write.

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::time::Duration;

use crate::config::TodosConfig;

const MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (creating if needed) the to-do database at `[todos].db_path`.
pub async fn connect(config: &TodosConfig) -> Result<SqlitePool> {
    let path = &config.db_path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database folder {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT);

    SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open to-do database {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn creates_missing_folders_in_wal_mode() {
        let tmp = TempDir::new().unwrap();
        let cfg = TodosConfig {
            db_path: tmp.path().join("nested/data/todos.sqlite"),
        };
        let pool = connect(&cfg).await.unwrap();
        assert!(cfg.db_path.is_file());

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn unusable_path_names_the_file() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("occupied");
        std::fs::write(&blocker, "not a folder").unwrap();
        let cfg = TodosConfig {
            db_path: blocker.join("todos.sqlite"),
        };
        let err = connect(&cfg).await.unwrap_err();
        assert!(format!("{:#}", err).contains("occupied"), "{:#}", err);
    }
}
