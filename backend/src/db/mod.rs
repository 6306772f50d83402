//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for requests, votes and users.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            author_name TEXT NOT NULL,
            author_email TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS video_requests (
            id TEXT PRIMARY KEY,
            topic_title TEXT NOT NULL,
            topic_title_folded TEXT NOT NULL,
            topic_details TEXT NOT NULL,
            expected_result TEXT,
            target_level TEXT NOT NULL DEFAULT 'beginner',
            status TEXT NOT NULL DEFAULT 'pending',
            author_id TEXT REFERENCES users(id) ON DELETE SET NULL,
            author_name TEXT,
            author_email TEXT,
            submit_date TEXT NOT NULL,
            video_ref_link TEXT,
            video_ref_date TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    // One row per (request, voter) keeps a voter out of both directions at once
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS votes (
            request_id TEXT NOT NULL REFERENCES video_requests(id) ON DELETE CASCADE,
            voter_id TEXT NOT NULL,
            direction TEXT NOT NULL CHECK (direction IN ('ups', 'downs')),
            voted_at TEXT NOT NULL,
            PRIMARY KEY (request_id, voter_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_video_requests_submit_date ON video_requests(submit_date);
        CREATE INDEX IF NOT EXISTS idx_video_requests_topic_title_folded ON video_requests(topic_title_folded);
        CREATE INDEX IF NOT EXISTS idx_votes_request_id ON votes(request_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
