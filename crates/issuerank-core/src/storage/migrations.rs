//! Database schema migrations for the issuerank store.
//!
//! Migrations are versioned and applied automatically when opening the store.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub(crate) fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: the three document collections.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS problems (
            id              TEXT PRIMARY KEY,
            title           TEXT NOT NULL DEFAULT '',
            category        TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'pending',
            reported_by     TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            vote_count      INTEGER NOT NULL DEFAULT 0,
            priority_score  INTEGER,
            last_updated    TEXT
        );

        CREATE TABLE IF NOT EXISTS votes (
            id          TEXT PRIMARY KEY,
            problem_id  TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            fcm_token   TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_problems_status ON problems(status);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: per-vote counting marker and pair lookup index.
///
/// Votes that existed before the marker was introduced were already folded
/// into their problem's count, so they are backfilled as counted.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "ALTER TABLE votes ADD COLUMN counted_at TEXT;
         UPDATE votes SET counted_at = created_at WHERE counted_at IS NULL;
         CREATE INDEX IF NOT EXISTS idx_votes_pair ON votes(problem_id, user_id);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
