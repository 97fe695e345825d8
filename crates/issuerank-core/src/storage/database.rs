//! SQLite-backed document store.
//!
//! Holds the `problems`, `votes` and `users` collections. The connection sits
//! behind a mutex so one handle can be shared by concurrently running
//! handlers; every write runs in an immediate transaction.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};

use super::document::{DocumentStore, Modification, ProblemUpdate, VoteTally, WriteBatch};
use super::migrations;
use crate::error::StoreError;
use crate::model::{Category, Problem, Status, User, Vote};

const PROBLEM_COLUMNS: &str =
    "id, title, category, status, reported_by, created_at, vote_count, priority_score, last_updated";
const VOTE_COLUMNS: &str = "id, problem_id, user_id, created_at, counted_at";

/// SQLite database implementing [`DocumentStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the store at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert a submitted report.
    pub fn insert_problem(&self, problem: &Problem) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO problems (id, title, category, status, reported_by, created_at,
                                   vote_count, priority_score, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                problem.id,
                problem.title,
                problem.category.as_str(),
                problem.status.as_str(),
                problem.reported_by,
                format_time(problem.created_at),
                problem.vote_count,
                problem.priority_score,
                problem.last_updated.map(format_time),
            ],
        )?;
        Ok(())
    }

    /// Insert a submitted vote. Duplicates for the same pair are allowed here.
    pub fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO votes (id, problem_id, user_id, created_at, counted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                vote.id,
                vote.problem_id,
                vote.user_id,
                format_time(vote.created_at),
                vote.counted_at.map(format_time),
            ],
        )?;
        Ok(())
    }

    /// Create or replace a user.
    pub fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (id, fcm_token) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET fcm_token = excluded.fcm_token",
            params![user.id, user.fcm_token],
        )?;
        Ok(())
    }

    pub fn vote(&self, id: &str) -> Result<Option<Vote>, StoreError> {
        let conn = self.lock()?;
        let vote = conn
            .query_row(
                &format!("SELECT {VOTE_COLUMNS} FROM votes WHERE id = ?1"),
                [id],
                vote_from_row,
            )
            .optional()?;
        Ok(vote)
    }

    /// Problems ranked by priority, highest first. Uninitialised problems last.
    pub fn ranked_problems(&self, open_only: bool) -> Result<Vec<Problem>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROBLEM_COLUMNS} FROM problems
             ORDER BY priority_score IS NULL, priority_score DESC, created_at ASC"
        ))?;
        let rows = stmt.query_map([], problem_from_row)?;

        let mut problems = Vec::new();
        for row in rows {
            let problem = row?;
            if !open_only || problem.status.is_open() {
                problems.push(problem);
            }
        }
        Ok(problems)
    }
}

impl DocumentStore for SqliteStore {
    fn problem(&self, id: &str) -> Result<Option<Problem>, StoreError> {
        let conn = self.lock()?;
        Ok(load_problem(&conn, id)?)
    }

    fn user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        let user = conn
            .query_row("SELECT id, fcm_token FROM users WHERE id = ?1", [id], |row| {
                Ok(User {
                    id: row.get(0)?,
                    fcm_token: row.get(1)?,
                })
            })
            .optional()?;
        Ok(user)
    }

    fn votes_for(&self, problem_id: &str, user_id: &str) -> Result<Vec<Vote>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE problem_id = ?1 AND user_id = ?2"
        ))?;
        let votes = stmt
            .query_map([problem_id, user_id], vote_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(votes)
    }

    fn problems_with_status(&self, statuses: &[Status]) -> Result<Vec<Problem>, StoreError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROBLEM_COLUMNS} FROM problems WHERE status IN ({placeholders})"
        ))?;
        let problems = stmt
            .query_map(params_from_iter(statuses.iter().map(Status::as_str)), problem_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(problems)
    }

    fn update_problem(&self, id: &str, update: &ProblemUpdate) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        write_update(&tx, id, update, server_now())?;
        tx.commit()?;
        Ok(())
    }

    fn modify_problem(
        &self,
        id: &str,
        modify: &mut dyn FnMut(&Problem) -> Option<ProblemUpdate>,
    ) -> Result<Modification, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(current) = load_problem(&tx, id)? else {
            return Ok(Modification::Missing);
        };

        match modify(&current) {
            None => Ok(Modification::Unchanged(current)),
            Some(update) => {
                let now = server_now();
                write_update(&tx, id, &update, now)?;
                tx.commit()?;

                let mut after = current;
                update.apply_to(&mut after, now);
                Ok(Modification::Applied(after))
            }
        }
    }

    fn count_vote(
        &self,
        vote: &Vote,
        tally: &mut dyn FnMut(&Problem) -> ProblemUpdate,
    ) -> Result<VoteTally, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let counted_at: Option<Option<String>> = tx
            .query_row("SELECT counted_at FROM votes WHERE id = ?1", [&vote.id], |row| {
                row.get(0)
            })
            .optional()?;
        match counted_at {
            None => return Ok(VoteTally::VoteMissing),
            Some(Some(_)) => return Ok(VoteTally::AlreadyCounted),
            Some(None) => {}
        }

        let rival: Option<String> = tx
            .query_row(
                "SELECT id FROM votes
                 WHERE problem_id = ?1 AND user_id = ?2 AND id != ?3 AND counted_at IS NOT NULL
                 LIMIT 1",
                params![vote.problem_id, vote.user_id, vote.id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(counted_vote_id) = rival {
            return Ok(VoteTally::PairAlreadyCounted { counted_vote_id });
        }

        let Some(current) = load_problem(&tx, &vote.problem_id)? else {
            return Ok(VoteTally::ProblemMissing);
        };

        let update = tally(&current);
        let now = server_now();
        write_update(&tx, &vote.problem_id, &update, now)?;
        tx.execute(
            "UPDATE votes SET counted_at = ?2 WHERE id = ?1",
            params![vote.id, format_time(now)],
        )?;
        tx.commit()?;

        let mut after = current;
        update.apply_to(&mut after, now);
        Ok(VoteTally::Counted(after))
    }

    fn delete_vote(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM votes WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    fn commit(&self, batch: WriteBatch) -> Result<usize, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = server_now();
        for (id, update) in batch.updates() {
            write_update(&tx, id, update, now)?;
        }
        tx.commit()?;

        tracing::debug!(documents = batch.len(), "committed write batch");
        Ok(batch.len())
    }
}

/// Store clock, truncated to the precision timestamps are persisted at.
fn server_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn problem_from_row(row: &Row<'_>) -> rusqlite::Result<Problem> {
    let last_updated: Option<String> = row.get(8)?;
    Ok(Problem {
        id: row.get(0)?,
        title: row.get(1)?,
        category: Category::from(row.get::<_, String>(2)?),
        status: Status::from(row.get::<_, String>(3)?),
        reported_by: row.get(4)?,
        created_at: parse_time(5, &row.get::<_, String>(5)?)?,
        vote_count: row.get(6)?,
        priority_score: row.get(7)?,
        last_updated: last_updated.map(|raw| parse_time(8, &raw)).transpose()?,
    })
}

fn vote_from_row(row: &Row<'_>) -> rusqlite::Result<Vote> {
    let counted_at: Option<String> = row.get(4)?;
    Ok(Vote {
        id: row.get(0)?,
        problem_id: row.get(1)?,
        user_id: row.get(2)?,
        created_at: parse_time(3, &row.get::<_, String>(3)?)?,
        counted_at: counted_at.map(|raw| parse_time(4, &raw)).transpose()?,
    })
}

fn load_problem(conn: &Connection, id: &str) -> rusqlite::Result<Option<Problem>> {
    conn.query_row(
        &format!("SELECT {PROBLEM_COLUMNS} FROM problems WHERE id = ?1"),
        [id],
        problem_from_row,
    )
    .optional()
}

fn write_update(
    conn: &Connection,
    id: &str,
    update: &ProblemUpdate,
    server_now: DateTime<Utc>,
) -> Result<(), StoreError> {
    if let Some(expected) = update.expected_vote_count {
        let actual: Option<u32> = conn
            .query_row("SELECT vote_count FROM problems WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        match actual {
            None => return Err(not_found(id)),
            Some(actual) if actual != expected => {
                return Err(StoreError::Conflict {
                    id: id.to_string(),
                    expected,
                    actual,
                })
            }
            Some(_) => {}
        }
    }

    let changed = conn.execute(
        "UPDATE problems SET
            vote_count = COALESCE(?2, vote_count),
            priority_score = COALESCE(?3, priority_score),
            status = COALESCE(?4, status),
            last_updated = COALESCE(?5, last_updated)
         WHERE id = ?1",
        params![
            id,
            update.vote_count,
            update.priority_score,
            update.status.as_ref().map(Status::as_str),
            update.last_updated.map(|at| format_time(at.resolve(server_now))),
        ],
    )?;

    if changed == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound {
        collection: "problems",
        id: id.to_string(),
    }
}
