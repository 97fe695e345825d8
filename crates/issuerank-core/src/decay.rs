//! Periodic age decay of open problems.
//!
//! A sweep recomputes the score of every open problem at the sweep time and
//! commits all of them in one batch. Each entry is guarded by the vote count
//! it was computed from, so a vote landing mid-sweep aborts the batch instead
//! of being overwritten with a stale score.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::{CoreError, Result, StoreError};
use crate::model::Status;
use crate::scoring::ScoreCalculator;
use crate::storage::{DocumentStore, ProblemUpdate, WriteBatch};

/// Default sweep period.
pub const WEEKLY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Summary of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub swept_at: DateTime<Utc>,
    /// Open problems returned by the query.
    pub examined: usize,
    /// Documents written by the batch.
    pub committed: usize,
    /// Of those, how many got a different score.
    pub changed: usize,
}

pub struct DecaySweeper {
    store: Arc<dyn DocumentStore>,
    open_statuses: Vec<Status>,
}

impl DecaySweeper {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            open_statuses: Status::OPEN.to_vec(),
        }
    }

    /// Replace the set of statuses that keep decaying.
    pub fn with_open_statuses(mut self, statuses: Vec<Status>) -> Self {
        self.open_statuses = statuses;
        self
    }

    /// Recompute and commit every open problem's score as of `now`.
    ///
    /// # Errors
    /// Store failures propagate; a failed commit writes nothing.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let problems = self.store.problems_with_status(&self.open_statuses)?;

        let mut batch = WriteBatch::new();
        let mut changed = 0;

        for problem in &problems {
            let score = ScoreCalculator::score_problem(problem, now);
            if problem.priority_score != Some(score) {
                changed += 1;
            }
            batch.update(
                problem.id.clone(),
                ProblemUpdate::new()
                    .priority_score(score)
                    .expect_vote_count(problem.vote_count),
            );
        }

        let committed = self.store.commit(batch)?;
        let report = SweepReport {
            swept_at: now,
            examined: problems.len(),
            committed,
            changed,
        };
        tracing::info!(
            examined = report.examined,
            committed = report.committed,
            changed = report.changed,
            "decay sweep committed"
        );
        Ok(report)
    }

    /// Sweep as of `now`, sweeping once more if a concurrent vote aborted
    /// the first batch.
    pub fn sweep_with_retry(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        match self.sweep(now) {
            Err(CoreError::Store(StoreError::Conflict { id, .. })) => {
                tracing::warn!(problem = %id, "decay batch conflicted with a vote, re-sweeping");
                self.sweep(now)
            }
            other => other,
        }
    }

    /// Sweep on every tick of `period` until `shutdown` flips to `true`.
    ///
    /// The first sweep runs immediately. A conflicting batch is re-swept once;
    /// any other failure is logged and the loop waits for the next tick.
    /// Returns the number of successful sweeps.
    pub async fn run_periodic(
        self: Arc<Self>,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut completed = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let sweeper = Arc::clone(&self);
                    let outcome = tokio::task::spawn_blocking(move || sweeper.sweep_with_retry(Utc::now())).await;
                    match outcome {
                        Ok(Ok(_)) => completed += 1,
                        Ok(Err(e)) => tracing::error!(error = %e, "decay sweep failed"),
                        Err(e) => tracing::error!(error = %e, "decay sweep task panicked"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(completed, "decay scheduler stopped");
        completed
    }
}
