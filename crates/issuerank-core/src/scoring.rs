//! Priority score calculation.
//!
//! ```text
//! priority = max(0, votes × 5 + severity × 10 − full_weeks_since_report × 2)
//! ```
//!
//! The function is pure: identical inputs always produce the same score, and
//! `now` is always passed in by the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Category, Problem};

/// Points contributed by each counted vote.
pub const POINTS_PER_VOTE: u32 = 5;
/// Multiplier applied to the category severity.
pub const SEVERITY_MULTIPLIER: u32 = 10;
/// Points lost per full week since the report.
pub const DECAY_PER_WEEK: u32 = 2;

/// Explainable score components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub vote_count: u32,
    pub severity: u32,
    /// `vote_count × 5 + severity × 10`
    pub base: u32,
    pub age_weeks: u32,
    /// `age_weeks × 2`
    pub decay: u32,
    pub total: u32,
}

/// Stateless priority score calculator.
pub struct ScoreCalculator;

impl ScoreCalculator {
    /// Score for the given inputs at `now`.
    pub fn score(
        vote_count: u32,
        category: &Category,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> u32 {
        Self::breakdown(vote_count, category, created_at, now).total
    }

    /// Score for a stored problem using its own vote count.
    pub fn score_problem(problem: &Problem, now: DateTime<Utc>) -> u32 {
        Self::score(problem.vote_count, &problem.category, problem.created_at, now)
    }

    pub fn breakdown(
        vote_count: u32,
        category: &Category,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let severity = category.severity();
        let base = vote_count
            .saturating_mul(POINTS_PER_VOTE)
            .saturating_add(severity * SEVERITY_MULTIPLIER);
        let age_weeks = Self::age_weeks(created_at, now);
        let decay = age_weeks.saturating_mul(DECAY_PER_WEEK);

        ScoreBreakdown {
            vote_count,
            severity,
            base,
            age_weeks,
            decay,
            total: base.saturating_sub(decay),
        }
    }

    /// Whole weeks elapsed. A report dated in the future has age zero.
    pub fn age_weeks(created_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
        let elapsed = now.signed_duration_since(created_at);
        if elapsed <= Duration::zero() {
            return 0;
        }
        let weeks = elapsed.num_milliseconds() / Duration::weeks(1).num_milliseconds();
        u32::try_from(weeks).unwrap_or(u32::MAX)
    }
}
