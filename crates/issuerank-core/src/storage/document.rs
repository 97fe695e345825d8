//! The document store boundary consumed by the reactor and the sweeper.

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::model::{Problem, Status, User, Vote};

/// Write-time value for timestamp fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTime {
    /// Resolved by the store to its own clock when the write commits.
    ServerTimestamp,
    At(DateTime<Utc>),
}

impl WriteTime {
    pub fn resolve(self, server_now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            WriteTime::ServerTimestamp => server_now,
            WriteTime::At(at) => at,
        }
    }
}

/// Partial update of a problem document. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemUpdate {
    pub vote_count: Option<u32>,
    pub priority_score: Option<u32>,
    pub status: Option<Status>,
    pub last_updated: Option<WriteTime>,
    /// Precondition: the stored vote count must still equal this value.
    pub expected_vote_count: Option<u32>,
}

impl ProblemUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vote_count(mut self, count: u32) -> Self {
        self.vote_count = Some(count);
        self
    }

    pub fn priority_score(mut self, score: u32) -> Self {
        self.priority_score = Some(score);
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn touched(mut self, at: WriteTime) -> Self {
        self.last_updated = Some(at);
        self
    }

    pub fn expect_vote_count(mut self, count: u32) -> Self {
        self.expected_vote_count = Some(count);
        self
    }

    /// Apply this update to an in-memory copy of the document.
    pub fn apply_to(&self, problem: &mut Problem, server_now: DateTime<Utc>) {
        if let Some(count) = self.vote_count {
            problem.vote_count = count;
        }
        if let Some(score) = self.priority_score {
            problem.priority_score = Some(score);
        }
        if let Some(status) = &self.status {
            problem.status = status.clone();
        }
        if let Some(at) = self.last_updated {
            problem.last_updated = Some(at.resolve(server_now));
        }
    }
}

/// A set of problem updates committed all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    updates: Vec<(String, ProblemUpdate)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, problem_id: impl Into<String>, update: ProblemUpdate) {
        self.updates.push((problem_id.into(), update));
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn updates(&self) -> &[(String, ProblemUpdate)] {
        &self.updates
    }
}

/// Result of a transactional read-modify-write on one problem.
#[derive(Debug, Clone, PartialEq)]
pub enum Modification {
    /// The update was written; carries the document as committed.
    Applied(Problem),
    /// The closure declined to write; carries the document as read.
    Unchanged(Problem),
    Missing,
}

/// Result of atomically counting a vote against its problem.
#[derive(Debug, Clone, PartialEq)]
pub enum VoteTally {
    /// Vote marked counted and the problem updated; carries the new problem.
    Counted(Problem),
    /// This vote was counted by an earlier run of the handler.
    AlreadyCounted,
    /// Another vote for the same pair has already been counted.
    PairAlreadyCounted { counted_vote_id: String },
    /// The vote document no longer exists.
    VoteMissing,
    /// The parent problem does not exist.
    ProblemMissing,
}

/// Storage collaborator for problems, votes and users.
///
/// Implementations must be safe to call from concurrently running handlers.
pub trait DocumentStore: Send + Sync {
    fn problem(&self, id: &str) -> Result<Option<Problem>, StoreError>;

    fn user(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// All votes for a `(problem, user)` pair, in no particular order.
    fn votes_for(&self, problem_id: &str, user_id: &str) -> Result<Vec<Vote>, StoreError>;

    /// All problems whose status is one of `statuses`.
    fn problems_with_status(&self, statuses: &[Status]) -> Result<Vec<Problem>, StoreError>;

    /// Single-document update. Fails with [`StoreError::NotFound`] if absent.
    fn update_problem(&self, id: &str, update: &ProblemUpdate) -> Result<(), StoreError>;

    /// Transactional read-modify-write of one problem.
    ///
    /// `modify` sees the current document and returns the update to write, or
    /// `None` to leave it alone.
    fn modify_problem(
        &self,
        id: &str,
        modify: &mut dyn FnMut(&Problem) -> Option<ProblemUpdate>,
    ) -> Result<Modification, StoreError>;

    /// Count `vote` against its problem in one transaction.
    ///
    /// `tally` sees the current problem and returns the update to write. The
    /// vote is marked counted in the same transaction, so re-running this for
    /// the same vote never counts it twice.
    fn count_vote(
        &self,
        vote: &Vote,
        tally: &mut dyn FnMut(&Problem) -> ProblemUpdate,
    ) -> Result<VoteTally, StoreError>;

    /// Delete a vote. Returns `false` if it was already gone.
    fn delete_vote(&self, id: &str) -> Result<bool, StoreError>;

    /// Commit every update in `batch`, or none of them.
    fn commit(&self, batch: WriteBatch) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    #[test]
    fn update_applies_only_set_fields() {
        let now = Utc::now();
        let mut p = Problem::reported("p1", "Leak", Category::Water, "u1", now);
        p.vote_count = 4;
        ProblemUpdate::new().priority_score(12).apply_to(&mut p, now);
        assert_eq!(p.vote_count, 4);
        assert_eq!(p.priority_score, Some(12));
        assert_eq!(p.last_updated, None);
    }

    #[test]
    fn server_timestamp_resolves_to_store_clock() {
        let now = Utc::now();
        let mut p = Problem::reported("p1", "Leak", Category::Water, "u1", now);
        ProblemUpdate::new()
            .touched(WriteTime::ServerTimestamp)
            .apply_to(&mut p, now);
        assert_eq!(p.last_updated, Some(now));
    }
}
