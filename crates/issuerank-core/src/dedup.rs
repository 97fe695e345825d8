//! Duplicate vote detection.
//!
//! A `(problem, user)` pair may keep at most one vote. When a vote event
//! fires, every vote currently visible for the pair is inspected:
//!
//! - a vote that already counted always wins;
//! - otherwise the earliest arrival wins (creation time, then id).
//!
//! Every handler applying this rule to the same visible set agrees on the
//! survivor, so two near-simultaneous submissions cannot both be deleted and
//! cannot both be counted. The store re-checks the "already counted" half of
//! the rule inside its counting transaction.

use serde::Serialize;

use crate::model::Vote;

/// Outcome of inspecting a newly observed vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum VoteVerdict {
    /// The vote is the pair's survivor and should be counted.
    Accept,
    /// Another vote for the pair wins; this one must be deleted uncounted.
    Duplicate { kept_vote_id: String },
}

pub struct VoteDeduplicator;

impl VoteDeduplicator {
    /// Judge `trigger` against the votes visible for its pair.
    ///
    /// `visible` may or may not contain `trigger` itself; votes for other
    /// pairs are ignored.
    pub fn judge(trigger: &Vote, visible: &[Vote]) -> VoteVerdict {
        let rivals: Vec<&Vote> = visible
            .iter()
            .filter(|v| v.id != trigger.id)
            .filter(|v| v.problem_id == trigger.problem_id && v.user_id == trigger.user_id)
            .collect();

        if rivals.is_empty() {
            return VoteVerdict::Accept;
        }

        if let Some(counted) = rivals.iter().find(|v| v.is_counted()) {
            return VoteVerdict::Duplicate {
                kept_vote_id: counted.id.clone(),
            };
        }

        let earliest = rivals
            .iter()
            .copied()
            .fold(trigger, |best, v| if v.arrives_before(best) { v } else { best });

        if earliest.id == trigger.id {
            VoteVerdict::Accept
        } else {
            VoteVerdict::Duplicate {
                kept_vote_id: earliest.id.clone(),
            }
        }
    }
}
