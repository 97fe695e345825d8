//! Reactions to problem and vote mutations.
//!
//! Each handler is independent: it reads what it needs from the store, makes
//! its decision and writes back. Handlers may run concurrently and may be
//! re-run by the host for the same event; every write goes through a store
//! transaction so a re-run never double-counts.
//!
//! | Event            | Handler               | Writes                               |
//! |------------------|-----------------------|--------------------------------------|
//! | problem created  | [`on_create`]         | voteCount, status, priorityScore     |
//! | vote created     | [`on_vote_created`]   | voteCount, priorityScore, lastUpdated; or deletes the vote |
//! | problem updated  | [`on_status_changed`] | nothing; may notify the reporter     |
//!
//! [`on_create`]: ProblemMutationReactor::on_create
//! [`on_vote_created`]: ProblemMutationReactor::on_vote_created
//! [`on_status_changed`]: ProblemMutationReactor::on_status_changed

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dedup::{VoteDeduplicator, VoteVerdict};
use crate::error::Result;
use crate::events::StoreEvent;
use crate::model::{Problem, Status, Vote};
use crate::notify::{DeliveryOutcome, NotificationDispatcher, StatusNotice};
use crate::scoring::ScoreCalculator;
use crate::storage::{DocumentStore, Modification, ProblemUpdate, VoteTally, WriteTime};

/// Why a status change produced no notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ReporterMissing,
    NoDeviceToken,
}

/// What a handler did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reaction", rename_all = "snake_case")]
pub enum Reaction {
    Initialized {
        problem_id: String,
        priority_score: u32,
    },
    /// A previous run (or an earlier vote) already scored the problem.
    AlreadyInitialized {
        problem_id: String,
        priority_score: Option<u32>,
    },
    ProblemMissing {
        problem_id: String,
    },
    VoteCounted {
        problem_id: String,
        vote_id: String,
        vote_count: u32,
        priority_score: u32,
    },
    VoteAlreadyCounted {
        vote_id: String,
    },
    DuplicateVoteRemoved {
        vote_id: String,
        kept_vote_id: String,
    },
    /// The vote was deleted before this handler could count it.
    VoteMissing {
        vote_id: String,
    },
    StatusUnchanged {
        problem_id: String,
    },
    Notified {
        problem_id: String,
        status: Status,
        outcome: DeliveryOutcome,
    },
    NotificationSkipped {
        problem_id: String,
        reason: SkipReason,
    },
}

/// Dispatches store events to the three mutation handlers.
pub struct ProblemMutationReactor {
    store: Arc<dyn DocumentStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    notice: StatusNotice,
}

impl ProblemMutationReactor {
    pub fn new(store: Arc<dyn DocumentStore>, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            notice: StatusNotice::default(),
        }
    }

    /// Override the status-change message template.
    pub fn with_notice(mut self, notice: StatusNotice) -> Self {
        self.notice = notice;
        self
    }

    /// Route an event to its handler.
    pub fn dispatch(&self, event: &StoreEvent, now: DateTime<Utc>) -> Result<Reaction> {
        debug!(document = event.document_id(), "dispatching store event");
        match event {
            StoreEvent::ProblemCreated { problem } => self.on_create(problem, now),
            StoreEvent::VoteCreated { vote } => self.on_vote_created(vote, now),
            StoreEvent::ProblemUpdated { before, after } => self.on_status_changed(before, after),
        }
    }

    /// Initialise a new problem's counters and score.
    ///
    /// Only an uninitialised document is written; re-running the handler, or
    /// running it after a vote already scored the problem, leaves it alone.
    pub fn on_create(&self, problem: &Problem, now: DateTime<Utc>) -> Result<Reaction> {
        let outcome = self.store.modify_problem(&problem.id, &mut |current| {
            if current.is_initialized() {
                return None;
            }
            let score = ScoreCalculator::score(0, &current.category, current.created_at, now);
            Some(
                ProblemUpdate::new()
                    .vote_count(0)
                    .status(Status::Pending)
                    .priority_score(score),
            )
        })?;

        let reaction = match outcome {
            Modification::Applied(after) => {
                let priority_score = after.priority_score.unwrap_or_default();
                info!(problem = %after.id, priority_score, "initialised problem");
                Reaction::Initialized {
                    problem_id: after.id,
                    priority_score,
                }
            }
            Modification::Unchanged(current) => {
                debug!(problem = %current.id, "problem already initialised");
                Reaction::AlreadyInitialized {
                    problem_id: current.id,
                    priority_score: current.priority_score,
                }
            }
            Modification::Missing => {
                warn!(problem = %problem.id, "problem deleted before initialisation");
                Reaction::ProblemMissing {
                    problem_id: problem.id.clone(),
                }
            }
        };
        Ok(reaction)
    }

    /// Count a new vote, or delete it if the voter already has one.
    pub fn on_vote_created(&self, vote: &Vote, now: DateTime<Utc>) -> Result<Reaction> {
        let visible = self.store.votes_for(&vote.problem_id, &vote.user_id)?;
        if let VoteVerdict::Duplicate { kept_vote_id } = VoteDeduplicator::judge(vote, &visible) {
            return self.remove_duplicate(vote, kept_vote_id);
        }

        let tally = self.store.count_vote(vote, &mut |problem| {
            let vote_count = problem.vote_count.saturating_add(1);
            let score =
                ScoreCalculator::score(vote_count, &problem.category, problem.created_at, now);
            ProblemUpdate::new()
                .vote_count(vote_count)
                .priority_score(score)
                .touched(WriteTime::ServerTimestamp)
        })?;

        let reaction = match tally {
            VoteTally::Counted(problem) => {
                let priority_score = problem.priority_score.unwrap_or_default();
                info!(
                    problem = %problem.id,
                    vote = %vote.id,
                    vote_count = problem.vote_count,
                    priority_score,
                    "vote counted"
                );
                Reaction::VoteCounted {
                    problem_id: problem.id,
                    vote_id: vote.id.clone(),
                    vote_count: problem.vote_count,
                    priority_score,
                }
            }
            VoteTally::PairAlreadyCounted { counted_vote_id } => {
                return self.remove_duplicate(vote, counted_vote_id);
            }
            VoteTally::AlreadyCounted => {
                debug!(vote = %vote.id, "vote already counted");
                Reaction::VoteAlreadyCounted {
                    vote_id: vote.id.clone(),
                }
            }
            VoteTally::VoteMissing => {
                debug!(vote = %vote.id, "vote deleted before counting");
                Reaction::VoteMissing {
                    vote_id: vote.id.clone(),
                }
            }
            VoteTally::ProblemMissing => {
                warn!(problem = %vote.problem_id, vote = %vote.id, "vote for missing problem ignored");
                Reaction::ProblemMissing {
                    problem_id: vote.problem_id.clone(),
                }
            }
        };
        Ok(reaction)
    }

    fn remove_duplicate(&self, vote: &Vote, kept_vote_id: String) -> Result<Reaction> {
        let removed = self.store.delete_vote(&vote.id)?;
        warn!(
            vote = %vote.id,
            kept = %kept_vote_id,
            problem = %vote.problem_id,
            removed,
            "duplicate vote deleted"
        );
        Ok(Reaction::DuplicateVoteRemoved {
            vote_id: vote.id.clone(),
            kept_vote_id,
        })
    }

    /// Tell the reporter about a status change.
    ///
    /// Nothing happens unless `before.status != after.status`. The score is
    /// not touched.
    pub fn on_status_changed(&self, before: &Problem, after: &Problem) -> Result<Reaction> {
        if before.status == after.status {
            return Ok(Reaction::StatusUnchanged {
                problem_id: after.id.clone(),
            });
        }

        let skipped = |reason: SkipReason| {
            debug!(problem = %after.id, ?reason, "status change notification skipped");
            Ok(Reaction::NotificationSkipped {
                problem_id: after.id.clone(),
                reason,
            })
        };

        let Some(reporter) = self.store.user(&after.reported_by)? else {
            return skipped(SkipReason::ReporterMissing);
        };
        let Some(token) = reporter.device_token() else {
            return skipped(SkipReason::NoDeviceToken);
        };

        let message = self.notice.render(after);
        let outcome = self.dispatcher.send(token, &message)?;
        info!(
            problem = %after.id,
            from = %before.status,
            to = %after.status,
            dispatcher = self.dispatcher.name(),
            "reporter notified of status change"
        );

        Ok(Reaction::Notified {
            problem_id: after.id.clone(),
            status: after.status.clone(),
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, DispatchError};
    use crate::model::{Category, User};
    use crate::notify::Notification;
    use crate::storage::SqliteStore;
    use chrono::Duration;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<(String, Notification)>>,
        fail: bool,
    }

    impl NotificationDispatcher for RecordingDispatcher {
        fn name(&self) -> &str {
            "recording"
        }

        fn send(
            &self,
            device_token: &str,
            notification: &Notification,
        ) -> std::result::Result<DeliveryOutcome, DispatchError> {
            if self.fail {
                return Err(DispatchError::Rejected {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((device_token.to_string(), notification.clone()));
            Ok(DeliveryOutcome::Delivered { message_id: None })
        }
    }

    fn setup() -> (Arc<SqliteStore>, Arc<RecordingDispatcher>, ProblemMutationReactor) {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let reactor = ProblemMutationReactor::new(store.clone(), dispatcher.clone());
        (store, dispatcher, reactor)
    }

    fn report(store: &SqliteStore, id: &str, category: Category, created_at: DateTime<Utc>) -> Problem {
        let problem = Problem::reported(id, "Overflowing bins", category, "reporter", created_at);
        store.insert_problem(&problem).unwrap();
        problem
    }

    #[test]
    fn on_create_scores_fresh_problem() {
        let (store, _, reactor) = setup();
        let now = Utc::now();
        let problem = report(&store, "p1", Category::Garbage, now);

        let reaction = reactor.on_create(&problem, now).unwrap();
        assert_eq!(reaction, Reaction::Initialized { problem_id: "p1".into(), priority_score: 20 });

        let stored = store.problem("p1").unwrap().unwrap();
        assert_eq!(stored.priority_score, Some(20));
        assert_eq!(stored.vote_count, 0);
        assert_eq!(stored.status, Status::Pending);
    }

    #[test]
    fn on_create_uses_age_at_handling_time() {
        let (store, _, reactor) = setup();
        let now = Utc::now();
        let problem = report(&store, "p1", Category::Water, now - Duration::weeks(2));
        reactor.on_create(&problem, now).unwrap();
        assert_eq!(store.problem("p1").unwrap().unwrap().priority_score, Some(26));
    }

    #[test]
    fn on_create_rerun_is_a_no_op() {
        let (store, _, reactor) = setup();
        let now = Utc::now();
        let problem = report(&store, "p1", Category::Road, now);
        reactor.on_create(&problem, now).unwrap();

        let again = reactor.on_create(&problem, now).unwrap();
        assert_eq!(
            again,
            Reaction::AlreadyInitialized { problem_id: "p1".into(), priority_score: Some(20) }
        );
    }

    #[test]
    fn on_create_for_deleted_problem_is_benign() {
        let (_, _, reactor) = setup();
        let ghost = Problem::reported("gone", "x", Category::Other, "u", Utc::now());
        assert_eq!(
            reactor.on_create(&ghost, Utc::now()).unwrap(),
            Reaction::ProblemMissing { problem_id: "gone".into() }
        );
    }

    #[test]
    fn vote_increments_count_and_rescores() {
        let (store, _, reactor) = setup();
        let now = Utc::now();
        let problem = report(&store, "p1", Category::Road, now);
        reactor.on_create(&problem, now).unwrap();

        let vote = Vote::new("v1", "p1", "voter", now);
        store.insert_vote(&vote).unwrap();
        let reaction = reactor.on_vote_created(&vote, now).unwrap();

        assert_eq!(
            reaction,
            Reaction::VoteCounted {
                problem_id: "p1".into(),
                vote_id: "v1".into(),
                vote_count: 1,
                priority_score: 25,
            }
        );
        let stored = store.problem("p1").unwrap().unwrap();
        assert!(stored.last_updated.is_some());
    }

    #[test]
    fn vote_handler_rerun_does_not_double_count() {
        let (store, _, reactor) = setup();
        let now = Utc::now();
        report(&store, "p1", Category::Road, now);
        let vote = Vote::new("v1", "p1", "voter", now);
        store.insert_vote(&vote).unwrap();

        reactor.on_vote_created(&vote, now).unwrap();
        let rerun = reactor.on_vote_created(&vote, now).unwrap();
        assert_eq!(rerun, Reaction::VoteAlreadyCounted { vote_id: "v1".into() });
        assert_eq!(store.problem("p1").unwrap().unwrap().vote_count, 1);
    }

    #[test]
    fn second_vote_from_same_user_is_deleted() {
        let (store, _, reactor) = setup();
        let now = Utc::now();
        report(&store, "p1", Category::Drainage, now);
        let first = Vote::new("v1", "p1", "voter", now);
        let second = Vote::new("v2", "p1", "voter", now + Duration::seconds(1));

        store.insert_vote(&first).unwrap();
        reactor.on_vote_created(&first, now).unwrap();
        store.insert_vote(&second).unwrap();
        let reaction = reactor.on_vote_created(&second, now).unwrap();

        assert_eq!(
            reaction,
            Reaction::DuplicateVoteRemoved { vote_id: "v2".into(), kept_vote_id: "v1".into() }
        );
        assert!(store.vote("v2").unwrap().is_none());
        assert_eq!(store.problem("p1").unwrap().unwrap().vote_count, 1);
    }

    #[test]
    fn vote_for_missing_problem_is_ignored() {
        let (store, _, reactor) = setup();
        let vote = Vote::new("v1", "nowhere", "voter", Utc::now());
        store.insert_vote(&vote).unwrap();
        assert_eq!(
            reactor.on_vote_created(&vote, Utc::now()).unwrap(),
            Reaction::ProblemMissing { problem_id: "nowhere".into() }
        );
        assert!(!store.vote("v1").unwrap().unwrap().is_counted());
    }

    #[test]
    fn status_change_notifies_reporter() {
        let (store, dispatcher, reactor) = setup();
        store
            .upsert_user(&User { id: "reporter".into(), fcm_token: Some("tok-1".into()) })
            .unwrap();
        let before = report(&store, "p1", Category::Water, Utc::now());
        let mut after = before.clone();
        after.status = Status::Resolved;

        let reaction = reactor.on_status_changed(&before, &after).unwrap();
        assert!(matches!(reaction, Reaction::Notified { status: Status::Resolved, .. }));

        let sent = dispatcher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "tok-1");
        assert_eq!(sent[0].1.body, "Your report \"Overflowing bins\" is now resolved.");
    }

    #[test]
    fn unchanged_status_sends_nothing() {
        let (store, dispatcher, reactor) = setup();
        store
            .upsert_user(&User { id: "reporter".into(), fcm_token: Some("tok-1".into()) })
            .unwrap();
        let before = report(&store, "p1", Category::Water, Utc::now());
        let mut after = before.clone();
        after.title = "Renamed".into();

        assert_eq!(
            reactor.on_status_changed(&before, &after).unwrap(),
            Reaction::StatusUnchanged { problem_id: "p1".into() }
        );
        assert!(dispatcher.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn reporter_without_token_is_skipped() {
        let (store, dispatcher, reactor) = setup();
        store.upsert_user(&User { id: "reporter".into(), fcm_token: None }).unwrap();
        let before = report(&store, "p1", Category::Water, Utc::now());
        let mut after = before.clone();
        after.status = Status::Approved;

        assert_eq!(
            reactor.on_status_changed(&before, &after).unwrap(),
            Reaction::NotificationSkipped { problem_id: "p1".into(), reason: SkipReason::NoDeviceToken }
        );

        let mut orphan = after.clone();
        orphan.reported_by = "nobody".into();
        assert_eq!(
            reactor.on_status_changed(&before, &orphan).unwrap(),
            Reaction::NotificationSkipped { problem_id: "p1".into(), reason: SkipReason::ReporterMissing }
        );
        assert!(dispatcher.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn dispatch_failure_propagates() {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let dispatcher = Arc::new(RecordingDispatcher { fail: true, ..Default::default() });
        let reactor = ProblemMutationReactor::new(store.clone(), dispatcher);
        store
            .upsert_user(&User { id: "reporter".into(), fcm_token: Some("tok".into()) })
            .unwrap();
        let before = report(&store, "p1", Category::Road, Utc::now());
        let mut after = before.clone();
        after.status = Status::Rejected;

        let err = reactor.on_status_changed(&before, &after).unwrap_err();
        assert!(matches!(err, CoreError::Dispatch(DispatchError::Rejected { status: 503, .. })));
    }

    #[test]
    fn dispatch_routes_events() {
        let (store, _, reactor) = setup();
        let now = Utc::now();
        let problem = report(&store, "p1", Category::Other, now);
        let reaction = reactor
            .dispatch(&StoreEvent::ProblemCreated { problem }, now)
            .unwrap();
        assert!(matches!(reaction, Reaction::Initialized { priority_score: 10, .. }));
    }
}
