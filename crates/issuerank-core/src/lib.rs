//! # issuerank Core Library
//!
//! Maintains a derived priority score for community-reported problems so
//! they can be ranked for civic attention. The CLI is a thin event host over
//! this library.
//!
//! ## Architecture
//!
//! - **Scoring**: a pure function of vote count, category severity and age
//! - **Deduplication**: at most one counted vote per (problem, user) pair
//! - **Reactor**: handlers for problem creation, vote arrival and status change
//! - **Decay**: a periodic sweep that re-scores every open problem atomically
//! - **Storage**: SQLite document store and TOML configuration
//! - **Notifications**: push delivery to the reporter's device
//!
//! ## Key Components
//!
//! - [`ScoreCalculator`]: Priority score function
//! - [`VoteDeduplicator`]: Duplicate vote verdicts
//! - [`ProblemMutationReactor`]: Event handlers
//! - [`DecaySweeper`]: Batch decay job
//! - [`DocumentStore`]: Storage boundary, implemented by [`SqliteStore`]
//! - [`NotificationDispatcher`]: Delivery boundary

pub mod decay;
pub mod dedup;
pub mod error;
pub mod events;
pub mod model;
pub mod notify;
pub mod reactor;
pub mod scoring;
pub mod storage;

pub use decay::{DecaySweeper, SweepReport};
pub use dedup::{VoteDeduplicator, VoteVerdict};
pub use error::{ConfigError, CoreError, DispatchError, StoreError};
pub use events::StoreEvent;
pub use model::{Category, Problem, Status, User, Vote};
pub use notify::{
    DeliveryOutcome, FcmDispatcher, LogDispatcher, Notification, NotificationDispatcher,
    StatusNotice,
};
pub use reactor::{ProblemMutationReactor, Reaction, SkipReason};
pub use scoring::{ScoreBreakdown, ScoreCalculator};
pub use storage::{Config, DocumentStore, SqliteStore};
