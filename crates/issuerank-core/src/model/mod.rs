//! Documents held by the store: problems, votes and users.

mod category;
mod status;

pub use category::Category;
pub use status::Status;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reported community problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: String,
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub status: Status,
    pub reported_by: String,
    /// Immutable report time.
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub vote_count: u32,
    /// `None` until the creation handler has initialised the problem.
    #[serde(default)]
    pub priority_score: Option<u32>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Problem {
    /// A freshly submitted report, before any scoring has happened.
    pub fn reported(
        id: impl Into<String>,
        title: impl Into<String>,
        category: Category,
        reported_by: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category,
            status: Status::Pending,
            reported_by: reported_by.into(),
            created_at,
            vote_count: 0,
            priority_score: None,
            last_updated: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.priority_score.is_some()
    }
}

/// One user's vote on one problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    pub problem_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Set by the store in the same transaction that increments the problem.
    #[serde(default)]
    pub counted_at: Option<DateTime<Utc>>,
}

impl Vote {
    pub fn new(
        id: impl Into<String>,
        problem_id: impl Into<String>,
        user_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            problem_id: problem_id.into(),
            user_id: user_id.into(),
            created_at,
            counted_at: None,
        }
    }

    pub fn is_counted(&self) -> bool {
        self.counted_at.is_some()
    }

    /// Arrival order: creation time, then id to break ties.
    pub fn arrives_before(&self, other: &Vote) -> bool {
        (self.created_at, self.id.as_str()) < (other.created_at, other.id.as_str())
    }
}

/// A registered user. Only the device handle matters here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub fcm_token: Option<String>,
}

impl User {
    /// The push handle, if one is registered and non-empty.
    pub fn device_token(&self) -> Option<&str> {
        self.fcm_token.as_deref().filter(|t| !t.trim().is_empty())
    }
}
