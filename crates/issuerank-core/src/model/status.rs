//! Moderation status of a problem.
//!
//! Transitions are driven by an external moderation workflow; this crate only
//! compares statuses and decides which ones are still open.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    #[default]
    Pending,
    Approved,
    Resolved,
    Rejected,
    /// Statuses added by the moderation workflow that this crate does not name.
    Other(String),
}

impl Status {
    /// Statuses whose problems keep decaying.
    pub const OPEN: [Status; 2] = [Status::Pending, Status::Approved];

    /// Open problems are still eligible for decay sweeps.
    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::Resolved => "resolved",
            Status::Rejected => "rejected",
            Status::Other(raw) => raw,
        }
    }
}

impl From<&str> for Status {
    fn from(raw: &str) -> Self {
        match raw {
            "pending" => Status::Pending,
            "approved" => Status::Approved,
            "resolved" => Status::Resolved,
            "rejected" => Status::Rejected,
            _ => Status::Other(raw.to_string()),
        }
    }
}

impl From<String> for Status {
    fn from(raw: String) -> Self {
        Status::from(raw.as_str())
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
