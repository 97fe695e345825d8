use serde::{Deserialize, Serialize};

use crate::model::{Problem, Vote};

/// A document mutation delivered by the hosting event system.
///
/// Snapshots are taken at the moment the mutation was observed; handlers
/// re-read anything they write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreEvent {
    ProblemCreated {
        problem: Problem,
    },
    VoteCreated {
        vote: Vote,
    },
    ProblemUpdated {
        before: Problem,
        after: Problem,
    },
}

impl StoreEvent {
    /// Id of the document the event is about.
    pub fn document_id(&self) -> &str {
        match self {
            StoreEvent::ProblemCreated { problem } => &problem.id,
            StoreEvent::VoteCreated { vote } => &vote.id,
            StoreEvent::ProblemUpdated { after, .. } => &after.id,
        }
    }
}

