use chrono::{DateTime, Utc};
use clap::Subcommand;
use issuerank_core::{StoreEvent, Vote};
use uuid::Uuid;

use super::{parse_time, print_reaction, CommandResult, Context};

#[derive(Subcommand)]
pub enum VoteAction {
    /// Record a vote and run the vote handler
    Cast {
        /// Problem ID
        problem_id: String,
        /// Voting user ID
        #[arg(long)]
        user: String,
        /// Explicit vote ID (default: random UUID)
        #[arg(long)]
        id: Option<String>,
        /// Client submission time in RFC 3339 (default: now)
        #[arg(long, value_parser = parse_time)]
        created_at: Option<DateTime<Utc>>,
    },
    /// Re-run the vote handler for a stored vote, as a redelivered event would
    Replay {
        /// Vote ID
        id: String,
    },
}

pub fn run(action: VoteAction, ctx: &Context) -> CommandResult {
    let store = ctx.open_store()?;

    let vote = match action {
        VoteAction::Cast {
            problem_id,
            user,
            id,
            created_at,
        } => {
            let vote = Vote::new(
                id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                problem_id,
                user,
                created_at.unwrap_or_else(Utc::now),
            );
            store.insert_vote(&vote)?;
            vote
        }
        VoteAction::Replay { id } => store.vote(&id)?.ok_or(format!("vote not found: {id}"))?,
    };

    let reactor = ctx.reactor(store)?;
    let reaction = reactor.dispatch(&StoreEvent::VoteCreated { vote }, Utc::now())?;
    print_reaction(&reaction)
}
