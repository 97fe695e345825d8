//! Problem commands: report, show, list and moderate.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use issuerank_core::storage::ProblemUpdate;
use issuerank_core::{Category, DocumentStore, Problem, Status, StoreEvent};
use uuid::Uuid;

use super::{parse_time, print_reaction, CommandResult, Context};

#[derive(Subcommand)]
pub enum ProblemAction {
    /// Report a new problem and run the creation handler
    Report {
        /// Short description shown to voters
        title: String,
        /// water, electricity, road, garbage, drainage or any other label
        #[arg(long, default_value = "other")]
        category: String,
        /// Reporting user ID
        #[arg(long)]
        reported_by: String,
        /// Explicit problem ID (default: random UUID)
        #[arg(long)]
        id: Option<String>,
        /// Report time in RFC 3339 (default: now)
        #[arg(long, value_parser = parse_time)]
        created_at: Option<DateTime<Utc>>,
    },
    /// Show one problem as JSON
    Show {
        /// Problem ID
        id: String,
    },
    /// List problems by priority
    List {
        /// Only pending and approved problems
        #[arg(long)]
        open: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a problem's status and notify the reporter
    Status {
        /// Problem ID
        id: String,
        /// pending, approved, resolved, rejected or any other label
        status: String,
    },
}

pub fn run(action: ProblemAction, ctx: &Context) -> CommandResult {
    let store = ctx.open_store()?;

    match action {
        ProblemAction::Report {
            title,
            category,
            reported_by,
            id,
            created_at,
        } => {
            let problem = Problem::reported(
                id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                title,
                Category::from(category),
                reported_by,
                created_at.unwrap_or_else(Utc::now),
            );
            store.insert_problem(&problem)?;
            let reactor = ctx.reactor(store)?;
            let reaction = reactor.dispatch(&StoreEvent::ProblemCreated { problem }, Utc::now())?;
            print_reaction(&reaction)?;
        }
        ProblemAction::Show { id } => {
            let problem = store.problem(&id)?.ok_or(format!("problem not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&problem)?);
        }
        ProblemAction::List { open, json } => {
            let problems = store.ranked_problems(open)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&problems)?);
            } else if problems.is_empty() {
                println!("No problems.");
            } else {
                for p in &problems {
                    let score = p
                        .priority_score
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".into());
                    println!(
                        "{score:>5}  {:<9} {:<12} {:>3} votes  {}  {}",
                        p.status, p.category, p.vote_count, p.id, p.title
                    );
                }
            }
        }
        ProblemAction::Status { id, status } => {
            let before = store.problem(&id)?.ok_or(format!("problem not found: {id}"))?;
            store.update_problem(&id, &ProblemUpdate::new().status(Status::from(status)))?;
            let after = store.problem(&id)?.ok_or(format!("problem not found: {id}"))?;

            let reactor = ctx.reactor(store)?;
            let reaction = reactor.dispatch(&StoreEvent::ProblemUpdated { before, after }, Utc::now())?;
            print_reaction(&reaction)?;
        }
    }
    Ok(())
}
