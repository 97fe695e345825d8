use chrono::{DateTime, Utc};
use clap::Args;
use issuerank_core::{DocumentStore, ScoreCalculator};
use serde_json::json;

use super::{parse_time, CommandResult, Context};

#[derive(Args)]
pub struct ScoreArgs {
    /// Problem ID
    pub id: String,
    /// Evaluate as of this RFC 3339 time (default: now)
    #[arg(long, value_parser = parse_time)]
    pub at: Option<DateTime<Utc>>,
}

pub fn run(args: ScoreArgs, ctx: &Context) -> CommandResult {
    let store = ctx.open_store()?;
    let problem = store
        .problem(&args.id)?
        .ok_or(format!("problem not found: {}", args.id))?;

    let breakdown = ScoreCalculator::breakdown(
        problem.vote_count,
        &problem.category,
        problem.created_at,
        args.at.unwrap_or_else(Utc::now),
    );
    let out = json!({
        "problemId": problem.id,
        "storedScore": problem.priority_score,
        "breakdown": breakdown,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
