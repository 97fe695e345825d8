//! Decay sweep commands.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use issuerank_core::DecaySweeper;
use tokio::sync::watch;

use super::{parse_time, CommandResult, Context};

#[derive(Subcommand)]
pub enum DecayAction {
    /// Run one sweep and print its report
    Run {
        /// Sweep as of this RFC 3339 time (default: now)
        #[arg(long, value_parser = parse_time)]
        at: Option<DateTime<Utc>>,
    },
    /// Sweep periodically until interrupted
    Watch {
        /// Seconds between sweeps (default: decay.interval_days)
        #[arg(long)]
        interval_secs: Option<u64>,
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        for_secs: Option<u64>,
    },
}

pub fn run(action: DecayAction, ctx: &Context) -> CommandResult {
    let store = ctx.open_store()?;
    let sweeper = DecaySweeper::new(store).with_open_statuses(ctx.config.decay.open_statuses());

    match action {
        DecayAction::Run { at } => {
            let report = sweeper.sweep_with_retry(at.unwrap_or_else(Utc::now))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        DecayAction::Watch {
            interval_secs,
            for_secs,
        } => {
            let period = interval_secs
                .map(|s| Duration::from_secs(s.max(1)))
                .unwrap_or_else(|| ctx.config.decay.interval());

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let completed = runtime.block_on(async {
                let (tx, rx) = watch::channel(false);
                let runner = tokio::spawn(Arc::new(sweeper).run_periodic(period, rx));

                match for_secs {
                    Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                    None => {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            tracing::warn!(error = %e, "ctrl-c handler unavailable, stopping");
                        }
                    }
                }
                let _ = tx.send(true);
                runner.await
            })?;
            println!("Completed {completed} sweep(s).");
        }
    }
    Ok(())
}
