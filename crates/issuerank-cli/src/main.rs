use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "issuerank", version, about = "Community problem priority ranking")]
struct Cli {
    /// Config file (default: ~/.config/issuerank/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database file, overriding store.path
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report, inspect and moderate problems
    Problem {
        #[command(subcommand)]
        action: commands::problem::ProblemAction,
    },
    /// Cast and replay votes
    Vote {
        #[command(subcommand)]
        action: commands::vote::VoteAction,
    },
    /// Register users and their device tokens
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Run the age decay sweep
    Decay {
        #[command(subcommand)]
        action: commands::decay::DecayAction,
    },
    /// Explain a problem's priority score
    Score(commands::score::ScoreArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so command output on stdout stays machine-readable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();

    let ctx = match Context::load(cli.config, cli.db) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(&ctx.config.logging.level);

    let result = match cli.command {
        Commands::Problem { action } => commands::problem::run(action, &ctx),
        Commands::Vote { action } => commands::vote::run(action, &ctx),
        Commands::User { action } => commands::user::run(action, &ctx),
        Commands::Decay { action } => commands::decay::run(action, &ctx),
        Commands::Score(args) => commands::score::run(args, &ctx),
        Commands::Config { action } => commands::config::run(action, &ctx),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
