use clap::Subcommand;
use issuerank_core::{DocumentStore, User};

use super::{CommandResult, Context};

#[derive(Subcommand)]
pub enum UserAction {
    /// Create or update a user
    Register {
        /// User ID
        id: String,
        /// FCM device token for status notifications
        #[arg(long)]
        token: Option<String>,
    },
    /// Show a user as JSON
    Show {
        /// User ID
        id: String,
    },
}

pub fn run(action: UserAction, ctx: &Context) -> CommandResult {
    let store = ctx.open_store()?;

    match action {
        UserAction::Register { id, token } => {
            let user = User { id, fcm_token: token };
            store.upsert_user(&user)?;
            println!("User registered: {}", user.id);
        }
        UserAction::Show { id } => {
            let user = store.user(&id)?.ok_or(format!("user not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
    }
    Ok(())
}
