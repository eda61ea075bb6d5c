//! `sessions` subcommand handlers.

use caseprobe_config::{clear_sessions, cleanup_sessions, SessionLayout, Settings};
use tracing::info;

use crate::cli::SessionsAction;

pub(crate) fn handle_sessions_command(action: SessionsAction, settings: &Settings) -> anyhow::Result<()> {
    let sessions_dir = SessionLayout::new(settings.runtime.root_dir()).sessions_dir();

    let removed = match action {
        SessionsAction::Clean { max_age_days } => {
            let days = max_age_days.unwrap_or(settings.runtime.session_retention_days);
            info!("Removing sessions older than {} day(s) from {}", days, sessions_dir.display());
            cleanup_sessions(&sessions_dir, days)
        }
        SessionsAction::Clear => {
            info!("Removing all sessions from {}", sessions_dir.display());
            clear_sessions(&sessions_dir)
        }
    };

    println!("Removed {} session folder(s).", removed);
    Ok(())
}
