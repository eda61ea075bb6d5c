//! `run` subcommand: one lookup, result printed as JSON.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use caseprobe_cdp::ChromeLauncher;
use caseprobe_config::{cleanup_sessions, Credentials, SessionLayout, Settings, StateFiles};
use caseprobe_core::{RunRequest, RunStatus, Runner};

/// Options of one `run` invocation.
pub(crate) struct RunArgs {
    pub identifier: String,
    pub portal: String,
    pub debug: bool,
    pub headless: bool,
}

pub(crate) async fn run_lookup(mut settings: Settings, args: RunArgs) -> anyhow::Result<ExitCode> {
    if args.headless {
        settings.browser.headless = true;
    }

    let state = StateFiles::new(&settings.runtime);
    state.ensure().context("Failed to create state files")?;
    let selectors = state
        .load_selectors()
        .with_context(|| format!("Failed to read {}", state.selectors.display()))?;
    let registry = state
        .load_portals()
        .with_context(|| format!("Failed to read {}", state.portals.display()))?;

    // An unknown portal still produces a recorded result.
    let credentials = registry.resolve(&args.portal).unwrap_or_else(|| {
        warn!("Portal '{}' not found in {}", args.portal, state.portals.display());
        Credentials::new("", "", "")
    });

    let layout = SessionLayout::new(settings.runtime.root_dir());
    let removed = cleanup_sessions(&layout.sessions_dir(), settings.runtime.session_retention_days);
    if removed > 0 {
        info!("Removed {} expired session folder(s)", removed);
    }
    let paths = layout
        .create(&args.portal, &args.identifier)
        .context("Failed to create session directory")?;
    info!("Session directory: {}", paths.root.display());

    let launcher = ChromeLauncher::new(settings.browser.clone(), &settings.runtime.root_dir());
    let runner = Runner::new(Arc::new(launcher), &settings);
    let result = runner
        .run(RunRequest {
            identifier: args.identifier,
            credentials,
            selectors,
            paths,
            debug: args.debug,
        })
        .await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(ExitCode::from(exit_status(result.status())))
}

/// Process exit status for a run outcome.
pub(crate) fn exit_status(status: RunStatus) -> u8 {
    match status {
        RunStatus::Success => 0,
        RunStatus::PasswordError => 2,
        RunStatus::Failed => 1,
    }
}
