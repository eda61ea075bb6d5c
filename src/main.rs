//! caseprobe: looks up case records in the portal by driving Chrome.
//!
//! Main entry point for the CLI.

mod cli;
mod cmd_run;
mod cmd_sessions;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use caseprobe_config::{ConfigLoader, ConfigValidator};

use crate::cli::{Cli, Commands};
use crate::cmd_run::{run_lookup, RunArgs};
use crate::cmd_sessions::handle_sessions_command;

/// Initialize tracing with console and file output.
///
/// Log files are written to `<runtime_root>/debug/` with daily rotation.
/// The console layer writes to stderr so stdout carries only the result.
fn init_tracing(log_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("caseprobe")
        .filename_suffix("log")
        .max_log_files(14)
        .build(log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keeps the background writer alive for the program duration.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let settings = ConfigLoader::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    init_tracing(&settings.runtime.debug_dir())?;

    let validation = ConfigValidator::validate(&settings);
    for warning in &validation.warnings {
        warn!("{}: {}", warning.path, warning.message);
    }
    if !validation.is_valid() {
        for e in &validation.errors {
            error!("{}: {}", e.path, e.message);
        }
        anyhow::bail!("Invalid settings in {}", cli.config.display());
    }

    match cli.command {
        Commands::Run {
            identifier,
            portal,
            debug,
            headless,
        } => {
            run_lookup(
                settings,
                RunArgs {
                    identifier,
                    portal,
                    debug,
                    headless,
                },
            )
            .await
        }
        Commands::Sessions { action } => {
            handle_sessions_command(action, &settings)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
