//! Per-run context handed to every step.

use std::path::{Path, PathBuf};

use caseprobe_config::{PortalConfig, SelectorConfig, SessionPaths, Timings};
use chrono::Local;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::driver::Page;
use crate::result::{RunResult, StepCode};

/// Everything a step needs besides the page: configuration, output paths
/// and the event/critical logs.
pub struct SessionContext {
    pub paths: SessionPaths,
    pub selectors: SelectorConfig,
    pub timings: Timings,
    pub portal: PortalConfig,
    /// Screenshot after every step, not only on failures and milestones.
    pub debug: bool,
}

impl SessionContext {
    pub fn new(
        paths: SessionPaths,
        selectors: SelectorConfig,
        timings: Timings,
        portal: PortalConfig,
        debug: bool,
    ) -> Self {
        Self {
            paths,
            selectors,
            timings,
            portal,
            debug,
        }
    }

    /// Append one timestamped `STEP_..: message` line to the event log.
    pub async fn event(&self, step: StepCode, message: &str) {
        info!(step = step.as_str(), "{}", message);
        let line = format!(
            "{} {}: {}\n",
            Local::now().format("%Y-%m-%dT%H:%M:%S"),
            step,
            message
        );
        if let Err(e) = append(&self.paths.log, &line).await {
            warn!("Failed to append to event log {}: {}", self.paths.log.display(), e);
        }
    }

    /// Append a bullet to the critical-issues log.
    pub async fn critical(&self, step: StepCode, message: &str) {
        warn!(step = step.as_str(), "critical: {}", message);
        let line = format!("- {}: {}\n", step, message);
        if let Err(e) = append(&self.paths.critical_log, &line).await {
            warn!(
                "Failed to append to critical log {}: {}",
                self.paths.critical_log.display(),
                e
            );
        }
    }

    /// Event line, plus a critical bullet when the step is blocking.
    pub async fn report(&self, step: StepCode, message: &str) {
        self.event(step, message).await;
        if step.is_critical() {
            self.critical(step, message).await;
        }
    }

    /// Full-page screenshot named `<timestamp>_<step>.png`. Best effort.
    pub async fn screenshot(&self, page: &dyn Page, step: StepCode) -> Option<PathBuf> {
        let filename = format!("{}_{}.png", Local::now().format("%Y%m%d_%H%M%S_%3f"), step);
        let path = self.paths.screens_dir.join(filename);
        if let Err(e) = fs::create_dir_all(&self.paths.screens_dir).await {
            warn!("Cannot create screenshot dir: {}", e);
            return None;
        }
        match page.screenshot(&path).await {
            Ok(()) => {
                debug!("Screenshot saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Screenshot for {} failed: {}", step, e);
                None
            }
        }
    }

    /// Screenshot only in debug mode.
    pub async fn debug_screenshot(&self, page: &dyn Page, step: StepCode) {
        if self.debug {
            self.screenshot(page, step).await;
        }
    }

    /// Build a failed result: logs it, screenshots it, and returns it.
    pub async fn fail(
        &self,
        page: Option<&dyn Page>,
        step: StepCode,
        message: &str,
        detail: impl Into<String>,
    ) -> RunResult {
        self.report(step, message).await;
        let screenshot = match page {
            Some(page) => self.screenshot(page, step).await,
            None => None,
        };
        RunResult::failed(step, message, detail).with_screenshot(screenshot)
    }

    /// Append the final result as one JSON line to the event log.
    pub async fn record_result(&self, result: &RunResult) {
        let line = format!("{}\n", result.to_json_line());
        if let Err(e) = append(&self.paths.log, &line).await {
            warn!("Failed to record run result: {}", e);
        }
    }
}

async fn append(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(line.as_bytes()).await
}
