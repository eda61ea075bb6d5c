//! Run orchestrator: one labelled pipeline per lookup, every fault turned
//! into a [`RunResult`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use caseprobe_config::{Credentials, PortalConfig, SelectorConfig, SessionPaths, Settings, Timings};
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::dialogs::dismiss_dialogs;
use crate::driver::{BrowserLauncher, Page, PageRef};
use crate::error::DriverError;
use crate::export::export_artifacts;
use crate::frames::{current_frame, FrameSlot};
use crate::login::login;
use crate::navigate::{locate_record, open_record, SearchOutcome};
use crate::result::{RunResult, StepCode};
use crate::session::SessionContext;

/// Early exit from the pipeline.
#[derive(Debug)]
pub(crate) enum Halt {
    /// A step classified the outcome itself.
    Stop(RunResult),
    /// Driver fault, classified at the run boundary.
    Driver(DriverError),
}

impl From<DriverError> for Halt {
    fn from(e: DriverError) -> Self {
        Halt::Driver(e)
    }
}

/// Inputs for one lookup.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub identifier: String,
    pub credentials: Credentials,
    pub selectors: SelectorConfig,
    pub paths: SessionPaths,
    pub debug: bool,
}

/// Drives one lookup at a time against a launched browser.
pub struct Runner {
    launcher: Arc<dyn BrowserLauncher>,
    timings: Timings,
    portal: PortalConfig,
}

impl Runner {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: &Settings) -> Self {
        Self {
            launcher,
            timings: settings.timings.clone(),
            portal: settings.portal.clone(),
        }
    }

    /// Run the whole pipeline. Never fails and never panics: every outcome,
    /// including driver crashes, comes back as a result and is appended to
    /// the session log.
    pub async fn run(&self, request: RunRequest) -> RunResult {
        let ctx = SessionContext::new(
            request.paths.clone(),
            request.selectors.clone(),
            self.timings.clone(),
            self.portal.clone(),
            request.debug,
        );
        let slot: Mutex<Option<PageRef>> = Mutex::new(None);

        let outcome = AssertUnwindSafe(self.pipeline(&ctx, &request, &slot))
            .catch_unwind()
            .await;
        let page = slot.lock().clone();

        let result = match outcome {
            Ok(Ok(result)) | Ok(Err(Halt::Stop(result))) => result,
            Ok(Err(Halt::Driver(e))) => {
                let step = if e.is_timeout() {
                    StepCode::Timeout
                } else {
                    StepCode::UnexpectedError
                };
                error!("Run aborted at the boundary: {}", e);
                let message = if e.is_timeout() {
                    "Przekroczono czas oczekiwania"
                } else {
                    "Nieoczekiwany błąd"
                };
                ctx.fail(page.as_deref(), step, message, e.to_string()).await
            }
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                error!("Run panicked: {}", detail);
                ctx.fail(page.as_deref(), StepCode::UnexpectedError, "Nieoczekiwany błąd", detail)
                    .await
            }
        };

        if let Some(page) = page {
            if let Err(e) = page.close().await {
                warn!("Closing page failed: {}", e);
            }
        }
        ctx.record_result(&result).await;
        info!(
            status = ?result.status(),
            step = result.last_step().as_str(),
            "Run finished"
        );
        result
    }

    async fn pipeline(
        &self,
        ctx: &SessionContext,
        request: &RunRequest,
        slot: &Mutex<Option<PageRef>>,
    ) -> Result<RunResult, Halt> {
        if let Err(e) = request.credentials.validate() {
            warn!("Credentials rejected: {}", e);
            return Err(Halt::Stop(
                ctx.fail(None, StepCode::MissingPortalData, "Brak danych portalu", "url/login/password")
                    .await,
            ));
        }

        let page = match self.launcher.launch().await {
            Ok(page) => page,
            Err(DriverError::Unavailable(detail)) => {
                return Err(Halt::Stop(
                    ctx.fail(
                        None,
                        StepCode::ImportDriver,
                        "Brak przeglądarki Chrome – zainstaluj Google Chrome",
                        detail,
                    )
                    .await,
                ));
            }
            Err(e) => return Err(e.into()),
        };
        *slot.lock() = Some(page.clone());
        let page: &dyn Page = page.as_ref();

        page.accept_native_dialogs().await?;
        page.goto(&request.credentials.url, self.timings.navigation_timeout())
            .await?;
        ctx.event(
            StepCode::OpenUrl,
            &format!("Otwarto {}", request.credentials.url),
        )
        .await;
        ctx.debug_screenshot(page, StepCode::OpenUrl).await;

        login(page, ctx, &request.credentials).await?;
        dismiss_dialogs(page, ctx).await;
        ctx.debug_screenshot(page, StepCode::DismissDialogs).await;

        let identifier = request.identifier.trim();
        match locate_record(page, ctx, identifier).await? {
            SearchOutcome::Found(hit) => {
                let frame = open_record(page, ctx, &hit).await?;
                let report = export_artifacts(page, frame.as_deref(), &ctx.paths.export_dir).await;
                ctx.event(
                    StepCode::ExportArtifacts,
                    &format!("Zapisano artefakty: {}", report.written()),
                )
                .await;
                let message = format!("Znaleziono i otwarto {}", identifier);
                Ok(RunResult::success(StepCode::ExportArtifacts, message, identifier, true)
                    .with_screenshot(report.screenshot))
            }
            SearchOutcome::NotFound { frame } => {
                let frame = match frame {
                    Some(frame) => current_frame(page, &FrameSlot::of(frame.as_ref()))
                        .await
                        .ok()
                        .flatten(),
                    None => None,
                };
                let report = export_artifacts(page, frame.as_deref(), &ctx.paths.export_dir).await;
                ctx.event(
                    StepCode::ExportArtifacts,
                    &format!("Zapisano artefakty: {}", report.written()),
                )
                .await;
                Err(Halt::Stop(
                    ctx.fail(Some(page), StepCode::NumberNotFound, "Nie znaleziono numeru", identifier)
                        .await,
                ))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
