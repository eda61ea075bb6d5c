//! Login step: detect, fill, verify, submit, verify the form is gone.

use caseprobe_config::{Credentials, SelectorRole};
use tracing::{debug, trace, warn};

use crate::driver::{ElementRef, Page, Query};
use crate::error::DriverError;
use crate::frames::{
    current_frame, detect_login_form, find_in_frames, poll_until, Field, FrameSlot, LoginForm, LoginQueries,
};
use crate::locator::try_first_visible;
use crate::probe::{probe_login, write_probe};
use crate::result::{RunResult, StepCode};
use crate::runner::Halt;
use crate::session::SessionContext;

pub const PROBE_FILE: &str = "login_probe.json";

/// Log in, or stop the run with the classified failure.
pub(crate) async fn login(page: &dyn Page, ctx: &SessionContext, credentials: &Credentials) -> Result<(), Halt> {
    ctx.event(StepCode::LoginDetection, "Szukam formularza logowania").await;
    let queries = LoginQueries::new(&ctx.selectors);
    let form = detect_login_form(
        page,
        &queries,
        ctx.timings.login_form_window(),
        ctx.timings.poll_interval(),
    )
    .await;

    let Some(form) = form else {
        let probe = probe_login(page).await;
        write_probe(&probe, &ctx.paths.export_dir.join(PROBE_FILE)).await;
        return Err(Halt::Stop(
            ctx.fail(
                Some(page),
                StepCode::LoginInputsNotFound,
                "Nie znalazłem pól logowania automatycznie",
                "login_inputs",
            )
            .await,
        ));
    };

    ctx.event(
        StepCode::LoginDetection,
        &format!(
            "Formularz w ramce '{}': login={} hasło={} przycisk={}",
            form.frame.name(),
            form.username.source,
            form.password.source,
            form.submit
                .as_ref()
                .map(|s| s.source.to_string())
                .unwrap_or_else(|| "brak".to_string()),
        ),
    )
    .await;

    if !fill(ctx, &form.username.element, &credentials.login).await? {
        warn!("Username field read back empty, continuing");
    }
    if !fill(ctx, &form.password.element, &credentials.password).await? {
        return Err(Halt::Stop(
            ctx.fail(
                Some(page),
                StepCode::PasswordNotSet,
                "Nie udało się wpisać hasła",
                SelectorRole::LoginPassword.key(),
            )
            .await,
        ));
    }
    ctx.event(StepCode::LoginFill, "Wpisano login i hasło").await;
    ctx.debug_screenshot(page, StepCode::LoginFill).await;

    let how = submit(page, &form).await?;
    ctx.event(StepCode::LoginSubmit, &format!("Wysłano formularz logowania ({})", how)).await;

    verify_left_form(page, ctx, &form).await
}

/// Focus, set, read back. Falls back to clearing and typing per character
/// when the value does not stick. Returns whether the field holds a value.
async fn fill(ctx: &SessionContext, element: &ElementRef, value: &str) -> Result<bool, DriverError> {
    element.focus().await?;
    element.fill(value).await?;
    if !element.input_value().await?.is_empty() {
        return Ok(true);
    }
    debug!("Field read back empty after fill, retyping");
    element.clear().await?;
    element.type_text(value, ctx.timings.type_delay()).await?;
    Ok(!element.input_value().await?.is_empty())
}

async fn submit(page: &dyn Page, form: &LoginForm) -> Result<&'static str, DriverError> {
    if let Some(button) = &form.submit {
        match button.element.click(false).await {
            Ok(()) => return Ok("click"),
            Err(e) => warn!("Submit click failed: {}", e),
        }
    }
    match form.password.element.press("Enter").await {
        Ok(()) => Ok("enter"),
        Err(e) => {
            warn!("Enter on password field failed: {}", e);
            page.press_key("Enter").await?;
            Ok("page enter")
        }
    }
}

async fn password_error_visible(page: &dyn Page, ctx: &SessionContext) -> bool {
    match ctx.selectors.get(SelectorRole::PasswordError) {
        Some(selector) => find_in_frames(page, &Query::css(selector)).await.is_some(),
        None => false,
    }
}

enum AfterSubmit {
    Left,
    PasswordError,
}

/// Whether the password field is still shown. The form's frame is looked
/// up afresh every time: a rejected login often reloads the document, and
/// handles into the old one fail rather than find nothing. `None` means the
/// page could not be inspected this round.
async fn form_still_shown(page: &dyn Page, slot: &FrameSlot, password: &Field) -> Option<bool> {
    let frame = match current_frame(page, slot).await {
        Ok(Some(frame)) => frame,
        Ok(None) => return Some(false),
        Err(e) => {
            trace!("Frames unavailable after submit: {}", e);
            return None;
        }
    };
    match try_first_visible(frame.as_ref(), &password.query).await {
        Ok(found) => Some(found.is_some()),
        Err(e) => {
            trace!("{} reloading after submit: {}", slot, e);
            None
        }
    }
}

async fn verify_left_form(page: &dyn Page, ctx: &SessionContext, form: &LoginForm) -> Result<(), Halt> {
    let password: &Field = &form.password;
    let slot = FrameSlot::of(form.frame.as_ref());
    let slot = &slot;
    let outcome = poll_until(
        ctx.timings.login_exit_window(),
        ctx.timings.poll_interval(),
        move || async move {
            if password_error_visible(page, ctx).await {
                return Some(AfterSubmit::PasswordError);
            }
            match form_still_shown(page, slot, password).await {
                Some(false) => Some(AfterSubmit::Left),
                Some(true) | None => None,
            }
        },
    )
    .await;

    match outcome {
        Some(AfterSubmit::Left) => {
            ctx.event(StepCode::LoginSubmit, "Zalogowano, formularz zniknął").await;
            ctx.debug_screenshot(page, StepCode::LoginSubmit).await;
            Ok(())
        }
        Some(AfterSubmit::PasswordError) => {
            ctx.report(StepCode::LoginSubmit, "Błędne hasło").await;
            let shot = ctx.screenshot(page, StepCode::LoginSubmit).await;
            Err(Halt::Stop(
                RunResult::password_error(StepCode::LoginSubmit, "Błędne hasło", "password_error")
                    .with_screenshot(shot),
            ))
        }
        None => Err(Halt::Stop(
            ctx.fail(
                Some(page),
                StepCode::LoginFailedStillOnForm,
                "Po wysłaniu nadal widoczny formularz logowania",
                "still_on_form",
            )
            .await,
        )),
    }
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
