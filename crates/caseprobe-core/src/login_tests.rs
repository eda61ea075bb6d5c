use super::*;
use std::fs;

use caseprobe_config::{PortalConfig, SelectorConfig, SessionPaths};
use tempfile::TempDir;

use crate::fake::{fast_timings, FakeNode, FakePage, Portal};
use crate::result::RunStatus;

fn context(dir: &TempDir, selectors: SelectorConfig) -> SessionContext {
    SessionContext::new(
        SessionPaths::under(dir.path()),
        selectors,
        fast_timings(),
        PortalConfig::default(),
        false,
    )
}

fn credentials(password: &str) -> Credentials {
    Credentials::new("https://portal.test/", "jan.kowalski", password)
}

fn stopped(halt: Halt) -> RunResult {
    match halt {
        Halt::Stop(result) => result,
        Halt::Driver(e) => panic!("expected a classified stop, got driver error {}", e),
    }
}

/// A form whose submit button removes it when the password field is non-empty.
fn plain_form(password: FakeNode) -> FakePage {
    let page = FakePage::new();
    page.with(|s| {
        s.push("", FakeNode::input("user", "text").label("Użytkownik"));
        s.push("", password.id("pass"));
        s.push(
            "",
            FakeNode::button("go", "Zaloguj").on_click(|s| {
                if !s.value_of("pass").is_empty() {
                    s.remove("user");
                    s.remove("pass");
                }
            }),
        );
    });
    page
}

#[tokio::test]
async fn test_auto_detection_logs_in_without_selectors() {
    let dir = TempDir::new().unwrap();
    let page = Portal::default().build();
    let ctx = context(&dir, SelectorConfig::default());

    login(&page, &ctx, &credentials("tajne")).await.unwrap();

    assert!(page.with(|s| s.has_node("nav-unfinished")));
    assert_eq!(page.with(|s| s.clicks.clone()), vec!["login-submit"]);
    let log = fs::read_to_string(&ctx.paths.log).unwrap();
    assert!(log.contains("login=AUTO hasło=AUTO przycisk=AUTO"));
    assert!(log.contains("STEP_03_LOGIN_SUBMIT: Zalogowano"));
}

#[tokio::test]
async fn test_login_form_in_nested_frame() {
    let dir = TempDir::new().unwrap();
    let page = Portal {
        login_frame: "login".to_string(),
        ..Default::default()
    }
    .build();

    login(&page, &context(&dir, SelectorConfig::default()), &credentials("tajne"))
        .await
        .unwrap();

    assert!(!page.with(|s| s.has_node("login-pass")));
}

#[tokio::test]
async fn test_partial_selectors_fall_back_to_detection() {
    let dir = TempDir::new().unwrap();
    let page = Portal::default().build();
    let selectors = SelectorConfig::default()
        .with(SelectorRole::LoginUsername, "#login-user")
        .with(SelectorRole::LoginSubmit, "#does-not-exist");

    login(&page, &context(&dir, selectors), &credentials("tajne"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_same_node_never_filled() {
    let dir = TempDir::new().unwrap();
    let page = FakePage::new();
    page.with(|s| s.push("", FakeNode::input("only", "password").label("Użytkownik")));
    let ctx = context(&dir, SelectorConfig::default());

    let result = stopped(login(&page, &ctx, &credentials("tajne")).await.unwrap_err());

    assert_eq!(result.status(), RunStatus::Failed);
    assert_eq!(result.last_step(), StepCode::LoginInputsNotFound);
    assert_eq!(result.detail(), "login_inputs");
    assert!(page.with(|s| s.fills.is_empty()));
    assert!(result.screenshot_path().is_some());
    assert!(ctx.paths.export_dir.join(PROBE_FILE).exists());
    let critical = fs::read_to_string(&ctx.paths.critical_log).unwrap();
    assert!(critical.starts_with("- STEP_02_LOGIN_INPUTS_NOT_FOUND: "));
}

#[tokio::test]
async fn test_flaky_password_field_retyped() {
    let dir = TempDir::new().unwrap();
    let page = plain_form(FakeNode::new("input").input_type("password").flaky_fill());

    login(&page, &context(&dir, SelectorConfig::default()), &credentials("tajne"))
        .await
        .unwrap();

    assert!(!page.with(|s| s.has_node("pass")));
}

#[tokio::test]
async fn test_password_that_never_sticks() {
    let dir = TempDir::new().unwrap();
    let page = plain_form(FakeNode::new("input").input_type("password").rejects_input());

    let result = stopped(
        login(&page, &context(&dir, SelectorConfig::default()), &credentials("tajne"))
            .await
            .unwrap_err(),
    );

    assert_eq!(result.last_step(), StepCode::PasswordNotSet);
    assert!(page.with(|s| s.clicks.is_empty()));
}

#[tokio::test]
async fn test_visible_password_error_is_its_own_status() {
    let dir = TempDir::new().unwrap();
    let page = Portal::default().build();
    let selectors = SelectorConfig::default().with(SelectorRole::PasswordError, "#login-error");

    let result = stopped(
        login(&page, &context(&dir, selectors), &credentials("zle-haslo"))
            .await
            .unwrap_err(),
    );

    assert_eq!(result.status(), RunStatus::PasswordError);
    assert_eq!(result.last_step(), StepCode::LoginSubmit);
    assert_eq!(result.detail(), "password_error");
    assert!(!result.found());
}

#[tokio::test]
async fn test_still_on_form_without_indicator() {
    let dir = TempDir::new().unwrap();
    let page = Portal::default().build();
    let ctx = context(&dir, SelectorConfig::default());

    let result = stopped(login(&page, &ctx, &credentials("zle-haslo")).await.unwrap_err());

    assert_eq!(result.status(), RunStatus::Failed);
    assert_eq!(result.last_step(), StepCode::LoginFailedStillOnForm);
    assert!(fs::read_to_string(&ctx.paths.critical_log)
        .unwrap()
        .contains("STEP_03_LOGIN_FAILED_STILL_ON_FORM"));
}

#[tokio::test]
async fn test_enter_submits_when_no_button() {
    let dir = TempDir::new().unwrap();
    let page = Portal {
        submit_button: false,
        ..Default::default()
    }
    .build();

    login(&page, &context(&dir, SelectorConfig::default()), &credentials("tajne"))
        .await
        .unwrap();

    assert_eq!(page.with(|s| s.keys.clone()), vec!["login-pass:Enter"]);
}

#[tokio::test]
async fn test_rejected_login_that_reloads_the_form_is_still_on_form() {
    let dir = TempDir::new().unwrap();
    let page = Portal {
        reload_on_reject: true,
        ..Default::default()
    }
    .build();
    let ctx = context(&dir, SelectorConfig::default());

    let result = stopped(login(&page, &ctx, &credentials("zle-haslo")).await.unwrap_err());

    assert_eq!(result.last_step(), StepCode::LoginFailedStillOnForm);
    assert!(page.with(|s| s.has_node("login-pass")));
    assert_eq!(page.with(|s| s.value_of("login-pass")), "");
}

#[tokio::test]
async fn test_rejected_login_reloading_a_nested_frame_is_still_on_form() {
    let dir = TempDir::new().unwrap();
    let page = Portal {
        login_frame: "login".to_string(),
        reload_on_reject: true,
        ..Default::default()
    }
    .build();
    let selectors = SelectorConfig::default().with(SelectorRole::PasswordError, "#login-error");

    let result = stopped(
        login(&page, &context(&dir, selectors), &credentials("zle-haslo"))
            .await
            .unwrap_err(),
    );

    assert_eq!(result.status(), RunStatus::Failed);
    assert_eq!(result.last_step(), StepCode::LoginFailedStillOnForm);
}
