//! Run outcome and step codes.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

/// Overall outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    /// The portal reported a wrong password; retry after fixing credentials.
    PasswordError,
    Failed,
}

/// Stable step identifiers written to the event log.
///
/// External tooling greps these strings; do not renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepCode {
    ImportDriver,
    MissingPortalData,
    OpenUrl,
    LoginDetection,
    LoginInputsNotFound,
    LoginFill,
    PasswordNotSet,
    LoginSubmit,
    LoginFailedStillOnForm,
    DismissDialogs,
    NavUnfinished,
    NavUnfinishedMissingSelector,
    SearchNumber,
    NavFinished,
    NavFinishedMissingSelector,
    NumberNotFound,
    OpenRecord,
    ExportArtifacts,
    UnexpectedError,
    Timeout,
}

impl StepCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepCode::ImportDriver => "STEP_00_IMPORT_CHROME",
            StepCode::MissingPortalData => "STEP_00_MISSING_PORTAL_DATA",
            StepCode::OpenUrl => "STEP_01_OPEN_URL",
            StepCode::LoginDetection => "STEP_02_LOGIN_DETECTION",
            StepCode::LoginInputsNotFound => "STEP_02_LOGIN_INPUTS_NOT_FOUND",
            StepCode::LoginFill => "STEP_02_LOGIN_FILL",
            StepCode::PasswordNotSet => "STEP_02_PASSWORD_NOT_SET",
            StepCode::LoginSubmit => "STEP_03_LOGIN_SUBMIT",
            StepCode::LoginFailedStillOnForm => "STEP_03_LOGIN_FAILED_STILL_ON_FORM",
            StepCode::DismissDialogs => "STEP_04_CLICK_OK_LOOP",
            StepCode::NavUnfinished => "STEP_05_NAV_ROBOTY_NIEZAKONCZONE",
            StepCode::NavUnfinishedMissingSelector => "STEP_05_MISSING_SELECTOR",
            StepCode::SearchNumber => "STEP_06_SEARCH_NUMBER",
            StepCode::NavFinished => "STEP_06_NAV_ROBOTY_ZAKONCZONE",
            StepCode::NavFinishedMissingSelector => "STEP_06_MISSING_SELECTOR",
            StepCode::NumberNotFound => "STEP_06_NUMBER_NOT_FOUND",
            StepCode::OpenRecord => "STEP_07_OPEN_RECORD",
            StepCode::ExportArtifacts => "STEP_08_EXPORT_ARTIFACTS",
            StepCode::UnexpectedError => "STEP_98_UNEXPECTED_ERROR",
            StepCode::Timeout => "STEP_99_TIMEOUT",
        }
    }

    /// Blocking failures that need selector/config maintenance.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            StepCode::LoginInputsNotFound
                | StepCode::PasswordNotSet
                | StepCode::LoginFailedStillOnForm
                | StepCode::NavUnfinishedMissingSelector
                | StepCode::NavFinishedMissingSelector
                | StepCode::NumberNotFound
        )
    }
}

impl fmt::Display for StepCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StepCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Outcome of one run. Built once by the orchestrator and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    status: RunStatus,
    last_step: StepCode,
    message: String,
    detail: String,
    found: bool,
    screenshot_path: Option<PathBuf>,
}

impl RunResult {
    pub fn success(
        last_step: StepCode,
        message: impl Into<String>,
        detail: impl Into<String>,
        found: bool,
    ) -> Self {
        Self {
            status: RunStatus::Success,
            last_step,
            message: message.into(),
            detail: detail.into(),
            found,
            screenshot_path: None,
        }
    }

    pub fn failed(last_step: StepCode, message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            last_step,
            message: message.into(),
            detail: detail.into(),
            found: false,
            screenshot_path: None,
        }
    }

    pub fn password_error(
        last_step: StepCode,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status: RunStatus::PasswordError,
            last_step,
            message: message.into(),
            detail: detail.into(),
            found: false,
            screenshot_path: None,
        }
    }

    pub fn with_screenshot(mut self, path: Option<PathBuf>) -> Self {
        self.screenshot_path = path;
        self
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn last_step(&self) -> StepCode {
        self.last_step
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn found(&self) -> bool {
        self.found
    }

    pub fn screenshot_path(&self) -> Option<&Path> {
        self.screenshot_path.as_deref()
    }

    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                "{{\"status\":\"failed\",\"last_step\":\"{}\",\"detail\":\"serialization: {}\"}}",
                self.last_step, e
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_never_found() {
        let result = RunResult::failed(StepCode::NumberNotFound, "Nie znaleziono", "GK-1");
        assert_eq!(result.status(), RunStatus::Failed);
        assert!(!result.found());
    }

    #[test]
    fn test_json_line_shape() {
        let result = RunResult::success(StepCode::ExportArtifacts, "Znaleziono", "GK-1", true)
            .with_screenshot(Some(PathBuf::from("/tmp/work_opened.png")));
        let value: serde_json::Value = serde_json::from_str(&result.to_json_line()).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["last_step"], "STEP_08_EXPORT_ARTIFACTS");
        assert_eq!(value["found"], true);
        assert_eq!(value["screenshot_path"], "/tmp/work_opened.png");
        assert!(!result.to_json_line().contains('\n'));
    }

    #[test]
    fn test_password_error_status_serializes_snake_case() {
        let result = RunResult::password_error(StepCode::LoginSubmit, "Błędne hasło", "password_error");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "password_error");
    }

    #[test]
    fn test_step_codes_are_prefixed_and_unique() {
        let all = [
            StepCode::ImportDriver,
            StepCode::MissingPortalData,
            StepCode::OpenUrl,
            StepCode::LoginDetection,
            StepCode::LoginInputsNotFound,
            StepCode::LoginFill,
            StepCode::PasswordNotSet,
            StepCode::LoginSubmit,
            StepCode::LoginFailedStillOnForm,
            StepCode::DismissDialogs,
            StepCode::NavUnfinished,
            StepCode::NavUnfinishedMissingSelector,
            StepCode::SearchNumber,
            StepCode::NavFinished,
            StepCode::NavFinishedMissingSelector,
            StepCode::NumberNotFound,
            StepCode::OpenRecord,
            StepCode::ExportArtifacts,
            StepCode::UnexpectedError,
            StepCode::Timeout,
        ];
        let mut seen = std::collections::HashSet::new();
        for code in all {
            assert!(code.as_str().starts_with("STEP_"));
            assert!(seen.insert(code.as_str()), "duplicate {}", code);
        }
    }

    #[test]
    fn test_critical_steps() {
        assert!(StepCode::LoginInputsNotFound.is_critical());
        assert!(StepCode::NumberNotFound.is_critical());
        assert!(StepCode::NavUnfinishedMissingSelector.is_critical());
        assert!(!StepCode::Timeout.is_critical());
        assert!(!StepCode::LoginSubmit.is_critical());
    }
}
