//! Settings validation.

use crate::schema::Settings;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Settings validator.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_browser(settings, &mut result);
        Self::validate_timings(settings, &mut result);
        Self::validate_portal(settings, &mut result);

        result
    }

    fn validate_browser(settings: &Settings, result: &mut ValidationResult) {
        if settings.browser.debug_port == 0 {
            result.add_error(ValidationError::new("browser.debug_port", "Port cannot be 0"));
        }
        if settings.browser.viewport_width == 0 || settings.browser.viewport_height == 0 {
            result.add_error(ValidationError::new(
                "browser.viewport",
                "Viewport dimensions must be greater than 0",
            ));
        }
    }

    fn validate_timings(settings: &Settings, result: &mut ValidationResult) {
        let t = &settings.timings;
        let required = [
            ("timings.navigation_timeout_ms", t.navigation_timeout_ms),
            ("timings.login_form_window_ms", t.login_form_window_ms),
            ("timings.poll_interval_ms", t.poll_interval_ms),
            ("timings.login_exit_window_ms", t.login_exit_window_ms),
            ("timings.dialog_window_ms", t.dialog_window_ms),
            ("timings.frame_window_ms", t.frame_window_ms),
        ];
        for (path, value) in required {
            if value == 0 {
                result.add_error(ValidationError::new(path, "must be greater than 0"));
            }
        }

        if t.dialog_max_clicks == 0 {
            result.add_warning(ValidationWarning::new(
                "timings.dialog_max_clicks",
                "dialog dismissal is disabled",
            ));
        }

        if t.poll_interval_ms > t.login_form_window_ms {
            result.add_warning(ValidationWarning::new(
                "timings.poll_interval_ms",
                "poll interval exceeds the login form window, only one sweep will run",
            ));
        }

        if t.navigation_timeout_ms > 300_000 {
            result.add_warning(ValidationWarning::new(
                "timings.navigation_timeout_ms",
                "navigation timeout is very high (>5 min)",
            ));
        }
    }

    fn validate_portal(settings: &Settings, result: &mut ValidationResult) {
        if settings.portal.content_frame.trim().is_empty() {
            result.add_error(ValidationError::new(
                "portal.content_frame",
                "Content frame name cannot be empty",
            ));
        }

        if let Err(e) = regex::Regex::new(&settings.portal.dialog_pattern) {
            result.add_error(ValidationError::new(
                "portal.dialog_pattern",
                format!("Invalid regex: {}", e),
            ));
        }
    }
}
