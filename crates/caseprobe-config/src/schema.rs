//! Settings schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings, read from `caseprobe.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub timings: Timings,

    #[serde(default)]
    pub portal: PortalConfig,
}

/// Where sessions, state files and debug logs live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_runtime_root")]
    pub root: String,

    #[serde(default = "default_retention_days")]
    pub session_retention_days: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root: default_runtime_root(),
            session_retention_days: default_retention_days(),
        }
    }
}

impl RuntimeConfig {
    /// Runtime root with `~` expanded.
    pub fn root_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.root).to_string())
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root_dir().join("config")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root_dir().join("state")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root_dir().join("sessions")
    }

    pub fn debug_dir(&self) -> PathBuf {
        self.root_dir().join("debug")
    }
}

fn default_runtime_root() -> String {
    "~/.caseprobe".to_string()
}

fn default_retention_days() -> u32 {
    14
}

/// Browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    #[serde(default)]
    pub headless: bool,

    /// Explicit Chrome executable; searched in well-known places when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Profile directory; defaults to `<runtime_root>/browser-profile`.
    #[serde(default)]
    pub profile_dir: Option<PathBuf>,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            debug_port: default_debug_port(),
            headless: false,
            chrome_path: None,
            profile_dir: None,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

impl BrowserConfig {
    /// CDP HTTP endpoint.
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }
}

fn default_debug_port() -> u16 {
    9222
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    900
}

/// Bounds for every wait the engine performs, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timings {
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    #[serde(default = "default_login_form_window_ms")]
    pub login_form_window_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_login_exit_window_ms")]
    pub login_exit_window_ms: u64,

    #[serde(default = "default_dialog_window_ms")]
    pub dialog_window_ms: u64,

    #[serde(default = "default_dialog_quiet_ms")]
    pub dialog_quiet_ms: u64,

    #[serde(default = "default_dialog_max_clicks")]
    pub dialog_max_clicks: u32,

    #[serde(default = "default_frame_window_ms")]
    pub frame_window_ms: u64,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default = "default_type_delay_ms")]
    pub type_delay_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: default_navigation_timeout_ms(),
            login_form_window_ms: default_login_form_window_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            login_exit_window_ms: default_login_exit_window_ms(),
            dialog_window_ms: default_dialog_window_ms(),
            dialog_quiet_ms: default_dialog_quiet_ms(),
            dialog_max_clicks: default_dialog_max_clicks(),
            frame_window_ms: default_frame_window_ms(),
            settle_ms: default_settle_ms(),
            type_delay_ms: default_type_delay_ms(),
        }
    }
}

impl Timings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn login_form_window(&self) -> Duration {
        Duration::from_millis(self.login_form_window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn login_exit_window(&self) -> Duration {
        Duration::from_millis(self.login_exit_window_ms)
    }

    pub fn dialog_window(&self) -> Duration {
        Duration::from_millis(self.dialog_window_ms)
    }

    pub fn dialog_quiet(&self) -> Duration {
        Duration::from_millis(self.dialog_quiet_ms)
    }

    pub fn frame_window(&self) -> Duration {
        Duration::from_millis(self.frame_window_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn type_delay(&self) -> Duration {
        Duration::from_millis(self.type_delay_ms)
    }
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_login_form_window_ms() -> u64 {
    15_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_login_exit_window_ms() -> u64 {
    5_000
}

fn default_dialog_window_ms() -> u64 {
    8_000
}

fn default_dialog_quiet_ms() -> u64 {
    1_000
}

fn default_dialog_max_clicks() -> u32 {
    5
}

fn default_frame_window_ms() -> u64 {
    8_000
}

fn default_settle_ms() -> u64 {
    2_000
}

fn default_type_delay_ms() -> u64 {
    80
}

/// Portal-specific labels used by heuristic detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Name of the sub-frame that renders the work lists.
    #[serde(default = "default_content_frame")]
    pub content_frame: String,

    #[serde(default = "default_unfinished_label")]
    pub unfinished_label: String,

    #[serde(default = "default_finished_label")]
    pub finished_label: String,

    /// Case-insensitive regex for acknowledgement buttons.
    #[serde(default = "default_dialog_pattern")]
    pub dialog_pattern: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            content_frame: default_content_frame(),
            unfinished_label: default_unfinished_label(),
            finished_label: default_finished_label(),
            dialog_pattern: default_dialog_pattern(),
        }
    }
}

fn default_content_frame() -> String {
    "centr".to_string()
}

fn default_unfinished_label() -> String {
    "Roboty niezakończone".to_string()
}

fn default_finished_label() -> String {
    "Roboty zakończone".to_string()
}

fn default_dialog_pattern() -> String {
    "OK|Dalej|Kontynuuj|Zamknij|Akceptuj|Zgadzam|Rozumiem".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
