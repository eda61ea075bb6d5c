//! Chrome process management: reuse a browser on the debug port or start one.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use caseprobe_config::BrowserConfig;
use caseprobe_core::{BrowserLauncher, DriverError, PageRef};
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::client::CdpClient;
use crate::page::CdpPage;

const STARTUP_ATTEMPTS: u32 = 30;
const STARTUP_POLL: Duration = Duration::from_millis(200);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens one tab per run in a Chrome with remote debugging enabled.
pub struct ChromeLauncher {
    config: BrowserConfig,
    profile_dir: PathBuf,
}

impl ChromeLauncher {
    /// The profile lives under `runtime_root` unless configured explicitly.
    pub fn new(config: BrowserConfig, runtime_root: &Path) -> Self {
        let profile_dir = config
            .profile_dir
            .clone()
            .unwrap_or_else(|| runtime_root.join("browser-profile"));
        Self {
            config,
            profile_dir,
        }
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    /// Find Chrome executable path.
    pub fn find_chrome() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        let paths: &[&str] = &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ];

        #[cfg(target_os = "linux")]
        let paths: &[&str] = &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ];

        #[cfg(target_os = "windows")]
        let paths: &[&str] = &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        let paths: &[&str] = &[];

        paths.iter().map(|p| PathBuf::from(*p)).find(|p| p.exists())
    }

    /// Configured executable when set, otherwise a well-known install location.
    fn chrome_path(&self) -> Result<PathBuf, DriverError> {
        match &self.config.chrome_path {
            Some(path) if path.exists() => Ok(path.clone()),
            Some(path) => Err(DriverError::Unavailable(format!(
                "Chrome not found at {}",
                path.display()
            ))),
            None => Self::find_chrome()
                .ok_or_else(|| DriverError::Unavailable("Chrome not found".to_string())),
        }
    }

    pub(crate) fn chrome_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.config.debug_port),
            format!("--user-data-dir={}", self.profile_dir.display()),
            format!(
                "--window-size={},{}",
                self.config.viewport_width, self.config.viewport_height
            ),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-background-networking".to_string(),
            "--disable-sync".to_string(),
            "--disable-translate".to_string(),
            "--disable-popup-blocking".to_string(),
        ];
        if self.config.headless {
            args.push("--headless=new".to_string());
        }
        args.push("about:blank".to_string());
        args
    }

    /// Check if Chrome is already running on the debug port.
    async fn is_chrome_running(&self) -> bool {
        let Ok(client) = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() else {
            return false;
        };
        client
            .get(format!("{}/json/version", self.config.endpoint()))
            .send()
            .await
            .is_ok()
    }

    fn launch_chrome(&self) -> Result<Child, DriverError> {
        let chrome_path = self.chrome_path()?;

        if let Err(e) = std::fs::create_dir_all(&self.profile_dir) {
            warn!("Failed to create profile directory: {}", e);
        }

        info!("Launching Chrome with profile at: {}", self.profile_dir.display());

        let child = Command::new(&chrome_path)
            .args(self.chrome_args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DriverError::Launch(format!("{}: {}", chrome_path.display(), e)))?;

        info!("Chrome launched with PID: {:?}", child.id());
        Ok(child)
    }

    /// Start Chrome unless one already answers on the debug port.
    async fn ensure_browser(&self) -> Result<Option<Child>, DriverError> {
        if self.is_chrome_running().await {
            info!("Chrome already running on port {}", self.config.debug_port);
            return Ok(None);
        }

        info!("Chrome not running on port {}, launching...", self.config.debug_port);
        let mut child = self.launch_chrome()?;

        for _ in 0..STARTUP_ATTEMPTS {
            tokio::time::sleep(STARTUP_POLL).await;
            if let Ok(Some(status)) = child.try_wait() {
                return Err(DriverError::Launch(format!("Chrome exited with {}", status)));
            }
            if self.is_chrome_running().await {
                return Ok(Some(child));
            }
        }

        Err(DriverError::Launch(
            "Chrome failed to start within timeout".to_string(),
        ))
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<PageRef, DriverError> {
        let chrome = self.ensure_browser().await?;

        let client = CdpClient::connect(&self.config.endpoint()).await?;
        info!("Connected to Chrome at {}", self.config.endpoint());

        let session = client.open_page().await?;
        if let Err(e) = session
            .set_viewport(self.config.viewport_width, self.config.viewport_height)
            .await
        {
            warn!("Failed to set viewport: {}", e);
        }

        Ok(Arc::new(CdpPage::new(
            Arc::new(client),
            Arc::new(session),
            chrome,
        )))
    }
}
