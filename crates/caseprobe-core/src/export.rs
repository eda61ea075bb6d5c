//! Evidence export: page and content-frame snapshots plus a screenshot.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::driver::{Frame, Page};
use crate::error::DriverError;

pub const MAIN_HTML: &str = "main.html";
pub const MAIN_TEXT: &str = "main.txt";
pub const FRAME_HTML: &str = "frame_centr.html";
pub const FRAME_TEXT: &str = "frame_centr.txt";
pub const SCREENSHOT: &str = "work_opened.png";

/// Which artifacts were written. Consumed for logging only.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub main_html: bool,
    pub main_text: bool,
    pub frame_html: bool,
    pub frame_text: bool,
    pub screenshot: Option<PathBuf>,
}

impl ExportReport {
    pub fn written(&self) -> usize {
        [self.main_html, self.main_text, self.frame_html, self.frame_text]
            .iter()
            .filter(|w| **w)
            .count()
            + usize::from(self.screenshot.is_some())
    }
}

/// Write every artifact independently; one failure never stops the rest.
///
/// Without a frame the frame files are still created, empty.
pub async fn export_artifacts(page: &dyn Page, frame: Option<&dyn Frame>, dir: &Path) -> ExportReport {
    if let Err(e) = fs::create_dir_all(dir).await {
        warn!("Cannot create export dir {}: {}", dir.display(), e);
    }

    let mut report = ExportReport {
        main_html: save(dir, MAIN_HTML, page.content().await).await,
        main_text: save(dir, MAIN_TEXT, page.body_text().await).await,
        ..Default::default()
    };

    match frame {
        Some(frame) => {
            report.frame_html = save(dir, FRAME_HTML, frame.content().await).await;
            report.frame_text = save(dir, FRAME_TEXT, frame.body_text().await).await;
        }
        None => {
            debug!("No content frame, writing empty frame snapshots");
            report.frame_html = save(dir, FRAME_HTML, Ok(String::new())).await;
            report.frame_text = save(dir, FRAME_TEXT, Ok(String::new())).await;
        }
    }

    let shot = dir.join(SCREENSHOT);
    match page.screenshot(&shot).await {
        Ok(()) => report.screenshot = Some(shot),
        Err(e) => warn!("Export screenshot failed: {}", e),
    }

    report
}

async fn save(dir: &Path, name: &str, content: Result<String, DriverError>) -> bool {
    let content = match content {
        Ok(content) => content,
        Err(e) => {
            warn!("Cannot read content for {}: {}", name, e);
            return false;
        }
    };
    let path = dir.join(name);
    match fs::write(&path, content).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to write {}: {}", path.display(), e);
            false
        }
    }
}
