//! Per-run session directories.
//!
//! ```text
//! <root>/sessions/<YYYY-MM-DD>/<HHMMSS>_<PORTAL>_<IDENTIFIER>/
//!     logs/caseprobe.log
//!     logs/caseprobe_critical.md
//!     screens/
//!     dumps/
//!     downloads/
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Directories and files the engine writes into during one run.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub root: PathBuf,
    /// Append-only event log, one `STEP_..: message` line per step.
    pub log: PathBuf,
    /// Markdown bullet list of blocking failures.
    pub critical_log: PathBuf,
    pub screens_dir: PathBuf,
    pub export_dir: PathBuf,
}

impl SessionPaths {
    /// Lay out session paths under an existing directory.
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let logs = root.join("logs");
        Self {
            log: logs.join("caseprobe.log"),
            critical_log: logs.join("caseprobe_critical.md"),
            screens_dir: root.join("screens"),
            export_dir: root.join("dumps"),
            root,
        }
    }
}

/// Creates session directories below `<root>/sessions`.
pub struct SessionLayout {
    runtime_root: PathBuf,
}

impl SessionLayout {
    pub fn new(runtime_root: impl Into<PathBuf>) -> Self {
        Self {
            runtime_root: runtime_root.into(),
        }
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.runtime_root.join("sessions")
    }

    fn latest_path(&self) -> PathBuf {
        self.runtime_root.join("LATEST.txt")
    }

    /// Create a fresh session directory for one lookup.
    pub fn create(&self, portal_key: &str, identifier: &str) -> Result<SessionPaths, ConfigError> {
        let now = Local::now();
        let portal = if portal_key.trim().is_empty() {
            "UNKNOWN".to_string()
        } else {
            portal_key.to_uppercase()
        };
        let folder = format!(
            "{}_{}_{}",
            now.format("%H%M%S"),
            portal,
            sanitize_identifier(identifier)
        );
        let root = self
            .sessions_dir()
            .join(now.format("%Y-%m-%d").to_string())
            .join(folder);

        for sub in ["logs", "screens", "dumps", "downloads"] {
            fs::create_dir_all(root.join(sub))?;
        }
        fs::write(self.latest_path(), root.to_string_lossy().as_bytes())?;

        info!("Created session at {}", root.display());
        Ok(SessionPaths::under(root))
    }

    /// Most recently created session directory.
    pub fn latest(&self) -> Option<PathBuf> {
        let content = fs::read_to_string(self.latest_path()).ok()?;
        let trimmed = content.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }
}

/// Replace runs of non-alphanumeric characters with `_`.
pub fn sanitize_identifier(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len());
    let mut in_gap = false;
    for c in identifier.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            in_gap = false;
        } else if !in_gap {
            out.push('_');
            in_gap = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "UNKNOWN".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Remove date folders older than `max_age_days`. Returns how many were removed.
pub fn cleanup_sessions(sessions_dir: &Path, max_age_days: u32) -> usize {
    let Ok(entries) = fs::read_dir(sessions_dir) else {
        return 0;
    };
    let cutoff_date = Local::now().date_naive() - chrono::Duration::days(i64::from(max_age_days));
    let cutoff_time = SystemTime::now()
        .checked_sub(Duration::from_secs(u64::from(max_age_days) * 86_400))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let expired = match NaiveDate::parse_from_str(&name, "%Y-%m-%d") {
            Ok(date) => date < cutoff_date,
            Err(_) => entry
                .metadata()
                .and_then(|m| m.modified())
                .map(|modified| modified < cutoff_time)
                .unwrap_or(false),
        };
        if !expired {
            continue;
        }
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                debug!("Removed expired session folder {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
    removed
}

/// Remove every session folder.
pub fn clear_sessions(sessions_dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(sessions_dir) else {
        return 0;
    };
    entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter(|e| fs::remove_dir_all(e.path()).is_ok())
        .count()
}
