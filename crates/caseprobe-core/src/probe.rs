//! Login diagnostic probe, written when the login inputs cannot be found.

use std::path::Path;

use chrono::Local;
use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};

use crate::driver::{InputSummary, Page};
use crate::frames::list_frames;

#[derive(Debug, Serialize)]
pub struct FrameProbe {
    pub index: usize,
    pub name: String,
    pub url: String,
    pub is_main: bool,
    pub inputs: Vec<InputSummary>,
    pub password_fields: usize,
    pub has_username_label: bool,
    pub has_password_label: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginProbe {
    pub captured_at: String,
    pub frames: Vec<FrameProbe>,
}

/// Snapshot every frame's inputs and label texts. Frames that cannot be
/// read are reported with an `error` instead of being skipped.
pub async fn probe_login(page: &dyn Page) -> LoginProbe {
    let mut frames = Vec::new();
    for (index, frame) in list_frames(page).await.into_iter().enumerate() {
        let mut probe = FrameProbe {
            index,
            name: frame.name().to_string(),
            url: frame.url().to_string(),
            is_main: frame.is_main(),
            inputs: Vec::new(),
            password_fields: 0,
            has_username_label: false,
            has_password_label: false,
            error: None,
        };
        match frame.inputs().await {
            Ok(inputs) => {
                probe.password_fields = inputs
                    .iter()
                    .filter(|i| i.input_type.eq_ignore_ascii_case("password"))
                    .count();
                probe.inputs = inputs;
            }
            Err(e) => probe.error = Some(e.to_string()),
        }
        match frame.body_text().await {
            Ok(text) => {
                probe.has_username_label = text.contains("Użytkownik") || text.contains("Uzytkownik");
                probe.has_password_label = text.contains("Hasło") || text.contains("Haslo");
            }
            Err(e) => {
                probe.error.get_or_insert_with(|| e.to_string());
            }
        }
        frames.push(probe);
    }
    LoginProbe {
        captured_at: Local::now().to_rfc3339(),
        frames,
    }
}

/// Pretty-printed JSON at `path`. Returns whether the write succeeded.
pub async fn write_probe(probe: &LoginProbe, path: &Path) -> bool {
    let json = match serde_json::to_string_pretty(probe) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize login probe: {}", e);
            return false;
        }
    };
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            warn!("Failed to create {}: {}", parent.display(), e);
            return false;
        }
    }
    match fs::write(path, json).await {
        Ok(()) => {
            info!("Login probe written to {}", path.display());
            true
        }
        Err(e) => {
            warn!("Failed to write login probe {}: {}", path.display(), e);
            false
        }
    }
}
