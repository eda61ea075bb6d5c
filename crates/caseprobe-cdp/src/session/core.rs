//! Core session struct, command dispatch and event handling.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::Transport;
use crate::error::CdpError;
use crate::protocol::{CdpResponse, ScreenshotFormat};

/// A flattened session attached to a single page target.
pub struct PageSession {
    pub(super) target_id: String,
    pub(super) session_id: String,
    pub(super) transport: Transport,
    /// Taken once by the dialog handler.
    pub(super) events: Mutex<Option<mpsc::UnboundedReceiver<CdpResponse>>>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        transport: Transport,
        events: mpsc::UnboundedReceiver<CdpResponse>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            transport,
            events: Mutex::new(Some(events)),
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Send a CDP command to this page session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.transport
            .call(method, params, Some(&self.session_id))
            .await
    }

    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("DOM.enable", None).await?;
        self.call("Runtime.enable", None).await?;

        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Fix the layout viewport size.
    pub async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CdpError> {
        self.call(
            "Emulation.setDeviceMetricsOverride",
            Some(json!({
                "width": width,
                "height": height,
                "deviceScaleFactor": 1,
                "mobile": false,
            })),
        )
        .await?;
        Ok(())
    }

    /// Full-page screenshot, base64 encoded as returned by the browser.
    pub async fn screenshot(&self, format: ScreenshotFormat) -> Result<String, CdpError> {
        let result = self
            .call(
                "Page.captureScreenshot",
                Some(json!({
                    "format": format,
                    "captureBeyondViewport": true,
                })),
            )
            .await?;

        result["data"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))
    }

    /// Accept every native `alert`/`confirm`/`prompt` until the session ends.
    ///
    /// Returns `None` when a handler is already running.
    pub fn spawn_dialog_handler(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut events = self.events.lock().take()?;
        let session = Arc::clone(self);
        Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if event.method.as_deref() != Some("Page.javascriptDialogOpening") {
                    continue;
                }
                let params = event.params.unwrap_or(Value::Null);
                info!(
                    kind = params["type"].as_str().unwrap_or(""),
                    "Accepting native dialog: {}",
                    params["message"].as_str().unwrap_or("")
                );
                let reply = json!({
                    "accept": true,
                    "promptText": params["defaultPrompt"].as_str().unwrap_or(""),
                });
                if let Err(e) = session
                    .call("Page.handleJavaScriptDialog", Some(reply))
                    .await
                {
                    warn!("Failed to accept native dialog: {}", e);
                }
            }
            debug!("Dialog handler for session {} stopped", session.session_id);
        }))
    }
}
