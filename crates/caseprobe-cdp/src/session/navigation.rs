//! Navigation and frame discovery for CDP page session.

use std::time::{Duration, Instant};

use serde_json::json;
use tracing::debug;

use crate::error::CdpError;
use crate::protocol::FrameTree;

use super::core::PageSession;

const READY_POLL: Duration = Duration::from_millis(100);

/// Name of the isolated world created in each frame.
const WORLD_NAME: &str = "caseprobe";

impl PageSession {
    /// Start navigation of the main frame. Does not wait for load.
    pub async fn navigate(&self, url: &str) -> Result<(), CdpError> {
        let result = self
            .call("Page.navigate", Some(json!({"url": url})))
            .await?;

        if let Some(error) = result.get("errorText").and_then(|e| e.as_str()) {
            return Err(CdpError::NavigationFailed(format!("{}: {}", url, error)));
        }

        debug!("Navigation to {} started", url);
        Ok(())
    }

    /// Poll `document.readyState` until the document is usable.
    ///
    /// A context lost mid-poll (the document navigated) is retried until
    /// the deadline.
    pub async fn wait_for_load(&self, context_id: Option<i64>, timeout: Duration) -> Result<(), CdpError> {
        let start = Instant::now();

        loop {
            match self.evaluate("document.readyState", context_id).await {
                Ok(state) => {
                    if matches!(state.as_str(), Some("complete") | Some("interactive")) {
                        return Ok(());
                    }
                }
                Err(e) if e.is_detached() && context_id.is_none() => {}
                Err(e) => return Err(e),
            }

            if start.elapsed() > timeout {
                return Err(CdpError::Timeout("Page load timeout".to_string()));
            }

            tokio::time::sleep(READY_POLL).await;
        }
    }

    pub async fn frame_tree(&self) -> Result<FrameTree, CdpError> {
        let result = self.call("Page.getFrameTree", None).await?;
        Ok(serde_json::from_value(result["frameTree"].clone())?)
    }

    /// Execution context of a fresh isolated world in the frame.
    pub async fn isolated_world(&self, frame_id: &str) -> Result<i64, CdpError> {
        let result = self
            .call(
                "Page.createIsolatedWorld",
                Some(json!({
                    "frameId": frame_id,
                    "worldName": WORLD_NAME,
                    "grantUniveralAccess": true,
                })),
            )
            .await?;

        result["executionContextId"]
            .as_i64()
            .ok_or_else(|| CdpError::InvalidResponse("Missing executionContextId".to_string()))
    }
}
