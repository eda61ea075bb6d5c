//! DOM operations for CDP page session.

use serde_json::json;

use crate::error::CdpError;

use super::core::PageSession;

impl PageSession {
    /// Stable backend id of the node behind a remote object.
    pub async fn backend_node_id(&self, object_id: &str) -> Result<u64, CdpError> {
        let result = self
            .call("DOM.describeNode", Some(json!({"objectId": object_id})))
            .await?;

        result["node"]["backendNodeId"]
            .as_u64()
            .ok_or_else(|| CdpError::InvalidResponse("Missing backendNodeId".to_string()))
    }

    pub async fn scroll_into_view(&self, object_id: &str) -> Result<(), CdpError> {
        self.call(
            "DOM.scrollIntoViewIfNeeded",
            Some(json!({"objectId": object_id})),
        )
        .await?;
        Ok(())
    }

    /// Centre of the node's first content quad in top-level viewport
    /// coordinates, `None` when the node is not rendered.
    pub async fn content_center(&self, object_id: &str) -> Result<Option<(f64, f64)>, CdpError> {
        let result = self
            .call("DOM.getContentQuads", Some(json!({"objectId": object_id})))
            .await?;

        let quad: Option<Vec<f64>> = result["quads"]
            .as_array()
            .and_then(|quads| quads.first())
            .and_then(|q| serde_json::from_value(q.clone()).ok());

        Ok(quad.filter(|q| q.len() >= 8).map(|q| Self::quad_center(&q)))
    }

    /// Calculate center point of a quad.
    pub(super) fn quad_center(quad: &[f64]) -> (f64, f64) {
        let x = (quad[0] + quad[2] + quad[4] + quad[6]) / 4.0;
        let y = (quad[1] + quad[3] + quad[5] + quad[7]) / 4.0;
        (x, y)
    }
}
