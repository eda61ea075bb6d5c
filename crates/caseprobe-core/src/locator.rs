//! Locator resolution inside one frame.
//!
//! Every lookup degrades to `None`: a detached frame or stale handle means
//! "not there right now", never a failed run.

use tracing::trace;

use crate::driver::{ElementRef, Frame, Query};
use crate::error::DriverError;

/// First element matching `query` that is currently visible.
///
/// All matches are enumerated in document order; hidden duplicates (inactive
/// tabs, templates) are skipped.
pub async fn first_visible(frame: &dyn Frame, query: &Query) -> Option<ElementRef> {
    match try_first_visible(frame, query).await {
        Ok(found) => found,
        Err(e) => {
            trace!("Query {:?} in frame '{}' failed: {}", query, frame.name(), e);
            None
        }
    }
}

/// Like [`first_visible`], but a stale frame or handle is reported instead
/// of read as absence. Callers that must tell "gone" from "unknown" use this.
pub async fn try_first_visible(frame: &dyn Frame, query: &Query) -> Result<Option<ElementRef>, DriverError> {
    for element in frame.query_all(query).await? {
        if element.is_visible().await? {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

/// First visible hit over several queries, tried in order. Returns the
/// index of the query that matched.
pub async fn first_visible_of(frame: &dyn Frame, queries: &[Query]) -> Option<(usize, ElementRef)> {
    for (index, query) in queries.iter().enumerate() {
        if let Some(element) = first_visible(frame, query).await {
            return Some((index, element));
        }
    }
    None
}

/// Whether a visible element matches.
pub async fn is_present(frame: &dyn Frame, query: &Query) -> bool {
    first_visible(frame, query).await.is_some()
}

/// Click with a pointer event, falling back to a forced click when the
/// target is covered. Returns whether either click went through.
pub async fn click_or_force(element: &ElementRef) -> bool {
    match element.click(false).await {
        Ok(()) => true,
        Err(e) => {
            trace!("Pointer click failed ({}), forcing", e);
            element.click(true).await.is_ok()
        }
    }
}
