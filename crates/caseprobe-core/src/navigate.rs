//! Navigation and search: open a work list, find the identifier in it,
//! fall back from the unfinished to the finished list, open the record.

use caseprobe_config::{PortalConfig, SelectorRole};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::dialogs::dismiss_dialogs;
use crate::driver::{ElementRef, FrameRef, Page, Query, TextMatch};
use crate::error::DriverError;
use crate::frames::{
    current_frame, find_any_in_frames, list_frames, poll_until, try_find_any_in, wait_for_document, FrameSlot,
};
use crate::locator::{click_or_force, first_visible};
use crate::matcher::{exact_query, fuzzy_query};
use crate::result::StepCode;
use crate::runner::Halt;
use crate::session::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkList {
    Unfinished,
    Finished,
}

impl WorkList {
    pub const SEARCH_ORDER: [WorkList; 2] = [WorkList::Unfinished, WorkList::Finished];

    pub fn label<'a>(&self, portal: &'a PortalConfig) -> &'a str {
        match self {
            WorkList::Unfinished => &portal.unfinished_label,
            WorkList::Finished => &portal.finished_label,
        }
    }

    pub fn role(&self) -> SelectorRole {
        match self {
            WorkList::Unfinished => SelectorRole::UnfinishedListLink,
            WorkList::Finished => SelectorRole::FinishedListLink,
        }
    }

    fn opened_step(&self) -> StepCode {
        match self {
            WorkList::Unfinished => StepCode::NavUnfinished,
            WorkList::Finished => StepCode::NavFinished,
        }
    }

    fn missing_step(&self) -> StepCode {
        match self {
            WorkList::Unfinished => StepCode::NavUnfinishedMissingSelector,
            WorkList::Finished => StepCode::NavFinishedMissingSelector,
        }
    }
}

/// Where the identifier was found.
#[derive(Clone)]
pub struct SearchHit {
    pub list: WorkList,
    pub frame: FrameRef,
    pub element: ElementRef,
    pub fuzzy: bool,
}

pub(crate) enum SearchOutcome {
    Found(SearchHit),
    /// Absent from both lists; carries the last content frame for export.
    NotFound { frame: Option<FrameRef> },
}

fn list_queries(list: WorkList, ctx: &SessionContext) -> Vec<Query> {
    let label = list.label(&ctx.portal);
    let mut queries = Vec::new();
    if let Some(selector) = ctx.selectors.get(list.role()) {
        queries.push(Query::css(selector));
    }
    queries.push(Query::link(TextMatch::contains(label)));
    queries.push(Query::Text(TextMatch::contains(label)));
    queries
}

/// Click the list's control and wait for the content frame to show the new
/// document. Returns the loaded content frame, or `None` when it never
/// attached.
pub(crate) async fn open_list(
    page: &dyn Page,
    ctx: &SessionContext,
    list: WorkList,
) -> Result<Option<FrameRef>, Halt> {
    let owned = list_queries(list, ctx);
    let queries = owned.as_slice();
    let control = poll_until(ctx.timings.frame_window(), ctx.timings.poll_interval(), move || {
        find_any_in_frames(page, queries)
    })
    .await;

    let Some(control) = control else {
        return Err(Halt::Stop(
            ctx.fail(
                Some(page),
                list.missing_step(),
                &format!("Nie znaleziono przycisku listy '{}'", list.label(&ctx.portal)),
                list.role().key(),
            )
            .await,
        ));
    };

    let slot = FrameSlot::named(&ctx.portal.content_frame);
    let before = loaded_document(page, &slot).await;
    if !click_or_force(&control.element).await {
        warn!("Click on '{}' list control did not go through", list.label(&ctx.portal));
    }
    page.wait_for_load(ctx.timings.navigation_timeout()).await?;
    sleep(ctx.timings.settle()).await;
    dismiss_dialogs(page, ctx).await;

    let frame = wait_for_document(
        page,
        &slot,
        before.as_deref(),
        ctx.timings.frame_window(),
        ctx.timings.poll_interval(),
        ctx.timings.navigation_timeout(),
    )
    .await;
    ctx.event(
        list.opened_step(),
        &format!(
            "Otwarto listę '{}' (ramka '{}': {})",
            list.label(&ctx.portal),
            ctx.portal.content_frame,
            if frame.is_some() { "jest" } else { "brak" }
        ),
    )
    .await;
    ctx.debug_screenshot(page, list.opened_step()).await;
    Ok(frame)
}

/// Load id of the document the slot shows now, if any.
async fn loaded_document(page: &dyn Page, slot: &FrameSlot) -> Option<String> {
    current_frame(page, slot)
        .await
        .ok()
        .flatten()
        .map(|frame| frame.load_id().to_string())
}

/// Type the identifier into the configured search box, if there is one.
async fn run_search_input(
    page: &dyn Page,
    ctx: &SessionContext,
    frames: &[FrameRef],
    identifier: &str,
) -> Result<(), Halt> {
    let Some(selector) = ctx.selectors.get(SelectorRole::SearchInput) else {
        return Ok(());
    };
    let query = Query::css(selector);
    let mut input = None;
    for frame in frames {
        if let Some(element) = first_visible(frame.as_ref(), &query).await {
            input = Some(element);
            break;
        }
    }
    let input = match input {
        Some(input) => Some(input),
        None => find_any_in_frames(page, std::slice::from_ref(&query))
            .await
            .map(|hit| hit.element),
    };
    let Some(input) = input else {
        debug!("Search input {} not visible, matching list as shown", selector);
        return Ok(());
    };

    input.focus().await?;
    input.clear().await?;
    input.fill(identifier).await?;
    input.press("Enter").await?;
    sleep(ctx.timings.settle()).await;
    Ok(())
}

/// Exact text first, fuzzy second, optionally scoped to the results container.
///
/// Searches the content frame when there is one, otherwise every frame.
/// Frames are looked up afresh on each attempt, and a sweep that hits a
/// stale document is retried until the frame window closes.
async fn match_identifier(
    page: &dyn Page,
    ctx: &SessionContext,
    content: Option<&FrameSlot>,
    identifier: &str,
) -> Option<(FrameRef, ElementRef, bool)> {
    let scope = ctx.selectors.get(SelectorRole::ResultsContainer);
    let scoped = |query: Query| match scope {
        Some(container) => query.within(container),
        None => query,
    };
    let exact = [scoped(exact_query(identifier))];
    let fuzzy: Vec<Query> = fuzzy_query(identifier).map(scoped).into_iter().collect();
    let (exact, fuzzy) = (&exact, &fuzzy);

    let outcome = poll_until(ctx.timings.frame_window(), ctx.timings.poll_interval(), move || async move {
        let frames = match content {
            Some(slot) => vec![current_frame(page, slot).await.ok().flatten()?],
            None => list_frames(page).await,
        };
        match sweep(&frames, exact, fuzzy).await {
            Ok(found) => Some(found),
            Err(e) => {
                debug!("Search sweep hit a stale frame, retrying: {}", e);
                None
            }
        }
    })
    .await;
    outcome.flatten()
}

async fn sweep(
    frames: &[FrameRef],
    exact: &[Query],
    fuzzy: &[Query],
) -> Result<Option<(FrameRef, ElementRef, bool)>, DriverError> {
    if let Some(hit) = try_find_any_in(frames, exact).await? {
        return Ok(Some((hit.frame, hit.element, false)));
    }
    Ok(try_find_any_in(frames, fuzzy)
        .await?
        .map(|hit| (hit.frame, hit.element, true)))
}

/// Search the unfinished list, then the finished one. First match wins.
pub(crate) async fn locate_record(
    page: &dyn Page,
    ctx: &SessionContext,
    identifier: &str,
) -> Result<SearchOutcome, Halt> {
    let mut last_frame = None;
    let slot = FrameSlot::named(&ctx.portal.content_frame);
    for list in WorkList::SEARCH_ORDER {
        let content = open_list(page, ctx, list).await?;
        let frames = match &content {
            Some(frame) => vec![frame.clone()],
            None => list_frames(page).await,
        };

        run_search_input(page, ctx, &frames, identifier).await?;
        let label = list.label(&ctx.portal);
        let searched = content.as_ref().map(|_| &slot);
        match match_identifier(page, ctx, searched, identifier).await {
            Some((frame, element, fuzzy)) => {
                ctx.event(
                    StepCode::SearchNumber,
                    &format!(
                        "Znaleziono {} w '{}' ({})",
                        identifier,
                        label,
                        if fuzzy { "dopasowanie przybliżone" } else { "dokładnie" }
                    ),
                )
                .await;
                return Ok(SearchOutcome::Found(SearchHit {
                    list,
                    frame,
                    element,
                    fuzzy,
                }));
            }
            None => {
                ctx.event(
                    StepCode::SearchNumber,
                    &format!("Brak {} w '{}'", identifier, label),
                )
                .await;
                last_frame = content;
            }
        }
    }
    Ok(SearchOutcome::NotFound { frame: last_frame })
}

/// Open the matched record. The click is forced: list rows sit under
/// overlays that swallow pointer events.
///
/// Returns the frame that held the match, as loaded with the record.
pub(crate) async fn open_record(
    page: &dyn Page,
    ctx: &SessionContext,
    hit: &SearchHit,
) -> Result<Option<FrameRef>, Halt> {
    let slot = FrameSlot::of(hit.frame.as_ref());
    hit.element.click(true).await?;
    page.wait_for_load(ctx.timings.navigation_timeout()).await?;
    let frame = wait_for_document(
        page,
        &slot,
        Some(hit.frame.load_id()),
        ctx.timings.frame_window(),
        ctx.timings.poll_interval(),
        ctx.timings.navigation_timeout(),
    )
    .await;
    sleep(ctx.timings.settle()).await;
    dismiss_dialogs(page, ctx).await;
    info!("Opened record from {:?} list", hit.list);
    ctx.event(StepCode::OpenRecord, "Otwarto rekord").await;
    ctx.debug_screenshot(page, StepCode::OpenRecord).await;
    Ok(frame)
}

#[cfg(test)]
#[path = "navigate_tests.rs"]
mod tests;
