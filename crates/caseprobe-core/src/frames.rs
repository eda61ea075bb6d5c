//! Frame search: locator resolution swept across every frame of a page,
//! plus the polling login-form discovery built on it.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use caseprobe_config::{SelectorConfig, SelectorRole};
use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

use crate::driver::{ElementRef, Frame, FrameRef, Page, Query, TextMatch};
use crate::error::DriverError;
use crate::locator::{first_visible, first_visible_of, try_first_visible};

/// A located element with the frame that owns it.
#[derive(Clone)]
pub struct FrameHit {
    pub frame: FrameRef,
    pub element: ElementRef,
}

/// Re-run `probe` every `interval` until it yields a value or `window`
/// elapses. The probe always runs at least once.
pub async fn poll_until<T, F, Fut>(window: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + window;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        sleep(interval.min(deadline - now)).await;
    }
}

/// Current frames, main first. A page in mid-navigation yields none.
pub async fn list_frames(page: &dyn Page) -> Vec<FrameRef> {
    match page.frames().await {
        Ok(frames) => frames,
        Err(e) => {
            trace!("Listing frames failed: {}", e);
            Vec::new()
        }
    }
}

/// First visible hit for `query`, main frame first, then embed order.
pub async fn find_in_frames(page: &dyn Page, query: &Query) -> Option<FrameHit> {
    for frame in list_frames(page).await {
        if let Some(element) = first_visible(frame.as_ref(), query).await {
            return Some(FrameHit { frame, element });
        }
    }
    None
}

/// Queries in priority order; each query is swept over all frames before
/// the next one is tried.
pub async fn find_any_in_frames(page: &dyn Page, queries: &[Query]) -> Option<FrameHit> {
    let frames = list_frames(page).await;
    for query in queries {
        for frame in &frames {
            if let Some(element) = first_visible(frame.as_ref(), query).await {
                return Some(FrameHit {
                    frame: frame.clone(),
                    element,
                });
            }
        }
    }
    None
}

/// Like [`find_any_in_frames`] but over the given frames, failing on the
/// first stale frame instead of skipping it.
pub async fn try_find_any_in(
    frames: &[FrameRef],
    queries: &[Query],
) -> Result<Option<FrameHit>, DriverError> {
    for query in queries {
        for frame in frames {
            if let Some(element) = try_first_visible(frame.as_ref(), query).await? {
                return Ok(Some(FrameHit {
                    frame: frame.clone(),
                    element,
                }));
            }
        }
    }
    Ok(None)
}

/// Position of a frame in the page, stable across reloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSlot {
    Main,
    Named(String),
}

impl FrameSlot {
    pub fn of(frame: &dyn Frame) -> Self {
        if frame.is_main() {
            FrameSlot::Main
        } else {
            FrameSlot::Named(frame.name().to_string())
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        FrameSlot::Named(name.into())
    }

    pub fn holds(&self, frame: &dyn Frame) -> bool {
        match self {
            FrameSlot::Main => frame.is_main(),
            FrameSlot::Named(name) => !frame.is_main() && frame.name() == name,
        }
    }
}

impl fmt::Display for FrameSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSlot::Main => f.write_str("main frame"),
            FrameSlot::Named(name) => write!(f, "frame '{}'", name),
        }
    }
}

/// A handle to whatever document the slot shows right now. `Ok(None)` means
/// the slot is gone; `Err` means the page could not be inspected.
pub async fn current_frame(
    page: &dyn Page,
    slot: &FrameSlot,
) -> Result<Option<FrameRef>, DriverError> {
    let frames = page.frames().await?;
    if frames.is_empty() {
        return Err(DriverError::Detached("page has no frames".to_string()));
    }
    Ok(frames.into_iter().find(|f| slot.holds(f.as_ref())))
}

/// Wait for the slot to show a document other than `previous`, then for
/// that document to load. When no new document arrives within `window` the
/// slot's current document is used as is, for pages that re-render in place.
pub async fn wait_for_document(
    page: &dyn Page,
    slot: &FrameSlot,
    previous: Option<&str>,
    window: Duration,
    interval: Duration,
    load_timeout: Duration,
) -> Option<FrameRef> {
    let fresh = poll_until(window, interval, move || async move {
        let frame = current_frame(page, slot).await.ok().flatten()?;
        match previous {
            Some(previous) if frame.load_id() == previous => None,
            _ => Some(frame),
        }
    })
    .await;

    let frame = match fresh {
        Some(frame) => frame,
        None => {
            debug!("No new document in {} within {:?}", slot, window);
            current_frame(page, slot).await.ok().flatten()?
        }
    };
    match frame.wait_for_load(load_timeout).await {
        Ok(()) => Some(frame),
        Err(e) => {
            debug!("{} changed while loading: {}", slot, e);
            current_frame(page, slot).await.ok().flatten().or(Some(frame))
        }
    }
}

/// Where a login field came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Selector,
    Auto,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Selector => f.write_str("selector"),
            Source::Auto => f.write_str("AUTO"),
        }
    }
}

/// A resolved login field and the query that found it.
#[derive(Clone)]
pub struct Field {
    pub element: ElementRef,
    pub query: Query,
    pub source: Source,
}

/// A detected login form, all fields in one frame.
#[derive(Clone)]
pub struct LoginForm {
    pub frame: FrameRef,
    pub username: Field,
    pub password: Field,
    pub submit: Option<Field>,
}

/// Configured selector first, then heuristics, per login role.
pub struct LoginQueries {
    username: (Option<Query>, Vec<Query>),
    password: (Option<Query>, Vec<Query>),
    submit: (Option<Query>, Vec<Query>),
}

impl LoginQueries {
    pub fn new(selectors: &SelectorConfig) -> Self {
        let configured = |role| selectors.get(role).map(Query::css);
        Self {
            username: (
                configured(SelectorRole::LoginUsername),
                vec![
                    Query::Label("Użytkownik".into()),
                    Query::Label("Uzytkownik".into()),
                    Query::InputAfterText("Użytkownik".into()),
                    Query::InputAfterText("Uzytkownik".into()),
                    Query::css("input:not([type='password']):not([type='hidden'])"),
                ],
            ),
            password: (
                configured(SelectorRole::LoginPassword),
                vec![
                    Query::css("input[type='password']"),
                    Query::InputAfterText("Hasło".into()),
                    Query::InputAfterText("Haslo".into()),
                ],
            ),
            submit: (
                configured(SelectorRole::LoginSubmit),
                vec![
                    Query::button(TextMatch::pattern("Zaloguj|Loguj")),
                    Query::Text(TextMatch::contains("Zaloguj")),
                ],
            ),
        }
    }
}

async fn resolve(frame: &FrameRef, (configured, heuristics): &(Option<Query>, Vec<Query>)) -> Option<Field> {
    if let Some(query) = configured {
        if let Some(element) = first_visible(frame.as_ref(), query).await {
            return Some(Field {
                element,
                query: query.clone(),
                source: Source::Selector,
            });
        }
        debug!("Configured selector {:?} not visible in frame '{}'", query, frame.name());
    }
    let (index, element) = first_visible_of(frame.as_ref(), heuristics).await?;
    Some(Field {
        element,
        query: heuristics[index].clone(),
        source: Source::Auto,
    })
}

async fn detect_in_frame(frame: &FrameRef, queries: &LoginQueries) -> Option<LoginForm> {
    let username = resolve(frame, &queries.username).await?;
    let password = resolve(frame, &queries.password).await?;
    if username.element.node_key() == password.element.node_key() {
        warn!(
            "Username and password resolved to the same element in frame '{}', discarding",
            frame.name()
        );
        return None;
    }
    let submit = resolve(frame, &queries.submit).await;
    Some(LoginForm {
        frame: frame.clone(),
        username,
        password,
        submit,
    })
}

/// Sweep all frames for a login form, retrying until the window closes.
pub async fn detect_login_form(
    page: &dyn Page,
    queries: &LoginQueries,
    window: Duration,
    interval: Duration,
) -> Option<LoginForm> {
    poll_until(window, interval, move || async move {
        for frame in list_frames(page).await {
            if let Some(form) = detect_in_frame(&frame, queries).await {
                return Some(form);
            }
        }
        None
    })
    .await
}

#[cfg(test)]
#[path = "frames_tests.rs"]
mod tests;
