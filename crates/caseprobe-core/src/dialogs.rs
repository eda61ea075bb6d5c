//! Acknowledgement-dialog dismissal.

use std::time::Duration;

use caseprobe_config::SelectorRole;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::driver::{Page, Query, TextMatch};
use crate::frames::find_any_in_frames;
use crate::locator::click_or_force;
use crate::result::StepCode;
use crate::session::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DismissReport {
    pub clicks: u32,
    pub elapsed: Duration,
}

/// Configured OK button first, then any button whose whole label matches
/// the dialog pattern.
pub fn dialog_queries(ctx: &SessionContext) -> Vec<Query> {
    let mut queries = Vec::new();
    if let Some(selector) = ctx.selectors.get(SelectorRole::OkButton) {
        queries.push(Query::css(selector));
    }
    queries.push(Query::button(TextMatch::pattern(format!(
        "^(?:{})$",
        ctx.portal.dialog_pattern
    ))));
    queries
}

/// Click acknowledgement buttons across all frames until none has been seen
/// for the quiet period, the click budget is spent, or the window elapses.
/// Safe to call with nothing to dismiss.
pub async fn dismiss_dialogs(page: &dyn Page, ctx: &SessionContext) -> DismissReport {
    let timings = &ctx.timings;
    let queries = dialog_queries(ctx);
    let started = Instant::now();
    let mut last_seen = started;
    let mut clicks = 0;

    while clicks < timings.dialog_max_clicks && started.elapsed() < timings.dialog_window() {
        match find_any_in_frames(page, &queries).await {
            Some(hit) => {
                last_seen = Instant::now();
                if click_or_force(&hit.element).await {
                    clicks += 1;
                    debug!("Dismissed dialog {} in frame '{}'", clicks, hit.frame.name());
                }
            }
            None if last_seen.elapsed() >= timings.dialog_quiet() => break,
            None => {}
        }
        sleep(timings.poll_interval()).await;
    }

    let report = DismissReport {
        clicks,
        elapsed: started.elapsed(),
    };
    ctx.event(
        StepCode::DismissDialogs,
        &format!("Zamknięto okien dialogowych: {}", report.clicks),
    )
    .await;
    report
}
