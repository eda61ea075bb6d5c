//! Capability interface between the engine and a live browser.
//!
//! The engine only ever talks to these traits. Production code implements
//! them over the Chrome DevTools Protocol; tests implement them over an
//! in-memory document.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DriverError;

pub type PageRef = Arc<dyn Page>;
pub type FrameRef = Arc<dyn Frame>;
pub type ElementRef = Arc<dyn Element>;

/// Accessible role used by role queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// `button`, `input[type=submit|button]`, `[role=button]`.
    Button,
    /// `a[href]`, `[role=link]`, `[onclick]`.
    Link,
}

/// How element text is compared.
///
/// Text is whitespace-normalised before comparison on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    /// Case-sensitive substring.
    Contains(String),
    /// Case-insensitive regular expression. Browsers evaluate it with the
    /// `iu` flags, so it must be valid in unicode-mode ECMAScript as well as
    /// in `regex`; `\p{..}` classes behave alike in both, `\b` and `\w` do not.
    Pattern(String),
}

impl TextMatch {
    pub fn contains(text: impl Into<String>) -> Self {
        TextMatch::Contains(text.into())
    }

    pub fn pattern(source: impl Into<String>) -> Self {
        TextMatch::Pattern(source.into())
    }

    /// Evaluate against a piece of text. Invalid patterns never match.
    pub fn matches(&self, text: &str) -> bool {
        let normalized = normalize_space(text);
        match self {
            TextMatch::Contains(needle) => normalized.contains(&normalize_space(needle)),
            TextMatch::Pattern(source) => regex::RegexBuilder::new(source)
                .case_insensitive(true)
                .build()
                .map(|re| re.is_match(&normalized))
                .unwrap_or(false),
        }
    }
}

/// Collapse whitespace runs into single spaces and trim, like XPath `normalize-space`.
pub fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A deferred element query, re-evaluated on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// CSS selector.
    Css(String),
    /// Form controls labelled with the text (`<label>`, `aria-label`, `placeholder`).
    Label(String),
    /// First enabled, non-hidden `input` that follows an element containing the text.
    InputAfterText(String),
    /// Elements of a role whose accessible name matches.
    Role { role: Role, name: TextMatch },
    /// Innermost elements whose text matches.
    Text(TextMatch),
    /// Restrict a query to descendants of the elements matching a CSS selector.
    Within { scope: String, query: Box<Query> },
}

impl Query {
    pub fn css(selector: impl Into<String>) -> Self {
        Query::Css(selector.into())
    }

    pub fn button(name: TextMatch) -> Self {
        Query::Role {
            role: Role::Button,
            name,
        }
    }

    pub fn link(name: TextMatch) -> Self {
        Query::Role {
            role: Role::Link,
            name,
        }
    }

    pub fn within(self, scope: impl Into<String>) -> Self {
        Query::Within {
            scope: scope.into(),
            query: Box::new(self),
        }
    }
}

/// Attributes of one `<input>` as reported by the login diagnostic probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputSummary {
    #[serde(rename = "type")]
    pub input_type: String,
    pub id: String,
    pub name: String,
    pub placeholder: String,
    pub aria_label: String,
}

/// A live DOM element.
#[async_trait]
pub trait Element: Send + Sync {
    /// Identity of the underlying DOM node; equal keys mean the same node.
    fn node_key(&self) -> u64;

    async fn is_visible(&self) -> Result<bool, DriverError>;

    async fn is_enabled(&self) -> Result<bool, DriverError>;

    /// Click the element. `force` bypasses pointer hit-testing, for targets
    /// covered by overlays.
    async fn click(&self, force: bool) -> Result<(), DriverError>;

    async fn focus(&self) -> Result<(), DriverError>;

    /// Replace the value in one step.
    async fn fill(&self, value: &str) -> Result<(), DriverError>;

    /// Empty the field.
    async fn clear(&self) -> Result<(), DriverError>;

    /// Type character by character with a pause between keystrokes.
    async fn type_text(&self, text: &str, delay: Duration) -> Result<(), DriverError>;

    /// Current `value` of a form control.
    async fn input_value(&self) -> Result<String, DriverError>;

    async fn press(&self, key: &str) -> Result<(), DriverError>;

    async fn inner_text(&self) -> Result<String, DriverError>;
}

/// One browsing context (the main document or a nested frame).
#[async_trait]
pub trait Frame: Send + Sync {
    fn name(&self) -> &str;

    fn url(&self) -> &str;

    fn is_main(&self) -> bool;

    /// Identity of the document this handle was taken from. A handle only
    /// works while its frame still shows that document; a reload yields a
    /// new id and leaves old handles failing with [`DriverError::Detached`].
    fn load_id(&self) -> &str;

    /// Every element matching the query, in document order.
    async fn query_all(&self, query: &Query) -> Result<Vec<ElementRef>, DriverError>;

    /// Serialized document HTML.
    async fn content(&self) -> Result<String, DriverError>;

    /// Rendered text of the document body.
    async fn body_text(&self) -> Result<String, DriverError>;

    async fn inputs(&self) -> Result<Vec<InputSummary>, DriverError>;

    async fn wait_for_load(&self, timeout: Duration) -> Result<(), DriverError>;
}

/// A browser tab.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Main frame first, then nested frames in embed order.
    async fn frames(&self) -> Result<Vec<FrameRef>, DriverError>;

    /// HTML of the main document.
    async fn content(&self) -> Result<String, DriverError>;

    /// Body text of the main document.
    async fn body_text(&self) -> Result<String, DriverError>;

    /// Full-page PNG screenshot written to `path`.
    async fn screenshot(&self, path: &Path) -> Result<(), DriverError>;

    async fn wait_for_load(&self, timeout: Duration) -> Result<(), DriverError>;

    /// Key press sent to whatever currently has focus.
    async fn press_key(&self, key: &str) -> Result<(), DriverError>;

    /// Accept native `alert`/`confirm`/`prompt` dialogs for the lifetime of the page.
    async fn accept_native_dialogs(&self) -> Result<(), DriverError>;

    async fn close(&self) -> Result<(), DriverError>;
}

/// Starts a browser and opens one page.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<PageRef, DriverError>;
}
