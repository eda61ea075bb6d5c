//! In-memory page used by the engine tests.
//!
//! A page is a list of frames, each a flat list of nodes in document order.
//! Nodes carry just enough attributes to answer every [`Query`] variant, and
//! may run an action against the whole page when clicked or when Enter is
//! pressed on them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use caseprobe_config::Timings;
use parking_lot::Mutex;

use crate::driver::{
    BrowserLauncher, Element, ElementRef, Frame, FrameRef, InputSummary, Page, PageRef, Query,
    Role, TextMatch,
};
use crate::error::DriverError;

pub(crate) type Action = Arc<dyn Fn(&mut PageState) + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct FakeNode {
    key: u64,
    tag: String,
    id: String,
    classes: Vec<String>,
    input_type: String,
    placeholder: String,
    label: String,
    text: String,
    value: String,
    role: Option<Role>,
    hidden: bool,
    disabled: bool,
    parent: Option<String>,
    on_click: Option<Action>,
    on_enter: Option<Action>,
    flaky_fill: bool,
    rejects_input: bool,
    intercepts_clicks: bool,
}

impl FakeNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn input(id: &str, input_type: &str) -> Self {
        Self::new("input").id(id).input_type(input_type)
    }

    pub fn button(id: &str, text: &str) -> Self {
        Self::new("button").id(id).text(text)
    }

    pub fn link(id: &str, text: &str) -> Self {
        Self::new("a").id(id).text(text)
    }

    pub fn span(text: &str) -> Self {
        Self::new("span").text(text)
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn input_type(mut self, input_type: &str) -> Self {
        self.input_type = input_type.to_string();
        self
    }

    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = placeholder.to_string();
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Nest under the node with this id, for scoped queries.
    pub fn within(mut self, parent_id: &str) -> Self {
        self.parent = Some(parent_id.to_string());
        self
    }

    pub fn on_click(mut self, action: impl Fn(&mut PageState) + Send + Sync + 'static) -> Self {
        self.on_click = Some(Arc::new(action));
        self
    }

    pub fn on_enter(mut self, action: impl Fn(&mut PageState) + Send + Sync + 'static) -> Self {
        self.on_enter = Some(Arc::new(action));
        self
    }

    pub fn on_click_action(mut self, action: Action) -> Self {
        self.on_click = Some(action);
        self
    }

    pub fn on_enter_action(mut self, action: Action) -> Self {
        self.on_enter = Some(action);
        self
    }

    /// One-shot `fill` does not stick, per-character typing does.
    pub fn flaky_fill(mut self) -> Self {
        self.flaky_fill = true;
        self
    }

    /// Neither `fill` nor typing changes the value.
    pub fn rejects_input(mut self) -> Self {
        self.rejects_input = true;
        self
    }

    /// Pointer clicks land on an overlay; only forced clicks reach the node.
    pub fn intercepts_clicks(mut self) -> Self {
        self.intercepts_clicks = true;
        self
    }

    fn display_name(&self) -> String {
        if !self.id.is_empty() {
            self.id.clone()
        } else {
            self.text.clone()
        }
    }

    fn accessible_name(&self) -> &str {
        if !self.text.is_empty() {
            &self.text
        } else if !self.value.is_empty() {
            &self.value
        } else {
            &self.label
        }
    }

    fn is_form_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea" | "select")
    }

    fn has_role(&self, role: Role) -> bool {
        if self.role == Some(role) {
            return true;
        }
        match role {
            Role::Button => {
                self.tag == "button"
                    || (self.tag == "input" && matches!(self.input_type.as_str(), "submit" | "button"))
            }
            Role::Link => self.tag == "a",
        }
    }
}

pub(crate) struct FrameState {
    name: String,
    url: String,
    main: bool,
    /// Bumped on every new document; handles from older loads are stale.
    generation: u64,
    nodes: Vec<FakeNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    Timeout,
    Protocol,
    Panic,
}

/// Whole-page state shared by every handle into the page.
pub(crate) struct PageState {
    frames: Vec<FrameState>,
    /// Navigation committed once the given time has passed.
    pending: Option<(Instant, Action)>,
    next_key: u64,
    loads: u64,
    focused: Option<u64>,
    pub clicks: Vec<String>,
    pub keys: Vec<String>,
    pub fills: Vec<String>,
    pub screenshots: Vec<PathBuf>,
    pub visited: Vec<String>,
    pub native_dialogs: bool,
    pub closed: bool,
    pub goto_fault: Option<Fault>,
}

impl PageState {
    pub fn add_frame(&mut self, name: &str, url: &str) {
        let generation = self.next_load();
        self.frames.push(FrameState {
            name: name.to_string(),
            url: url.to_string(),
            main: false,
            generation,
            nodes: Vec::new(),
        });
    }

    fn next_load(&mut self) -> u64 {
        self.loads += 1;
        self.loads
    }

    pub fn remove_frame(&mut self, name: &str) {
        self.frames.retain(|f| f.main || f.name != name);
    }

    /// Append a node to a frame (`""` is the main frame).
    pub fn push(&mut self, frame: &str, mut node: FakeNode) {
        self.next_key += 1;
        node.key = self.next_key;
        if let Some(f) = self.frames.iter_mut().find(|f| f.name == frame) {
            f.nodes.push(node);
        }
    }

    /// Replace the frame's document with an empty one.
    pub fn clear_frame(&mut self, frame: &str) {
        let generation = self.next_load();
        if let Some(f) = self.frames.iter_mut().find(|f| f.name == frame) {
            f.generation = generation;
            f.nodes.clear();
        }
    }

    /// Load the same markup again as a new document: fresh node identities,
    /// typed values lost, every earlier handle into the frame stale.
    pub fn reload(&mut self, frame: &str) {
        let Some(index) = self.frames.iter().position(|f| f.name == frame) else {
            return;
        };
        let generation = self.next_load();
        let mut next_key = self.next_key;
        let f = &mut self.frames[index];
        f.generation = generation;
        for node in &mut f.nodes {
            next_key += 1;
            node.key = next_key;
            node.value.clear();
        }
        self.next_key = next_key;
    }

    /// Run `action` as a navigation that only commits after `delay`.
    pub fn navigate_later(&mut self, delay: Duration, action: Action) {
        self.pending = Some((Instant::now() + delay, action));
    }

    fn commit_due(&mut self) {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|(at, _)| Instant::now() >= *at);
        if due {
            if let Some((_, action)) = self.pending.take() {
                action(self);
            }
        }
    }

    pub fn remove(&mut self, id: &str) {
        for frame in &mut self.frames {
            frame.nodes.retain(|n| n.id != id);
        }
    }

    pub fn set_hidden(&mut self, id: &str, hidden: bool) {
        for frame in &mut self.frames {
            for node in frame.nodes.iter_mut().filter(|n| n.id == id) {
                node.hidden = hidden;
            }
        }
    }

    pub fn value_of(&self, id: &str) -> String {
        self.frames
            .iter()
            .flat_map(|f| f.nodes.iter())
            .find(|n| n.id == id)
            .map(|n| n.value.clone())
            .unwrap_or_default()
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.frames.iter().flat_map(|f| f.nodes.iter()).any(|n| n.id == id)
    }

    fn frame(&self, name: &str, generation: u64) -> Result<&FrameState, DriverError> {
        let frame = self
            .frames
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| DriverError::Detached(format!("frame '{}' detached", name)))?;
        if frame.generation != generation {
            return Err(DriverError::Detached(
                "Cannot find context with specified id".to_string(),
            ));
        }
        Ok(frame)
    }

    fn node(&self, key: u64) -> Option<&FakeNode> {
        self.frames
            .iter()
            .flat_map(|f| f.nodes.iter())
            .find(|n| n.key == key)
    }

    fn node_mut(&mut self, key: u64) -> Option<&mut FakeNode> {
        self.frames
            .iter_mut()
            .flat_map(|f| f.nodes.iter_mut())
            .find(|n| n.key == key)
    }
}

/// Shared handle to a fake page.
#[derive(Clone)]
pub(crate) struct FakePage {
    state: Arc<Mutex<PageState>>,
}

impl FakePage {
    pub fn new() -> Self {
        let state = PageState {
            frames: vec![FrameState {
                name: String::new(),
                url: "https://portal.test/".to_string(),
                main: true,
                generation: 0,
                nodes: Vec::new(),
            }],
            pending: None,
            next_key: 0,
            loads: 0,
            focused: None,
            clicks: Vec::new(),
            keys: Vec::new(),
            fills: Vec::new(),
            screenshots: Vec::new(),
            visited: Vec::new(),
            native_dialogs: false,
            closed: false,
            goto_fault: None,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn page_ref(&self) -> PageRef {
        Arc::new(self.clone())
    }

    fn frame_handle(&self, frame: &FrameState) -> FrameRef {
        Arc::new(FakeFrame {
            state: self.state.clone(),
            name: frame.name.clone(),
            url: frame.url.clone(),
            main: frame.main,
            generation: frame.generation,
            load_id: format!("{}#{}", frame.name, frame.generation),
        })
    }
}

struct FakeFrame {
    state: Arc<Mutex<PageState>>,
    name: String,
    url: String,
    main: bool,
    generation: u64,
    load_id: String,
}

impl FakeFrame {
    fn element(&self, key: u64) -> ElementRef {
        Arc::new(FakeElement {
            state: self.state.clone(),
            key,
        })
    }
}

struct FakeElement {
    state: Arc<Mutex<PageState>>,
    key: u64,
}

impl FakeElement {
    fn read<R>(&self, f: impl FnOnce(&FakeNode) -> R) -> Result<R, DriverError> {
        let state = self.state.lock();
        state
            .node(self.key)
            .map(f)
            .ok_or_else(|| DriverError::Detached(format!("node {} is gone", self.key)))
    }

    fn write<R>(&self, f: impl FnOnce(&mut FakeNode) -> R) -> Result<R, DriverError> {
        let mut state = self.state.lock();
        state
            .node_mut(self.key)
            .map(f)
            .ok_or_else(|| DriverError::Detached(format!("node {} is gone", self.key)))
    }

    fn run(&self, action: Option<Action>) {
        if let Some(action) = action {
            action(&mut self.state.lock());
        }
    }
}

#[async_trait]
impl Element for FakeElement {
    fn node_key(&self) -> u64 {
        self.key
    }

    async fn is_visible(&self) -> Result<bool, DriverError> {
        self.read(|n| !n.hidden)
    }

    async fn is_enabled(&self) -> Result<bool, DriverError> {
        self.read(|n| !n.disabled)
    }

    async fn click(&self, force: bool) -> Result<(), DriverError> {
        let (blocked, name, action) =
            self.read(|n| (n.intercepts_clicks || n.disabled, n.display_name(), n.on_click.clone()))?;
        if blocked && !force {
            return Err(DriverError::Script(format!("click on {} intercepted", name)));
        }
        self.state.lock().clicks.push(name);
        self.run(action);
        Ok(())
    }

    async fn focus(&self) -> Result<(), DriverError> {
        self.read(|_| ())?;
        self.state.lock().focused = Some(self.key);
        Ok(())
    }

    async fn fill(&self, value: &str) -> Result<(), DriverError> {
        let name = self.write(|n| {
            if !n.flaky_fill && !n.rejects_input {
                n.value = value.to_string();
            }
            n.display_name()
        })?;
        self.state.lock().fills.push(name);
        Ok(())
    }

    async fn clear(&self) -> Result<(), DriverError> {
        self.write(|n| {
            if !n.rejects_input {
                n.value.clear();
            }
        })
    }

    async fn type_text(&self, text: &str, _delay: Duration) -> Result<(), DriverError> {
        self.write(|n| {
            if !n.rejects_input {
                n.value.push_str(text);
            }
        })
    }

    async fn input_value(&self) -> Result<String, DriverError> {
        self.read(|n| n.value.clone())
    }

    async fn press(&self, key: &str) -> Result<(), DriverError> {
        let (name, action) = self.read(|n| (n.display_name(), n.on_enter.clone()))?;
        self.state.lock().keys.push(format!("{}:{}", name, key));
        if key == "Enter" {
            self.run(action);
        }
        Ok(())
    }

    async fn inner_text(&self) -> Result<String, DriverError> {
        self.read(|n| n.text.clone())
    }
}

#[async_trait]
impl Frame for FakeFrame {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn is_main(&self) -> bool {
        self.main
    }

    fn load_id(&self) -> &str {
        &self.load_id
    }

    async fn query_all(&self, query: &Query) -> Result<Vec<ElementRef>, DriverError> {
        let keys = {
            let state = self.state.lock();
            let frame = state.frame(&self.name, self.generation)?;
            select(&frame.nodes, query)
        };
        Ok(keys.into_iter().map(|k| self.element(k)).collect())
    }

    async fn content(&self) -> Result<String, DriverError> {
        let state = self.state.lock();
        let frame = state.frame(&self.name, self.generation)?;
        Ok(render_html(&frame.nodes))
    }

    async fn body_text(&self) -> Result<String, DriverError> {
        let state = self.state.lock();
        let frame = state.frame(&self.name, self.generation)?;
        Ok(render_text(&frame.nodes))
    }

    async fn inputs(&self) -> Result<Vec<InputSummary>, DriverError> {
        let state = self.state.lock();
        let frame = state.frame(&self.name, self.generation)?;
        Ok(frame
            .nodes
            .iter()
            .filter(|n| n.tag == "input")
            .map(|n| InputSummary {
                input_type: n.input_type.clone(),
                id: n.id.clone(),
                name: String::new(),
                placeholder: n.placeholder.clone(),
                aria_label: n.label.clone(),
            })
            .collect())
    }

    async fn wait_for_load(&self, _timeout: Duration) -> Result<(), DriverError> {
        let state = self.state.lock();
        state.frame(&self.name, self.generation).map(|_| ())
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        let fault = self.state.lock().goto_fault;
        match fault {
            Some(Fault::Timeout) => Err(DriverError::Timeout(format!(
                "Navigation to {} exceeded {:?}",
                url, timeout
            ))),
            Some(Fault::Protocol) => Err(DriverError::Protocol("Target closed".to_string())),
            Some(Fault::Panic) => panic!("driver crashed while opening {}", url),
            None => {
                self.state.lock().visited.push(url.to_string());
                Ok(())
            }
        }
    }

    async fn frames(&self) -> Result<Vec<FrameRef>, DriverError> {
        let mut state = self.state.lock();
        state.commit_due();
        Ok(state.frames.iter().map(|f| self.frame_handle(f)).collect())
    }

    async fn content(&self) -> Result<String, DriverError> {
        let state = self.state.lock();
        Ok(render_html(&state.frames[0].nodes))
    }

    async fn body_text(&self) -> Result<String, DriverError> {
        let state = self.state.lock();
        Ok(render_text(&state.frames[0].nodes))
    }

    async fn screenshot(&self, path: &Path) -> Result<(), DriverError> {
        tokio::fs::write(path, b"\x89PNG\r\n\x1a\nfake").await?;
        self.state.lock().screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn wait_for_load(&self, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        let action = {
            let mut state = self.state.lock();
            state.keys.push(format!("page:{}", key));
            let focused = state.focused;
            focused
                .and_then(|k| state.node(k))
                .and_then(|n| n.on_enter.clone())
                .filter(|_| key == "Enter")
        };
        if let Some(action) = action {
            action(&mut self.state.lock());
        }
        Ok(())
    }

    async fn accept_native_dialogs(&self) -> Result<(), DriverError> {
        self.state.lock().native_dialogs = true;
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.state.lock().closed = true;
        Ok(())
    }
}

fn render_html(nodes: &[FakeNode]) -> String {
    let mut html = String::from("<html><body>");
    for n in nodes {
        html.push_str(&format!("<{} id=\"{}\">{}</{}>", n.tag, n.id, n.text, n.tag));
    }
    html.push_str("</body></html>");
    html
}

fn render_text(nodes: &[FakeNode]) -> String {
    nodes
        .iter()
        .filter(|n| !n.hidden && !n.text.is_empty())
        .map(|n| n.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn select(nodes: &[FakeNode], query: &Query) -> Vec<u64> {
    match query {
        Query::Css(selector) => nodes
            .iter()
            .filter(|n| css_matches(n, selector))
            .map(|n| n.key)
            .collect(),
        Query::Label(text) => {
            let needle = TextMatch::contains(text.as_str());
            nodes
                .iter()
                .filter(|n| n.is_form_control())
                .filter(|n| needle.matches(&n.label) || needle.matches(&n.placeholder))
                .map(|n| n.key)
                .collect()
        }
        Query::InputAfterText(text) => {
            let needle = TextMatch::contains(text.as_str());
            let Some(start) = nodes.iter().position(|n| needle.matches(&n.text)) else {
                return Vec::new();
            };
            nodes[start + 1..]
                .iter()
                .find(|n| n.tag == "input" && !n.hidden && !n.disabled && n.input_type != "hidden")
                .map(|n| vec![n.key])
                .unwrap_or_default()
        }
        Query::Role { role, name } => nodes
            .iter()
            .filter(|n| n.has_role(*role) && name.matches(n.accessible_name()))
            .map(|n| n.key)
            .collect(),
        Query::Text(m) => nodes
            .iter()
            .filter(|n| !n.text.is_empty() && m.matches(&n.text))
            .map(|n| n.key)
            .collect(),
        Query::Within { scope, query } => {
            let scopes: Vec<&str> = nodes
                .iter()
                .filter(|n| !n.id.is_empty() && css_matches(n, scope))
                .map(|n| n.id.as_str())
                .collect();
            let inner = select(nodes, query);
            nodes
                .iter()
                .filter(|n| inner.contains(&n.key))
                .filter(|n| n.parent.as_deref().is_some_and(|p| scopes.contains(&p)))
                .map(|n| n.key)
                .collect()
        }
    }
}

/// Compound selectors only: `tag#id.class[attr='v']:not(...)`, comma lists.
fn css_matches(node: &FakeNode, selector: &str) -> bool {
    selector.split(',').any(|part| compound_matches(node, part.trim()))
}

fn compound_matches(node: &FakeNode, selector: &str) -> bool {
    if selector.is_empty() {
        return false;
    }
    let tag_end = selector
        .find(|c| matches!(c, '#' | '.' | '[' | ':'))
        .unwrap_or(selector.len());
    let tag = &selector[..tag_end];
    if !tag.is_empty() && tag != "*" && tag != node.tag {
        return false;
    }
    let mut rest = &selector[tag_end..];
    while !rest.is_empty() {
        if let Some(r) = rest.strip_prefix(":not(") {
            let Some(end) = r.find(')') else { return false };
            if compound_matches(node, &r[..end]) {
                return false;
            }
            rest = &r[end + 1..];
        } else if let Some(r) = rest.strip_prefix('[') {
            let Some(end) = r.find(']') else { return false };
            if !attr_matches(node, &r[..end]) {
                return false;
            }
            rest = &r[end + 1..];
        } else if let Some(r) = rest.strip_prefix('#').or_else(|| rest.strip_prefix('.')) {
            let end = r.find(|c| matches!(c, '#' | '.' | '[' | ':')).unwrap_or(r.len());
            let ident = &r[..end];
            let ok = if rest.starts_with('#') {
                node.id == ident
            } else {
                node.classes.iter().any(|c| c == ident)
            };
            if !ok {
                return false;
            }
            rest = &r[end..];
        } else {
            return false;
        }
    }
    true
}

fn attr_matches(node: &FakeNode, attr: &str) -> bool {
    let (name, expected) = match attr.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.trim().trim_matches(|c| c == '\'' || c == '"'))),
        None => (attr.trim(), None),
    };
    let actual = match name {
        "type" => node.input_type.as_str(),
        "id" => node.id.as_str(),
        "placeholder" => node.placeholder.as_str(),
        "aria-label" => node.label.as_str(),
        _ => "",
    };
    match expected {
        Some(expected) => actual == expected,
        None => !actual.is_empty(),
    }
}

/// What the fake launcher hands out.
pub(crate) enum Launch {
    Page(FakePage),
    Unavailable,
    Broken,
}

pub(crate) struct FakeLauncher {
    launch: Launch,
}

impl FakeLauncher {
    pub fn new(launch: Launch) -> Self {
        Self { launch }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<PageRef, DriverError> {
        match &self.launch {
            Launch::Page(page) => Ok(page.page_ref()),
            Launch::Unavailable => Err(DriverError::Unavailable(
                "no Chrome executable in PATH".to_string(),
            )),
            Launch::Broken => Err(DriverError::Launch(
                "Chrome exited before opening the debug port".to_string(),
            )),
        }
    }
}

/// Windows in the tens of milliseconds.
pub(crate) fn fast_timings() -> Timings {
    Timings {
        navigation_timeout_ms: 1_000,
        login_form_window_ms: 60,
        poll_interval_ms: 5,
        login_exit_window_ms: 60,
        dialog_window_ms: 300,
        dialog_quiet_ms: 30,
        dialog_max_clicks: 5,
        frame_window_ms: 40,
        settle_ms: 1,
        type_delay_ms: 0,
    }
}

/// A portal with a login form, post-login acknowledgement dialogs, a menu
/// with both work lists and a `centr` content frame.
pub(crate) struct Portal {
    pub password: String,
    pub dialogs: usize,
    pub unfinished: Vec<String>,
    pub finished: Vec<String>,
    /// Frame holding the login form; `""` is the main document.
    pub login_frame: String,
    pub submit_button: bool,
    pub row_overlay: bool,
    /// A rejected password reloads the login document instead of showing
    /// the error text.
    pub reload_on_reject: bool,
    /// Work lists render this long after the menu click.
    pub list_delay: Option<Duration>,
}

impl Default for Portal {
    fn default() -> Self {
        Self {
            password: "tajne".to_string(),
            dialogs: 0,
            unfinished: Vec::new(),
            finished: Vec::new(),
            login_frame: String::new(),
            submit_button: true,
            row_overlay: false,
            reload_on_reject: false,
            list_delay: None,
        }
    }
}

impl Portal {
    pub fn build(&self) -> FakePage {
        let page = FakePage::new();
        let expected = self.password.clone();
        let dialogs = self.dialogs;
        let unfinished = Arc::new(self.unfinished.clone());
        let finished = Arc::new(self.finished.clone());
        let overlay = self.row_overlay;
        let login_frame = self.login_frame.clone();
        let reload_on_reject = self.reload_on_reject;
        let list_delay = self.list_delay;
        let form_frame = login_frame.clone();

        let submit: Action = Arc::new(move |state: &mut PageState| {
            if state.value_of("login-user").is_empty() || state.value_of("login-pass") != expected {
                if reload_on_reject {
                    state.reload(&form_frame);
                } else {
                    state.set_hidden("login-error", false);
                }
                return;
            }
            for id in ["login-user-label", "login-user", "login-pass-label", "login-pass", "login-submit", "login-error"] {
                state.remove(id);
            }
            for i in 0..dialogs {
                let id = format!("dialog-{}", i);
                let remove_id = id.clone();
                state.push("", FakeNode::button(&id, "OK").on_click(move |s| s.remove(&remove_id)));
            }
            let rows = unfinished.clone();
            state.push(
                "",
                FakeNode::link("nav-unfinished", "Roboty niezakończone")
                    .on_click_action(list_link("Roboty niezakończone", rows, overlay, list_delay)),
            );
            let rows = finished.clone();
            state.push(
                "",
                FakeNode::link("nav-finished", "Roboty zakończone")
                    .on_click_action(list_link("Roboty zakończone", rows, overlay, list_delay)),
            );
        });

        page.with(|state| {
            if !login_frame.is_empty() {
                state.add_frame(&login_frame, "https://portal.test/login");
            }
            state.add_frame("centr", "https://portal.test/centr");
            state.push("centr", FakeNode::span("Witamy w portalu"));

            state.push(&login_frame, FakeNode::span("Użytkownik:").id("login-user-label"));
            state.push(&login_frame, FakeNode::input("login-user", "text"));
            state.push(&login_frame, FakeNode::span("Hasło:").id("login-pass-label"));
            state.push(
                &login_frame,
                FakeNode::input("login-pass", "password").on_enter_action(submit.clone()),
            );
            if self.submit_button {
                state.push(
                    &login_frame,
                    FakeNode::button("login-submit", "Zaloguj").on_click_action(submit.clone()),
                );
            }
            state.push(
                &login_frame,
                FakeNode::new("div")
                    .id("login-error")
                    .text("Nieprawidłowe hasło")
                    .hidden(),
            );
        });
        page
    }
}

fn list_link(
    title: &'static str,
    rows: Arc<Vec<String>>,
    overlay: bool,
    delay: Option<Duration>,
) -> Action {
    let render: Action = Arc::new(move |s: &mut PageState| show_list(s, title, &rows, overlay));
    match delay {
        Some(delay) => Arc::new(move |s: &mut PageState| s.navigate_later(delay, render.clone())),
        None => render,
    }
}

fn show_list(state: &mut PageState, title: &str, rows: &[String], overlay: bool) {
    state.clear_frame("centr");
    state.push("centr", FakeNode::new("h1").text(title));
    state.push("centr", FakeNode::new("table").id("results"));
    for (i, row) in rows.iter().enumerate() {
        let detail = format!("Szczegóły pracy {}", row);
        let mut node = FakeNode::link(&format!("row-{}", i), row)
            .within("results")
            .on_click(move |s| {
                s.clear_frame("centr");
                s.push("centr", FakeNode::new("h1").id("detail").text(&detail));
            });
        if overlay {
            node = node.intercepts_clicks();
        }
        state.push("centr", node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_subset() {
        let pass = FakeNode::input("p", "password").class("field");
        let text = FakeNode::input("u", "text");
        assert!(css_matches(&pass, "input[type='password']"));
        assert!(css_matches(&pass, "#p"));
        assert!(css_matches(&pass, "input.field"));
        assert!(css_matches(&pass, "#nope, .field"));
        assert!(!css_matches(&pass, "input:not([type='password']):not([type='hidden'])"));
        assert!(css_matches(&text, "input:not([type='password']):not([type='hidden'])"));
        assert!(!css_matches(&text, "button"));
    }

    #[tokio::test]
    async fn test_detached_frame_errors() {
        let page = FakePage::new();
        page.with(|s| s.add_frame("centr", "about:blank"));
        let frames = page.frames().await.unwrap();
        page.with(|s| s.remove_frame("centr"));
        assert!(frames[1].query_all(&Query::css("a")).await.is_err());
    }

    #[tokio::test]
    async fn test_reload_leaves_old_handles_stale() {
        let page = FakePage::new();
        page.with(|s| {
            s.add_frame("login", "https://portal.test/login");
            s.push("login", FakeNode::input("pass", "password"));
        });
        let old = page.frames().await.unwrap()[1].clone();
        let field = old.query_all(&Query::css("#pass")).await.unwrap().remove(0);
        field.fill("x").await.unwrap();

        page.with(|s| s.reload("login"));

        assert!(matches!(
            old.query_all(&Query::css("#pass")).await,
            Err(DriverError::Detached(_))
        ));
        assert!(field.input_value().await.is_err());
        let fresh = page.frames().await.unwrap()[1].clone();
        assert_ne!(fresh.load_id(), old.load_id());
        let field = fresh.query_all(&Query::css("#pass")).await.unwrap().remove(0);
        assert_eq!(field.input_value().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_deferred_navigation_commits_when_due() {
        let page = FakePage::new();
        page.with(|s| {
            s.add_frame("centr", "about:blank");
            s.navigate_later(
                Duration::from_millis(20),
                Arc::new(|s: &mut PageState| {
                    s.clear_frame("centr");
                    s.push("centr", FakeNode::span("Gotowe"));
                }),
            );
        });
        let before = page.frames().await.unwrap()[1].load_id().to_string();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let after = page.frames().await.unwrap()[1].clone();
        assert_ne!(after.load_id(), before);
        assert!(after.body_text().await.unwrap().contains("Gotowe"));
    }
}
