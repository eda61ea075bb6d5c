//! Driver trait implementations over a CDP page session.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use caseprobe_core::{DriverError, Element, ElementRef, Frame, FrameRef, InputSummary, Page, Query};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::CdpClient;
use crate::protocol::{FrameInfo, ScreenshotFormat};
use crate::query::{self, scripts};
use crate::session::PageSession;

/// A DOM node held as a remote object in a frame's isolated world.
pub struct CdpElement {
    session: Arc<PageSession>,
    object_id: String,
    backend_id: u64,
}

impl CdpElement {
    async fn call(&self, function: &str, args: Vec<Value>) -> Result<Value, DriverError> {
        Ok(self
            .session
            .call_function_on(&self.object_id, function, args)
            .await?)
    }
}

impl Drop for CdpElement {
    fn drop(&mut self) {
        let object_id = std::mem::take(&mut self.object_id);
        if object_id.is_empty() {
            return;
        }
        // Outside a runtime the remote object lives until the next navigation.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let session = self.session.clone();
            runtime.spawn(async move {
                session.release_object(&object_id).await;
            });
        }
    }
}

#[async_trait]
impl Element for CdpElement {
    fn node_key(&self) -> u64 {
        self.backend_id
    }

    async fn is_visible(&self) -> Result<bool, DriverError> {
        Ok(self.call(scripts::IS_VISIBLE, vec![]).await?.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self) -> Result<bool, DriverError> {
        Ok(self.call(scripts::IS_ENABLED, vec![]).await?.as_bool().unwrap_or(false))
    }

    async fn click(&self, force: bool) -> Result<(), DriverError> {
        if force {
            self.call(scripts::FORCE_CLICK, vec![]).await?;
            return Ok(());
        }
        if !self.is_enabled().await? {
            return Err(DriverError::Script("element is disabled".to_string()));
        }

        self.session.scroll_into_view(&self.object_id).await?;
        let blocker = self.call(scripts::HIT_TEST, vec![]).await?;
        if let Some(blocker) = blocker.as_str().filter(|b| !b.is_empty()) {
            return Err(DriverError::Script(format!("click intercepted by {}", blocker)));
        }
        let (x, y) = self
            .session
            .content_center(&self.object_id)
            .await?
            .ok_or_else(|| DriverError::Script("element is not rendered".to_string()))?;
        self.session.click_at(x, y).await?;
        Ok(())
    }

    async fn focus(&self) -> Result<(), DriverError> {
        self.call(scripts::FOCUS, vec![]).await?;
        Ok(())
    }

    async fn fill(&self, value: &str) -> Result<(), DriverError> {
        self.call(scripts::FILL, vec![json!(value)]).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), DriverError> {
        self.fill("").await
    }

    async fn type_text(&self, text: &str, delay: Duration) -> Result<(), DriverError> {
        self.focus().await?;
        for c in text.chars() {
            self.session.type_char(c).await?;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }

    async fn input_value(&self) -> Result<String, DriverError> {
        let value = self.call(scripts::VALUE, vec![]).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn press(&self, key: &str) -> Result<(), DriverError> {
        self.focus().await?;
        self.session.press_key(key).await?;
        Ok(())
    }

    async fn inner_text(&self) -> Result<String, DriverError> {
        let value = self.call(scripts::INNER_TEXT, vec![]).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}

/// One frame of the page, addressed through its isolated world.
pub struct CdpFrame {
    session: Arc<PageSession>,
    frame_id: String,
    name: String,
    url: String,
    is_main: bool,
    loader_id: String,
    context_id: i64,
}

impl CdpFrame {
    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError> {
        Ok(self.session.evaluate(expression, Some(self.context_id)).await?)
    }
}

#[async_trait]
impl Frame for CdpFrame {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn is_main(&self) -> bool {
        self.is_main
    }

    fn load_id(&self) -> &str {
        &self.loader_id
    }

    async fn query_all(&self, query: &Query) -> Result<Vec<ElementRef>, DriverError> {
        let handle = self
            .session
            .evaluate_handle(&query::build(query), Some(self.context_id))
            .await?;
        let Some(array_id) = handle.object_id else {
            return Ok(Vec::new());
        };

        let items = self.session.array_items(&array_id).await;
        self.session.release_object(&array_id).await;

        let mut elements: Vec<ElementRef> = Vec::new();
        let mut remaining = items?.into_iter();
        while let Some(object_id) = remaining.next() {
            match self.session.backend_node_id(&object_id).await {
                Ok(backend_id) => elements.push(Arc::new(CdpElement {
                    session: self.session.clone(),
                    object_id,
                    backend_id,
                })),
                Err(e) => {
                    // Elements already built release themselves on drop.
                    for orphan in std::iter::once(object_id).chain(remaining) {
                        self.session.release_object(&orphan).await;
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(elements)
    }

    async fn content(&self) -> Result<String, DriverError> {
        let html = self.evaluate(scripts::CONTENT).await?;
        Ok(html.as_str().unwrap_or_default().to_string())
    }

    async fn body_text(&self) -> Result<String, DriverError> {
        let text = self.evaluate(scripts::BODY_TEXT).await?;
        Ok(text.as_str().unwrap_or_default().to_string())
    }

    async fn inputs(&self) -> Result<Vec<InputSummary>, DriverError> {
        let value = self.evaluate(scripts::INPUTS).await?;
        Ok(parse_inputs(&value))
    }

    async fn wait_for_load(&self, timeout: Duration) -> Result<(), DriverError> {
        Ok(self
            .session
            .wait_for_load(Some(self.context_id), timeout)
            .await?)
    }
}

/// Forget worlds of frames that are no longer in the tree.
fn retain_live_worlds(worlds: &mut HashMap<String, (String, i64)>, live: &[&FrameInfo]) {
    worlds.retain(|frame_id, _| live.iter().any(|info| info.id == *frame_id));
}

fn parse_inputs(value: &Value) -> Vec<InputSummary> {
    let field = |v: &Value, key: &str| v[key].as_str().unwrap_or_default().to_string();
    value
        .as_array()
        .map(|inputs| {
            inputs
                .iter()
                .map(|v| InputSummary {
                    input_type: field(v, "type"),
                    id: field(v, "id"),
                    name: field(v, "name"),
                    placeholder: field(v, "placeholder"),
                    aria_label: field(v, "ariaLabel"),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// A browser tab driven over CDP.
///
/// Owns the browser process when the launcher started it; closing the page
/// shuts that browser down.
pub struct CdpPage {
    client: Arc<CdpClient>,
    session: Arc<PageSession>,
    /// Isolated world per frame id, keyed on the frame's loader id.
    worlds: Mutex<HashMap<String, (String, i64)>>,
    dialog_task: Mutex<Option<JoinHandle<()>>>,
    chrome: Mutex<Option<Child>>,
}

impl CdpPage {
    pub fn new(client: Arc<CdpClient>, session: Arc<PageSession>, chrome: Option<Child>) -> Self {
        Self {
            client,
            session,
            worlds: Mutex::new(HashMap::new()),
            dialog_task: Mutex::new(None),
            chrome: Mutex::new(chrome),
        }
    }

    pub fn session(&self) -> &Arc<PageSession> {
        &self.session
    }

    async fn world_for(&self, frame: &FrameInfo) -> Result<i64, DriverError> {
        let cached = self
            .worlds
            .lock()
            .get(&frame.id)
            .filter(|(loader, _)| *loader == frame.loader_id)
            .map(|(_, context)| *context);
        if let Some(context) = cached {
            return Ok(context);
        }

        let context = self.session.isolated_world(&frame.id).await?;
        self.worlds
            .lock()
            .insert(frame.id.clone(), (frame.loader_id.clone(), context));
        Ok(context)
    }
}

#[async_trait]
impl Page for CdpPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        let navigation = async {
            self.session.navigate(url).await?;
            self.session.wait_for_load(None, timeout).await
        };
        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| DriverError::Timeout(format!("Navigation to {} timed out", url)))??;
        debug!("Loaded {}", url);
        Ok(())
    }

    async fn frames(&self) -> Result<Vec<FrameRef>, DriverError> {
        let tree = self.session.frame_tree().await?;
        let infos = tree.flatten();
        retain_live_worlds(&mut self.worlds.lock(), &infos);
        let mut frames: Vec<FrameRef> = Vec::new();

        for info in infos {
            let is_main = info.parent_id.is_none();
            let context_id = match self.world_for(info).await {
                Ok(context) => context,
                Err(e) if !is_main => {
                    debug!("Skipping frame {} ({}): {}", info.id, info.url, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            frames.push(Arc::new(CdpFrame {
                session: self.session.clone(),
                frame_id: info.id.clone(),
                name: info.name.clone().unwrap_or_default(),
                url: info.url.clone(),
                is_main,
                loader_id: info.loader_id.clone(),
                context_id,
            }));
        }
        Ok(frames)
    }

    async fn content(&self) -> Result<String, DriverError> {
        let html = self.session.evaluate(scripts::CONTENT, None).await?;
        Ok(html.as_str().unwrap_or_default().to_string())
    }

    async fn body_text(&self) -> Result<String, DriverError> {
        let text = self.session.evaluate(scripts::BODY_TEXT, None).await?;
        Ok(text.as_str().unwrap_or_default().to_string())
    }

    async fn screenshot(&self, path: &Path) -> Result<(), DriverError> {
        let data = self.session.screenshot(ScreenshotFormat::Png).await?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| DriverError::Protocol(format!("Invalid screenshot data: {}", e)))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn wait_for_load(&self, timeout: Duration) -> Result<(), DriverError> {
        Ok(self.session.wait_for_load(None, timeout).await?)
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        Ok(self.session.press_key(key).await?)
    }

    async fn accept_native_dialogs(&self) -> Result<(), DriverError> {
        if let Some(task) = self.session.spawn_dialog_handler() {
            *self.dialog_task.lock() = Some(task);
            debug!("Native dialogs will be accepted");
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        if let Some(task) = self.dialog_task.lock().take() {
            task.abort();
        }
        let closed = self.client.close_page(&self.session).await;

        let chrome = self.chrome.lock().take();
        if let Some(mut child) = chrome {
            info!("Shutting down Chrome...");
            if let Err(e) = child.kill().await {
                warn!("Failed to stop Chrome: {}", e);
            }
        }
        Ok(closed?)
    }
}

impl Drop for CdpPage {
    fn drop(&mut self) {
        if let Some(task) = self.dialog_task.lock().take() {
            task.abort();
        }
    }
}
