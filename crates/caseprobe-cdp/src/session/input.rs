//! Mouse and keyboard input for CDP page session.

use serde_json::json;
use tracing::debug;

use crate::error::CdpError;
use crate::protocol::{KeyEventType, MouseButton, MouseEventType};

use super::core::PageSession;

/// Key fields for `Input.dispatchKeyEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    pub key: String,
    pub code: String,
    pub key_code: u32,
    /// Text the key inserts, if any.
    pub text: Option<String>,
}

impl KeyDefinition {
    /// Definition for a named key (`Enter`, `Tab`, ...) or a single character.
    pub fn for_key(key: &str) -> Self {
        let named = |code: &str, key_code: u32, text: Option<&str>| KeyDefinition {
            key: key.to_string(),
            code: code.to_string(),
            key_code,
            text: text.map(str::to_string),
        };
        match key {
            "Enter" => named("Enter", 13, Some("\r")),
            "Tab" => named("Tab", 9, None),
            "Escape" => named("Escape", 27, None),
            "Backspace" => named("Backspace", 8, None),
            "Delete" => named("Delete", 46, None),
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::for_char(c),
                    _ => named("", 0, None),
                }
            }
        }
    }

    pub fn for_char(c: char) -> Self {
        let key_code = if c.is_ascii_alphanumeric() {
            c.to_ascii_uppercase() as u32
        } else {
            0
        };
        KeyDefinition {
            key: c.to_string(),
            code: String::new(),
            key_code,
            text: Some(c.to_string()),
        }
    }
}

impl PageSession {
    /// Move, press and release the left button at viewport coordinates.
    pub async fn click_at(&self, x: f64, y: f64) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MouseMoved,
                "x": x,
                "y": y,
            })),
        )
        .await?;

        for event in [MouseEventType::MousePressed, MouseEventType::MouseReleased] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": event,
                    "x": x,
                    "y": y,
                    "button": MouseButton::Left,
                    "clickCount": 1,
                })),
            )
            .await?;
        }

        debug!("Clicked at ({}, {})", x, y);
        Ok(())
    }

    /// Press and release one key on whatever has focus.
    pub async fn press_key(&self, key: &str) -> Result<(), CdpError> {
        self.dispatch_key(&KeyDefinition::for_key(key)).await
    }

    /// Type one character on whatever has focus.
    pub async fn type_char(&self, c: char) -> Result<(), CdpError> {
        self.dispatch_key(&KeyDefinition::for_char(c)).await
    }

    async fn dispatch_key(&self, def: &KeyDefinition) -> Result<(), CdpError> {
        let mut down = json!({
            "type": KeyEventType::KeyDown,
            "key": def.key,
            "code": def.code,
            "windowsVirtualKeyCode": def.key_code,
        });
        if let Some(text) = &def.text {
            down["text"] = json!(text);
        }
        self.call("Input.dispatchKeyEvent", Some(down)).await?;

        self.call(
            "Input.dispatchKeyEvent",
            Some(json!({
                "type": KeyEventType::KeyUp,
                "key": def.key,
                "code": def.code,
                "windowsVirtualKeyCode": def.key_code,
            })),
        )
        .await?;
        Ok(())
    }
}
