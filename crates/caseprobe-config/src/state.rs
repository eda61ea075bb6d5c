//! Externally maintained state: selector hints and portal credentials.
//!
//! Both files are JSON and are edited by the desktop panel as well, so the
//! loaders accept the panel's snake_case keys and treat empty strings as
//! "not configured".

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::schema::RuntimeConfig;

/// Logical element roles that selector configuration can pin down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorRole {
    LoginUsername,
    LoginPassword,
    LoginSubmit,
    OkButton,
    UnfinishedListLink,
    FinishedListLink,
    SearchInput,
    ResultsContainer,
    PasswordError,
}

impl SelectorRole {
    pub const ALL: [SelectorRole; 9] = [
        SelectorRole::LoginUsername,
        SelectorRole::LoginPassword,
        SelectorRole::LoginSubmit,
        SelectorRole::OkButton,
        SelectorRole::UnfinishedListLink,
        SelectorRole::FinishedListLink,
        SelectorRole::SearchInput,
        SelectorRole::ResultsContainer,
        SelectorRole::PasswordError,
    ];

    /// Key used in `selectors.json` and in `*_MISSING_SELECTOR` details.
    pub fn key(&self) -> &'static str {
        match self {
            SelectorRole::LoginUsername => "loginUsername",
            SelectorRole::LoginPassword => "loginPassword",
            SelectorRole::LoginSubmit => "loginSubmit",
            SelectorRole::OkButton => "okButton",
            SelectorRole::UnfinishedListLink => "unfinishedListLink",
            SelectorRole::FinishedListLink => "finishedListLink",
            SelectorRole::SearchInput => "searchInput",
            SelectorRole::ResultsContainer => "resultsContainer",
            SelectorRole::PasswordError => "passwordError",
        }
    }
}

impl fmt::Display for SelectorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Optional CSS selector per [`SelectorRole`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorConfig {
    #[serde(default, alias = "login_username", deserialize_with = "empty_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_username: Option<String>,

    #[serde(default, alias = "login_password", deserialize_with = "empty_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_password: Option<String>,

    #[serde(default, alias = "login_submit", deserialize_with = "empty_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_submit: Option<String>,

    #[serde(default, alias = "ok_button", deserialize_with = "empty_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok_button: Option<String>,

    #[serde(
        default,
        alias = "unfinished_list_link",
        alias = "roboty_niezakonczone_link",
        deserialize_with = "empty_as_none"
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unfinished_list_link: Option<String>,

    #[serde(
        default,
        alias = "finished_list_link",
        alias = "roboty_zakonczone_link",
        deserialize_with = "empty_as_none"
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_list_link: Option<String>,

    #[serde(default, alias = "search_input", deserialize_with = "empty_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_input: Option<String>,

    #[serde(default, alias = "results_container", deserialize_with = "empty_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_container: Option<String>,

    #[serde(default, alias = "password_error", deserialize_with = "empty_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_error: Option<String>,
}

impl SelectorConfig {
    /// Configured selector for a role, if any.
    pub fn get(&self, role: SelectorRole) -> Option<&str> {
        let value = match role {
            SelectorRole::LoginUsername => &self.login_username,
            SelectorRole::LoginPassword => &self.login_password,
            SelectorRole::LoginSubmit => &self.login_submit,
            SelectorRole::OkButton => &self.ok_button,
            SelectorRole::UnfinishedListLink => &self.unfinished_list_link,
            SelectorRole::FinishedListLink => &self.finished_list_link,
            SelectorRole::SearchInput => &self.search_input,
            SelectorRole::ResultsContainer => &self.results_container,
            SelectorRole::PasswordError => &self.password_error,
        };
        value.as_deref()
    }

    pub fn with(mut self, role: SelectorRole, selector: impl Into<String>) -> Self {
        let slot = match role {
            SelectorRole::LoginUsername => &mut self.login_username,
            SelectorRole::LoginPassword => &mut self.login_password,
            SelectorRole::LoginSubmit => &mut self.login_submit,
            SelectorRole::OkButton => &mut self.ok_button,
            SelectorRole::UnfinishedListLink => &mut self.unfinished_list_link,
            SelectorRole::FinishedListLink => &mut self.finished_list_link,
            SelectorRole::SearchInput => &mut self.search_input,
            SelectorRole::ResultsContainer => &mut self.results_container,
            SelectorRole::PasswordError => &mut self.password_error,
        };
        *slot = Some(selector.into());
        self
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| {
        let trimmed = s.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }))
}

/// Portal URL and login pair.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(url: impl Into<String>, login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            login: login.into(),
            password: password.into(),
        }
    }

    /// All three fields must be non-blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() || self.login.trim().is_empty() || self.password.is_empty() {
            return Err(ConfigError::MissingField("url/login/password".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Credentials keyed by portal (county) key.
#[derive(Debug, Clone, Default)]
pub struct PortalRegistry {
    portals: BTreeMap<String, Credentials>,
    /// Older files hold a single flat `{url, login, password}` object.
    flat: Option<Credentials>,
}

impl PortalRegistry {
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let Value::Object(map) = value else {
            return Err(ConfigError::InvalidFormat(
                "portals file must contain a JSON object".to_string(),
            ));
        };

        if ["url", "login", "password"].iter().any(|k| map.contains_key(*k)) {
            let flat: Credentials = serde_json::from_value(Value::Object(map))?;
            return Ok(Self {
                portals: BTreeMap::new(),
                flat: Some(flat),
            });
        }

        let mut portals = BTreeMap::new();
        for (key, entry) in map {
            if entry.is_object() {
                portals.insert(key, serde_json::from_value(entry)?);
            }
        }
        Ok(Self { portals, flat: None })
    }

    /// Credentials for a portal key, matched case-insensitively.
    pub fn resolve(&self, key: &str) -> Option<Credentials> {
        if let Some(flat) = &self.flat {
            return Some(flat.clone());
        }
        if let Some(found) = self.portals.get(key) {
            return Some(found.clone());
        }
        let lowered = key.to_lowercase();
        self.portals
            .iter()
            .find(|(k, _)| k.to_lowercase() == lowered)
            .map(|(_, v)| v.clone())
    }

    pub fn insert(&mut self, key: impl Into<String>, credentials: Credentials) {
        self.flat = None;
        self.portals.insert(key.into(), credentials);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.portals.keys().map(String::as_str)
    }

    fn to_value(&self) -> Result<Value, ConfigError> {
        match &self.flat {
            Some(flat) => Ok(serde_json::to_value(flat)?),
            None => Ok(serde_json::to_value(&self.portals)?),
        }
    }
}

/// Locations of the JSON state files under the runtime root.
#[derive(Debug, Clone)]
pub struct StateFiles {
    pub selectors: PathBuf,
    pub portals: PathBuf,
}

impl StateFiles {
    pub fn new(runtime: &RuntimeConfig) -> Self {
        Self {
            selectors: runtime.config_dir().join("selectors.json"),
            portals: runtime.state_dir().join("portals.json"),
        }
    }

    /// Create empty state files if they are missing.
    pub fn ensure(&self) -> Result<(), ConfigError> {
        if !self.selectors.exists() {
            let template: serde_json::Map<String, Value> = SelectorRole::ALL
                .iter()
                .map(|role| (role.key().to_string(), Value::String(String::new())))
                .collect();
            write_json(&self.selectors, &Value::Object(template))?;
            info!("Created selector template at {}", self.selectors.display());
        }
        if !self.portals.exists() {
            write_json(&self.portals, &Value::Object(Default::default()))?;
            info!("Created empty portal registry at {}", self.portals.display());
        }
        Ok(())
    }

    pub fn load_selectors(&self) -> Result<SelectorConfig, ConfigError> {
        if !self.selectors.exists() {
            return Ok(SelectorConfig::default());
        }
        let content = fs::read_to_string(&self.selectors)?;
        let selectors = serde_json::from_str(&content)?;
        debug!("Loaded selectors from {}", self.selectors.display());
        Ok(selectors)
    }

    pub fn load_portals(&self) -> Result<PortalRegistry, ConfigError> {
        if !self.portals.exists() {
            return Ok(PortalRegistry::default());
        }
        let content = fs::read_to_string(&self.portals)?;
        PortalRegistry::from_value(serde_json::from_str(&content)?)
    }

    pub fn save_portals(&self, registry: &PortalRegistry) -> Result<(), ConfigError> {
        write_json(&self.portals, &registry.to_value()?)
    }
}

fn write_json(path: &Path, value: &Value) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
