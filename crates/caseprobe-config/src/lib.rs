//! # caseprobe config
//!
//! Settings (`caseprobe.toml`), the portal state files kept next to them
//! (`selectors.json`, `portals.json`) and the per-run session directory layout.

mod error;
mod loader;
mod schema;
mod session;
mod state;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use session::{cleanup_sessions, clear_sessions, sanitize_identifier, SessionLayout, SessionPaths};
pub use state::{Credentials, PortalRegistry, SelectorConfig, SelectorRole, StateFiles};
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
