//! Chrome DevTools Protocol driver.
//!
//! Implements the `caseprobe-core` driver traits over a raw CDP WebSocket
//! connection.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let launcher = ChromeLauncher::new(settings.browser.clone(), settings.runtime.root_dir());
//! let runner = Runner::new(Arc::new(launcher), &settings);
//! ```
//!
//! Frames are reached through isolated worlds created per frame in the
//! page's frame tree, so only frames rendered in the page's own process
//! are visible.

mod client;
mod error;
mod launcher;
mod page;
mod protocol;
mod query;
mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use launcher::ChromeLauncher;
pub use page::{CdpElement, CdpFrame, CdpPage};
pub use protocol::*;
pub use session::PageSession;
