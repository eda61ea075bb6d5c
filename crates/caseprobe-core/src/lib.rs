//! Portal automation engine.
//!
//! Logs into the case-management portal, dismisses the acknowledgement
//! dialogs it throws up, searches the unfinished and then the finished work
//! list for an identifier, and exports evidence of what it saw.
//!
//! ## Flow
//!
//! ```text
//! Runner ─► open page ─► login ─► dismiss dialogs ─► search lists ─► open record ─► export
//!                │                                                                   │
//!                └──────────────────── RunResult (+ JSON line in the session log) ◄──┘
//! ```
//!
//! The engine talks to the browser only through the traits in [`driver`];
//! `caseprobe-cdp` implements them over the Chrome DevTools Protocol.

pub mod dialogs;
pub mod driver;
pub mod error;
pub mod export;
pub mod frames;
pub mod locator;
pub mod login;
pub mod matcher;
pub mod navigate;
pub mod probe;
pub mod result;
pub mod runner;
pub mod session;

#[cfg(test)]
mod fake;

pub use driver::{
    BrowserLauncher, Element, ElementRef, Frame, FrameRef, InputSummary, Page, PageRef, Query,
    Role, TextMatch,
};
pub use error::DriverError;
pub use result::{RunResult, RunStatus, StepCode};
pub use runner::{RunRequest, Runner};
pub use session::SessionContext;
